//! Mutable reassembly state: raw code, per-byte classification, the rebase
//! table, labels, subroutines and the decoded commands.

use std::collections::{BTreeMap, BTreeSet};

use crate::code_type::CodeType;
use crate::command::Command;
use crate::label::Label;
use crate::util::{require_valid_address, MAX_ADDRESS};

/// A detected subroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subroutine {
    /// Absolute address of the entry point.
    pub address: u32,
    /// Length in bytes from the entry point to the end of the first
    /// flow-ending command.
    pub length: u16,
}

/// All state of a reassembly in progress.
///
/// The raw code, its classification, the rebase table, subroutines and
/// labels are persistent. Commands and references are derived and rebuilt
/// on every decoder run.
#[derive(Debug, Clone)]
pub struct CommandBuffer {
    code: Vec<u8>,
    types: Vec<CodeType>,
    /// Index to absolute base address. Entries at 0 and `code.len()` always
    /// exist and initially hold the start address.
    start_addresses: BTreeMap<usize, u32>,
    subroutines: BTreeMap<u32, Subroutine>,
    labels: BTreeMap<u32, Label>,

    // derived state, owned by the decoder
    code_references: Vec<Option<u32>>,
    data_references: Vec<Option<u32>>,
    external_references: Vec<Option<u32>>,
    commands: Vec<Option<Command>>,
}

impl CommandBuffer {
    /// Wrap raw code mapped at `start_address`.
    ///
    /// Panics if the start address is outside the 16 bit address space or
    /// the code runs past its end.
    pub fn new(code: Vec<u8>, start_address: u32) -> Self {
        require_valid_address(start_address);
        assert!(
            start_address as usize + code.len() <= MAX_ADDRESS as usize + 1,
            "{} code bytes at {:#06X} run past the address space",
            code.len(),
            start_address
        );

        let length = code.len();
        let mut start_addresses = BTreeMap::new();
        start_addresses.insert(0, start_address);
        start_addresses.insert(length, start_address);

        CommandBuffer {
            code,
            types: vec![CodeType::Unknown; length],
            start_addresses,
            subroutines: BTreeMap::new(),
            labels: BTreeMap::new(),
            code_references: vec![None; length],
            data_references: vec![None; length],
            external_references: vec![None; length],
            commands: vec![None; length],
        }
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Is the given index within the code?
    pub fn has_index(&self, index: usize) -> bool {
        index < self.code.len()
    }

    /// Is the given index a valid exclusive end index?
    pub fn has_end_index(&self, index: usize) -> bool {
        index <= self.code.len()
    }

    //
    // base addresses
    //

    /// Initial start address of the code.
    pub fn start_address(&self) -> u32 {
        self.start_addresses[&0]
    }

    /// The rebase table including the sentinel entries at 0 and the code
    /// length. For persistence.
    pub fn start_addresses(&self) -> &BTreeMap<usize, u32> {
        &self.start_addresses
    }

    /// Compute the absolute address of the given index.
    pub fn address_for_index(&self, index: usize) -> u32 {
        assert!(self.has_index(index), "index {} out of bounds", index);

        let (_, base) = self
            .start_addresses
            .range(..=index)
            .next_back()
            .expect("rebase table holds an entry at 0");
        base + index as u32
    }

    /// Is the given absolute address covered by the code?
    pub fn has_address(&self, address: u32) -> bool {
        self.index_for_address_impl(address).is_some()
    }

    /// Compute the index of the given absolute address.
    ///
    /// Panics when the address is not covered; check with
    /// [`CommandBuffer::has_address`] first.
    pub fn index_for_address(&self, address: u32) -> usize {
        self.index_for_address_impl(address)
            .unwrap_or_else(|| panic!("address {:#06X} not part of the code", address))
    }

    fn index_for_address_impl(&self, address: u32) -> Option<usize> {
        let mut entries = self.start_addresses.iter();
        let mut last = entries.next()?;
        for entry in entries {
            let range_start = *last.1 + *last.0 as u32;
            let range_end = *last.1 + *entry.0 as u32;
            if address >= range_start && address < range_end {
                return Some((address - *last.1) as usize);
            }
            last = entry;
        }
        None
    }

    /// Use a new absolute base address for the code starting at `index`.
    ///
    /// Panics when the index is out of bounds or has been rebased before.
    pub fn rebase(&mut self, index: usize, base_address: u32) {
        assert!(self.has_index(index), "index {} out of bounds", index);
        require_valid_address(base_address);

        let removed = self.start_addresses.insert(index, base_address);
        assert!(removed.is_none(), "index {} rebased twice", index);
    }

    //
    // subroutines
    //

    /// Register a subroutine. Panics on a duplicate entry point.
    pub fn add_subroutine(&mut self, subroutine: Subroutine) {
        let removed = self.subroutines.insert(subroutine.address, subroutine);
        assert!(
            removed.is_none(),
            "duplicate subroutine at {:#06X}",
            subroutine.address
        );
    }

    pub fn get_subroutine(&self, address: u32) -> Option<&Subroutine> {
        self.subroutines.get(&address)
    }

    pub fn subroutines(&self) -> &BTreeMap<u32, Subroutine> {
        &self.subroutines
    }

    //
    // code types
    //

    pub fn get_type(&self, index: usize) -> CodeType {
        assert!(self.has_index(index), "index {} out of bounds", index);
        self.types[index]
    }

    /// Classify a single byte. Returns whether the classification changed.
    pub fn set_type(&mut self, index: usize, code_type: CodeType) -> bool {
        assert!(self.has_index(index), "index {} out of bounds", index);

        let change = self.types[index] != code_type;
        self.types[index] = code_type;
        change
    }

    /// Classify the range `[start, end)`. Returns whether anything changed.
    pub fn set_type_range(&mut self, start: usize, end: usize, code_type: CodeType) -> bool {
        assert!(self.has_index(start), "index {} out of bounds", start);
        assert!(self.has_end_index(end), "end index {} out of bounds", end);
        assert!(start <= end, "start {} behind end {}", start, end);

        let mut change = false;
        for index in start..end {
            change |= self.set_type(index, code_type);
        }
        change
    }

    //
    // labels and references
    //

    pub fn has_label(&self, address: u32) -> bool {
        self.labels.contains_key(&address)
    }

    pub fn get_label(&self, address: u32) -> Option<&Label> {
        self.labels.get(&address)
    }

    /// Register or reclassify a label. Returns whether the registry changed.
    ///
    /// Labels are persistent: they survive decoder runs and are never
    /// removed, only reclassified.
    pub fn set_label(&mut self, label: Label) -> bool {
        self.labels.insert(label.address(), label) != Some(label)
    }

    pub fn labels(&self) -> &BTreeMap<u32, Label> {
        &self.labels
    }

    /// All labels for addresses outside the code, sorted by address.
    pub fn external_labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.values().filter(|label| label.is_external())
    }

    /// Record that the command at `from_index` references address `to`.
    ///
    /// Dispatches on whether the target is inside the code and whether the
    /// reference means code or data. Ensures a label for the target exists
    /// but never reclassifies one.
    pub fn add_reference(&mut self, code: bool, from_index: usize, to: u32) {
        assert!(self.has_index(from_index), "index {} out of bounds", from_index);

        if !self.has_address(to) {
            self.add_external_reference(from_index, to);
        } else if code {
            self.add_code_reference(from_index, to);
        } else {
            self.add_data_reference(from_index, to);
        }
    }

    pub fn add_code_reference(&mut self, from_index: usize, to: u32) {
        assert!(self.has_index(from_index), "index {} out of bounds", from_index);
        assert!(self.has_address(to), "address {:#06X} not part of the code", to);

        self.labels.entry(to).or_insert(Label::Code(to));
        self.code_references[from_index] = Some(to);
    }

    pub fn add_data_reference(&mut self, from_index: usize, to: u32) {
        assert!(self.has_index(from_index), "index {} out of bounds", from_index);
        assert!(self.has_address(to), "address {:#06X} not part of the code", to);

        self.labels.entry(to).or_insert(Label::Data(to));
        self.data_references[from_index] = Some(to);
    }

    pub fn add_external_reference(&mut self, from_index: usize, to: u32) {
        assert!(self.has_index(from_index), "index {} out of bounds", from_index);
        assert!(!self.has_address(to), "address {:#06X} is part of the code", to);

        self.labels.entry(to).or_insert(Label::External(to));
        self.external_references[from_index] = Some(to);
    }

    /// All indexes referencing the given absolute address.
    ///
    /// External references are not tracked here since they never point into
    /// the code.
    pub fn references_to(&self, address: u32) -> BTreeSet<usize> {
        let mut result = BTreeSet::new();
        for index in 0..self.code.len() {
            if self.code_references[index] == Some(address)
                || self.data_references[index] == Some(address)
            {
                result.insert(index);
            }
        }
        result
    }

    /// Drop the references recorded for the command at `index`. The labels
    /// they may have created stay.
    pub fn remove_reference_from(&mut self, index: usize) {
        assert!(self.has_index(index), "index {} out of bounds", index);
        self.code_references[index] = None;
        self.data_references[index] = None;
        self.external_references[index] = None;
    }

    //
    // commands
    //

    /// Wipe all derived state before a decoder run. Classifications, the
    /// rebase table, labels and subroutines stay.
    pub fn clear_commands(&mut self) {
        self.code_references.fill(None);
        self.data_references.fill(None);
        self.external_references.fill(None);
        self.commands.fill(None);
    }

    pub fn command_at(&self, index: usize) -> Option<&Command> {
        assert!(self.has_index(index), "index {} out of bounds", index);
        self.commands[index].as_ref()
    }

    pub fn command_at_mut(&mut self, index: usize) -> Option<&mut Command> {
        assert!(self.has_index(index), "index {} out of bounds", index);
        self.commands[index].as_mut()
    }

    pub fn set_command(&mut self, index: usize, command: Command) {
        assert!(self.has_index(index), "index {} out of bounds", index);
        self.commands[index] = Some(command);
    }

    pub fn remove_command(&mut self, index: usize) {
        assert!(self.has_index(index), "index {} out of bounds", index);
        self.commands[index] = None;
    }
}

//! Symbolic labels attached to absolute addresses.

use std::cmp::Ordering;
use std::fmt;

use crate::util::hex_word_plain;

/// A label for an absolute address.
///
/// The variant decides the name prefix in the listing: `L` for code targets,
/// `l` for data locations, `Z`/`X` for addresses outside the reassembled
/// image (zero page vs. absolute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Code(u32),
    Data(u32),
    External(u32),
}

impl Label {
    /// The address this label names.
    pub fn address(&self) -> u32 {
        match *self {
            Label::Code(address) | Label::Data(address) | Label::External(address) => address,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Label::Code(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Label::Data(_))
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Label::External(_))
    }

    fn prefix(&self) -> &'static str {
        match self {
            Label::Code(_) => "L",
            Label::Data(_) => "l",
            Label::External(address) if *address < 0x100 => "Z",
            Label::External(_) => "X",
        }
    }

    /// The plain label name, `<prefix>_<4 hex digits>`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.prefix(), hex_word_plain(self.address()))
    }

    /// Render a use of this label at the given address.
    ///
    /// A use at a different address gets an explicit offset so the assembler
    /// output stays relocatable, e.g. `L_1000 + 1`.
    pub fn render_at(&self, address: u32) -> String {
        let own = self.address();
        match address.cmp(&own) {
            Ordering::Equal => self.name(),
            Ordering::Greater => format!("{} + {}", self.name(), address - own),
            Ordering::Less => format!("{} - {}", self.name(), own - address),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address().cmp(&other.address())
    }
}

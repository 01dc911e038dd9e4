//! Keeps the label registry in sync with the classification.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::code_type::CodeType;
use crate::command::Command;
use crate::command_buffer::CommandBuffer;
use crate::command_iter::CommandIterator;
use crate::label::Label;

use super::Detector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Code,
    Data,
    External,
}

/// Registers a label for every absolute operand target and reclassifies
/// existing labels when the target's classification has moved on.
///
/// Targets still classified unknown are graded by how they are referenced:
/// a jump or call target counts as code, anything else as data. When
/// several references disagree, code wins.
pub struct LabelDetector;

impl Detector for LabelDetector {
    fn id(&self) -> &'static str {
        "label"
    }

    fn detect(&self, buffer: &mut CommandBuffer) -> bool {
        let mut desired: IndexMap<u32, Kind> = IndexMap::new();

        let mut iter = CommandIterator::new(buffer);
        while let Some(command) = iter.next() {
            let pc = iter.get_address();
            let address = match command.argument_address(pc) {
                Some(address) => address,
                None => continue,
            };

            let kind = if !buffer.has_address(address) {
                Kind::External
            } else {
                let target_type = buffer.get_type(buffer.index_for_address(address));
                if target_type.is_code() {
                    Kind::Code
                } else if target_type == CodeType::Unknown {
                    if is_code_reference(command) {
                        Kind::Code
                    } else {
                        Kind::Data
                    }
                } else {
                    Kind::Data
                }
            };

            match desired.entry(address) {
                Entry::Occupied(mut entry) => {
                    if kind == Kind::Code {
                        entry.insert(Kind::Code);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(kind);
                }
            }
        }

        let mut change = false;
        for (address, kind) in desired {
            let label = match kind {
                Kind::Code => Label::Code(address),
                Kind::Data => Label::Data(address),
                Kind::External => Label::External(address),
            };
            change |= buffer.set_label(label);
        }
        change
    }
}

/// Does this command reference its target as code?
fn is_code_reference(command: &Command) -> bool {
    match command {
        Command::Opcode { opcode, .. } => opcode.ty.is_jump(),
        Command::Address { .. } => true,
        Command::Data { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_creator::CommandCreator;

    #[test]
    fn test_labels_follow_target_classification() {
        // JMP $1003, then data the jump skips over, then INC $1003
        let mut buffer = CommandBuffer::new(
            vec![0x4C, 0x05, 0x10, 0xFF, 0xFF, 0xEE, 0x03, 0x10],
            0x1000,
        );
        buffer.set_type_range(3, 5, CodeType::Data);
        CommandCreator::new(&mut buffer).create_commands();

        let detector = LabelDetector;
        assert!(detector.detect(&mut buffer) || buffer.get_label(0x1003).is_some());

        // jump target is still unknown, graded by its jump reference
        assert!(buffer.get_label(0x1005).unwrap().is_code());
        // INC target points at classified data
        assert!(buffer.get_label(0x1003).unwrap().is_data());

        assert!(!detector.detect(&mut buffer));
    }

    #[test]
    fn test_external_targets_get_external_labels() {
        let mut buffer = CommandBuffer::new(vec![0x8D, 0x20, 0xD0, 0x60], 0x1000);
        CommandCreator::new(&mut buffer).create_commands();

        LabelDetector.detect(&mut buffer);
        assert!(buffer.get_label(0xD020).unwrap().is_external());
    }

    #[test]
    fn test_reclassifies_stale_labels() {
        let mut buffer = CommandBuffer::new(vec![0x20, 0x03, 0x10, 0xA9, 0x00, 0x60], 0x1000);
        buffer.set_label(Label::Data(0x1003));
        buffer.set_type(3, CodeType::Opcode);
        CommandCreator::new(&mut buffer).create_commands();

        let detector = LabelDetector;
        assert!(detector.detect(&mut buffer));
        assert!(buffer.get_label(0x1003).unwrap().is_code());
        assert!(!detector.detect(&mut buffer));
    }
}

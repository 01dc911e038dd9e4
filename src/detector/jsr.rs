//! Cross-references subroutine calls and marks their targets as code.

use indexmap::IndexMap;
use log::debug;

use crate::code_type::CodeType;
use crate::command::Command;
use crate::command_buffer::{CommandBuffer, Subroutine};
use crate::command_iter::CommandIterator;
use crate::opcode::{OpcodeMode, OpcodeType};
use crate::util::hex_word;

use super::Detector;

/// Tracks all reachable `JSR $xxxx` commands. Call targets inside the code
/// are marked as opcodes, which propagates reachability into subroutines the
/// fall-through analysis alone would miss.
pub struct JsrDetector;

impl JsrDetector {
    /// Build the call cross-reference: absolute target address to the
    /// indexes of all reachable `JSR $xxxx` commands calling it, in command
    /// order.
    pub fn cross_reference(&self, buffer: &CommandBuffer) -> IndexMap<u32, Vec<usize>> {
        let mut result: IndexMap<u32, Vec<usize>> = IndexMap::new();

        let mut iter = CommandIterator::new(buffer);
        while let Some(command) = iter.next() {
            if let Command::Opcode {
                opcode,
                argument,
                reachable,
            } = command
            {
                if *reachable && opcode.ty == OpcodeType::JSR && opcode.mode == OpcodeMode::ABS {
                    result
                        .entry(*argument as u32)
                        .or_default()
                        .push(iter.get_index());
                }
            }
        }

        result
    }

    /// Length of the subroutine entered at `start`: decoded commands up to
    /// and including the first flow-ending one.
    fn subroutine_length(buffer: &CommandBuffer, start: usize) -> u16 {
        let mut index = start;
        while buffer.has_index(index) {
            match buffer.command_at(index) {
                Some(command) => {
                    index += command.size();
                    if command.is_end() {
                        break;
                    }
                }
                None => break,
            }
        }
        (index - start) as u16
    }
}

impl Detector for JsrDetector {
    fn id(&self) -> &'static str {
        "jsr"
    }

    fn detect(&self, buffer: &mut CommandBuffer) -> bool {
        let mut change = false;

        let cross_reference = self.cross_reference(buffer);
        for (address, references) in cross_reference {
            if !buffer.has_address(address) {
                // calls into ROM or other code outside the image
                continue;
            }
            let target = buffer.index_for_address(address);

            if buffer.set_type(target, CodeType::Opcode) {
                debug!(
                    "subroutine at {} called from {} sites, marked as code",
                    hex_word(address),
                    references.len()
                );
                change = true;
            }
            if buffer.get_subroutine(address).is_none() {
                let length = Self::subroutine_length(buffer, target);
                buffer.add_subroutine(Subroutine { address, length });
                change = true;
            }
        }

        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::opcode;

    fn jsr(argument: u16, reachable: bool) -> Command {
        Command::Opcode {
            opcode: opcode(0x20),
            argument,
            reachable,
        }
    }

    #[test]
    fn test_cross_reference() {
        let mut buffer = CommandBuffer::new(vec![0; 10], 0x1000);
        buffer.set_command(0, jsr(0x1000, true));
        buffer.set_command(3, jsr(0x1003, true));
        buffer.set_command(6, jsr(0x1000, true));
        buffer.set_command(
            9,
            Command::Opcode {
                opcode: opcode(0xEA),
                argument: 0,
                reachable: true,
            },
        );

        let cross_reference = JsrDetector.cross_reference(&buffer);

        assert_eq!(cross_reference.get(&0x1000), Some(&vec![0, 6]));
        assert_eq!(cross_reference.get(&0x1003), Some(&vec![3]));
        assert_eq!(cross_reference.len(), 2);
    }

    #[test]
    fn test_unreachable_calls_are_ignored() {
        let mut buffer = CommandBuffer::new(vec![0; 3], 0x1000);
        buffer.set_command(0, jsr(0x1000, false));
        assert!(JsrDetector.cross_reference(&buffer).is_empty());
    }

    #[test]
    fn test_detect_marks_targets_and_subroutines() {
        use crate::command_creator::CommandCreator;

        // JSR $1006, RTS, then the subroutine: LDA #$00, RTS
        let mut buffer = CommandBuffer::new(
            vec![0x20, 0x06, 0x10, 0x60, 0x00, 0x00, 0xA9, 0x00, 0x60],
            0x1000,
        );
        buffer.set_type_range(4, 6, CodeType::Data);
        CommandCreator::new(&mut buffer).create_commands();

        let detector = JsrDetector;
        assert!(detector.detect(&mut buffer));
        assert_eq!(buffer.get_type(6), CodeType::Opcode);
        let subroutine = buffer.get_subroutine(0x1006).unwrap();
        assert_eq!(subroutine.length, 3);

        assert!(!detector.detect(&mut buffer));
    }
}

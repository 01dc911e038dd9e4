//! Reclassifies unreachable BRK commands as data.

use log::debug;

use crate::code_type::CodeType;
use crate::command::Command;
use crate::command_buffer::CommandBuffer;
use crate::command_iter::CommandIterator;
use crate::opcode::OpcodeType;

use super::Detector;

/// A BRK the control flow cannot reach is almost always an embedded data
/// byte, not a deliberate trap.
pub struct BrkDetector;

impl Detector for BrkDetector {
    fn id(&self) -> &'static str {
        "brk"
    }

    fn detect(&self, buffer: &mut CommandBuffer) -> bool {
        let mut found = Vec::new();
        let mut iter = CommandIterator::new(buffer);
        while let Some(command) = iter.next() {
            if let Command::Opcode {
                opcode, reachable, ..
            } = command
            {
                if opcode.ty == OpcodeType::BRK && !reachable {
                    found.push(iter.get_index());
                }
            }
        }

        let mut change = false;
        for index in found {
            if buffer.set_type(index, CodeType::Data) {
                debug!("unreachable BRK at index {} reclassified as data", index);
                change = true;
            }
        }
        change
    }
}

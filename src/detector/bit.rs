//! Reclassifies unreachable BIT commands as data.

use log::debug;

use crate::code_type::CodeType;
use crate::command::Command;
use crate::command_buffer::CommandBuffer;
use crate::command_iter::CommandIterator;
use crate::opcode::OpcodeType;

use super::Detector;

/// BIT is often abused to skip the next instruction by swallowing it as the
/// argument. A BIT the control flow cannot reach is such a skip marker or
/// plain data, so its bytes are reclassified.
pub struct BitDetector;

impl Detector for BitDetector {
    fn id(&self) -> &'static str {
        "bit"
    }

    fn detect(&self, buffer: &mut CommandBuffer) -> bool {
        let mut found = Vec::new();
        let mut iter = CommandIterator::new(buffer);
        while let Some(command) = iter.next() {
            if let Command::Opcode {
                opcode, reachable, ..
            } = command
            {
                if opcode.ty == OpcodeType::BIT && !reachable {
                    found.push((iter.get_index(), iter.next_index()));
                }
            }
        }

        let mut change = false;
        for (start, end) in found {
            if buffer.set_type_range(start, end, CodeType::Data) {
                debug!(
                    "unreachable BIT at index {} reclassified as data",
                    start
                );
                change = true;
            }
        }
        change
    }
}

//! The decoder: turns classified raw bytes into commands.

use log::debug;

use crate::code_buffer::CodeBuffer;
use crate::code_type::CodeType;
use crate::command::Command;
use crate::command_buffer::CommandBuffer;
use crate::command_iter::CommandIterator;

/// Decodes a [`CommandBuffer`] according to its current classification.
///
/// Decoding is total: every byte ends up covered by exactly one command.
/// Running it twice on an unchanged buffer yields the same commands.
pub struct CommandCreator<'a> {
    buffer: &'a mut CommandBuffer,
    /// Index right behind the last added command.
    index: usize,
}

impl<'a> CommandCreator<'a> {
    pub fn new(buffer: &'a mut CommandBuffer) -> Self {
        CommandCreator { buffer, index: 0 }
    }

    /// Rebuild all commands: tokenize, combine data runs, then compute
    /// transitive unreachability.
    pub fn create_commands(&mut self) {
        self.create();
        combine(self.buffer);
        unreachability(self.buffer);
    }

    /// Tokenize the raw code into commands.
    fn create(&mut self) {
        let mut code = CodeBuffer::new(self.buffer.start_address(), self.buffer.code().to_vec());

        self.buffer.clear_commands();
        self.index = 0;
        while code.has_more() {
            let code_index = code.current_index();
            debug_assert_eq!(code_index, self.index);

            match self.buffer.get_type(self.index) {
                CodeType::Address => {
                    // absolute address stored as data
                    if code.has(2) {
                        let address = code.read(2) as u32;
                        self.buffer.add_reference(true, self.index, address);
                        self.add_command(Command::Address { address });
                    } else {
                        debug!(
                            "address classification at index {} runs off the code",
                            self.index
                        );
                        let byte = code.read_byte();
                        self.add_command(Command::Data { bytes: vec![byte] });
                    }
                }
                CodeType::Data => {
                    let byte = code.read_byte();
                    self.add_command(Command::Data { bytes: vec![byte] });
                }
                // unknown or code, try to disassemble an opcode
                code_type => {
                    let opcode = code.read_opcode();
                    let mode_size = opcode.mode.size();

                    // accept an undocumented opcode only when explicitly
                    // classified as one
                    if code.has(mode_size) && (opcode.legal || code_type == CodeType::Opcode) {
                        let argument = code.read(mode_size);
                        if opcode.mode.is_address() {
                            let pc = self.buffer.address_for_index(self.index);
                            let address = opcode.mode.address(pc, argument);
                            self.buffer
                                .add_reference(opcode.ty.is_jump(), self.index, address);
                        }
                        self.add_command(Command::Opcode {
                            opcode,
                            argument,
                            reachable: true,
                        });
                    } else {
                        debug!(
                            "no opcode at index {}, degrading {:#04X} to data",
                            self.index, opcode.code
                        );
                        code.set_current_index(code_index);
                        let byte = code.read_byte();
                        self.add_command(Command::Data { bytes: vec![byte] });
                    }
                }
            }
        }
    }

    fn add_command(&mut self, command: Command) {
        let size = command.size();
        self.buffer.set_command(self.index, command);
        self.index += size;
    }
}

/// Combine adjacent data commands, but never across a label.
fn combine(buffer: &mut CommandBuffer) {
    let mut last_index: Option<usize> = None;
    let mut index = 0;
    while buffer.has_index(index) {
        let command = match buffer.command_at(index) {
            Some(command) => command,
            None => {
                index += 1;
                continue;
            }
        };
        let size = command.size();

        let mut combined = false;
        if !buffer.has_label(buffer.address_for_index(index)) {
            if let Some(last) = last_index {
                let current = command.clone();
                if let Some(last_command) = buffer.command_at_mut(last) {
                    combined = last_command.combine_with(&current);
                }
            }
        }

        if combined {
            buffer.remove_command(index);
        } else {
            last_index = Some(index);
        }
        index += size;
    }
}

/// Compute transitive unreachability of opcode commands.
///
/// A command becomes unreachable when it flows into an unreachable command.
/// JSR is excepted since its argument data may directly follow the call, and
/// so are commands explicitly classified as code.
fn unreachability(buffer: &mut CommandBuffer) {
    let mut flipped = Vec::new();
    {
        let mut last_reachable = false;
        let mut iter = CommandIterator::new(buffer).reverse();
        while let Some(command) = iter.previous() {
            let mut reachable = command.is_reachable();
            if !last_reachable
                && reachable
                && !command.is_end()
                && !command.is_jsr()
                && !iter.get_type().is_code()
            {
                flipped.push(iter.get_index());
                reachable = false;
            }
            last_reachable = reachable;
        }
    }

    for index in flipped {
        if let Some(command) = buffer.command_at_mut(index) {
            command.set_reachable(false);
        }
        buffer.remove_reference_from(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(buffer: &mut CommandBuffer) {
        CommandCreator::new(buffer).create_commands();
    }

    #[test]
    fn test_decodes_plain_code() {
        // LDA #$00, STA $D020, RTS
        let mut buffer = CommandBuffer::new(vec![0xA9, 0x00, 0x8D, 0x20, 0xD0, 0x60], 0x1000);
        decode(&mut buffer);

        let mut iter = CommandIterator::new(&buffer);
        let lda = iter.next().unwrap();
        assert_eq!(lda.to_bytes(), vec![0xA9, 0x00]);
        assert!(lda.is_reachable());
        let sta = iter.next().unwrap();
        assert_eq!(sta.size(), 3);
        let rts = iter.next().unwrap();
        assert!(rts.is_end());
        assert!(!iter.has_next());

        // STA $D020 leaves an external data reference
        assert!(buffer.get_label(0xD020).map(|l| l.is_external()).unwrap_or(false));
    }

    #[test]
    fn test_illegal_opcode_degrades_to_data() {
        // 0x02 is KIL, not acceptable without an explicit opcode classification
        let mut buffer = CommandBuffer::new(vec![0x02, 0x60], 0x1000);
        decode(&mut buffer);
        assert_eq!(
            buffer.command_at(0),
            Some(&Command::Data { bytes: vec![0x02] })
        );
    }

    #[test]
    fn test_address_classification_decodes_address() {
        let mut buffer = CommandBuffer::new(vec![0x03, 0x10, 0x60, 0x00], 0x1000);
        buffer.set_type_range(0, 2, CodeType::Address);
        decode(&mut buffer);
        assert_eq!(
            buffer.command_at(0),
            Some(&Command::Address { address: 0x1003 })
        );
        // the stored address is a code reference, hence a code label
        assert!(buffer.get_label(0x1003).map(|l| l.is_code()).unwrap_or(false));
    }

    #[test]
    fn test_data_runs_combine_up_to_cap() {
        let mut buffer = CommandBuffer::new((1..=10).collect(), 0x1000);
        buffer.set_type_range(0, 10, CodeType::Data);
        decode(&mut buffer);

        let mut sizes = Vec::new();
        let mut iter = CommandIterator::new(&buffer);
        while let Some(command) = iter.next() {
            sizes.push(command.size());
        }
        assert_eq!(sizes, vec![8, 2]);
    }

    #[test]
    fn test_combine_stops_at_labels() {
        let mut buffer = CommandBuffer::new(vec![0x01, 0x02, 0x03, 0x04], 0x1000);
        buffer.set_type_range(0, 4, CodeType::Data);
        buffer.set_label(crate::label::Label::Data(0x1002));
        decode(&mut buffer);

        assert!(buffer.command_at(0).is_some());
        assert!(buffer.command_at(1).is_none());
        assert!(buffer.command_at(2).is_some());
        assert_eq!(buffer.command_at(2).unwrap().size(), 2);
    }

    #[test]
    fn test_code_flowing_into_data_is_unreachable() {
        // NOP followed by a data byte
        let mut buffer = CommandBuffer::new(vec![0xEA, 0x00], 0x1000);
        buffer.set_type(1, CodeType::Data);
        decode(&mut buffer);
        assert!(!buffer.command_at(0).unwrap().is_reachable());
    }

    #[test]
    fn test_flow_enders_stay_reachable() {
        // RTS followed by a data byte
        let mut buffer = CommandBuffer::new(vec![0x60, 0x00], 0x1000);
        buffer.set_type(1, CodeType::Data);
        decode(&mut buffer);
        assert!(buffer.command_at(0).unwrap().is_reachable());
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let mut buffer = CommandBuffer::new(vec![0xA9, 0x00, 0x00, 0xFF, 0x60], 0x1000);
        buffer.set_type(3, CodeType::Data);
        decode(&mut buffer);
        let first: Vec<Option<Command>> = (0..buffer.len())
            .map(|i| buffer.command_at(i).cloned())
            .collect();
        decode(&mut buffer);
        let second: Vec<Option<Command>> = (0..buffer.len())
            .map(|i| buffer.command_at(i).cloned())
            .collect();
        assert_eq!(first, second);
    }
}

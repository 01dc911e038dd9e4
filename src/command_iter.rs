//! Bidirectional traversal over the decoded commands of a buffer.

use crate::code_type::CodeType;
use crate::command::Command;
use crate::command_buffer::CommandBuffer;
use crate::label::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    BeforeStart,
    At(usize),
    AfterEnd,
}

/// Iterator over the commands of a [`CommandBuffer`].
///
/// Starts before the first command; [`CommandIterator::reverse`] flips it
/// behind the last one for backward traversal. The iterator only reads, so
/// callers apply classification changes through the buffer once traversal
/// is done.
pub struct CommandIterator<'a> {
    buffer: &'a CommandBuffer,
    cursor: Cursor,
}

impl<'a> CommandIterator<'a> {
    pub fn new(buffer: &'a CommandBuffer) -> Self {
        CommandIterator {
            buffer,
            cursor: Cursor::BeforeStart,
        }
    }

    /// Flip the iterator behind the last command for backward traversal.
    pub fn reverse(mut self) -> Self {
        self.cursor = Cursor::AfterEnd;
        self
    }

    /// Index of the current command.
    ///
    /// Panics when the iterator is not at a command.
    pub fn get_index(&self) -> usize {
        match self.cursor {
            Cursor::At(index) => index,
            _ => panic!("iterator is not at a command"),
        }
    }

    /// Index right behind the current command.
    pub fn next_index(&self) -> usize {
        let index = self.get_index();
        let size = self
            .buffer
            .command_at(index)
            .map(Command::size)
            .unwrap_or(1);
        index + size
    }

    /// Absolute address of the current command.
    pub fn get_address(&self) -> u32 {
        self.buffer.address_for_index(self.get_index())
    }

    /// Classification of the current command's first byte.
    pub fn get_type(&self) -> CodeType {
        self.buffer.get_type(self.get_index())
    }

    /// Label at the current command's address.
    pub fn get_label(&self) -> Option<&'a Label> {
        self.buffer.get_label(self.get_address())
    }

    /// A label pointing into the middle of the current command, if any.
    /// Such a label collides with the command layout and is flagged in the
    /// listing.
    pub fn conflicting_label(&self) -> Option<&'a Label> {
        let index = self.get_index();
        (index + 1..self.next_index())
            .filter(|inner| self.buffer.has_index(*inner))
            .find_map(|inner| self.buffer.get_label(self.buffer.address_for_index(inner)))
    }

    fn next_start(&self) -> Option<usize> {
        let mut index = match self.cursor {
            Cursor::BeforeStart => 0,
            Cursor::At(_) => self.next_index(),
            Cursor::AfterEnd => return None,
        };
        while self.buffer.has_index(index) {
            if self.buffer.command_at(index).is_some() {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    fn previous_start(&self) -> Option<usize> {
        let mut index = match self.cursor {
            Cursor::BeforeStart => return None,
            Cursor::At(index) => index,
            Cursor::AfterEnd => self.buffer.len(),
        };
        while index > 0 {
            index -= 1;
            if self.buffer.command_at(index).is_some() {
                return Some(index);
            }
        }
        None
    }

    pub fn has_next(&self) -> bool {
        self.next_start().is_some()
    }

    /// Move to the next command and return it.
    pub fn next(&mut self) -> Option<&'a Command> {
        let index = self.next_start()?;
        self.cursor = Cursor::At(index);
        self.buffer.command_at(index)
    }

    /// The next command without moving the cursor.
    pub fn peek(&self) -> Option<&'a Command> {
        self.next_start().and_then(|index| self.buffer.command_at(index))
    }

    pub fn has_previous(&self) -> bool {
        self.previous_start().is_some()
    }

    /// Move to the previous command and return it.
    pub fn previous(&mut self) -> Option<&'a Command> {
        let index = self.previous_start()?;
        self.cursor = Cursor::At(index);
        self.buffer.command_at(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::opcode;

    fn lda_sta_buffer() -> CommandBuffer {
        let mut buffer = CommandBuffer::new(vec![0; 6], 0x1000);
        // LDA $1234, STA $1234
        buffer.set_command(
            0,
            Command::Opcode {
                opcode: opcode(0xAD),
                argument: 0x1234,
                reachable: true,
            },
        );
        buffer.set_command(
            3,
            Command::Opcode {
                opcode: opcode(0x8D),
                argument: 0x1234,
                reachable: true,
            },
        );
        buffer
    }

    fn opcode_of(command: &Command) -> u8 {
        match command {
            Command::Opcode { opcode, .. } => opcode.code,
            _ => panic!("expected an opcode command"),
        }
    }

    #[test]
    fn test_next_command() {
        let buffer = lda_sta_buffer();
        let mut iter = CommandIterator::new(&buffer);

        assert!(iter.has_next());

        // $1000 LDA $1234
        assert_eq!(opcode_of(iter.next().unwrap()), 0xAD);
        assert_eq!(iter.get_index(), 0x0000);
        assert_eq!(iter.get_address(), 0x1000);

        // peeking does not move the iterator
        assert_eq!(opcode_of(iter.peek().unwrap()), 0x8D);
        assert_eq!(iter.get_index(), 0x0000);
        assert_eq!(iter.get_address(), 0x1000);

        // $1003 STA $1234
        assert_eq!(opcode_of(iter.next().unwrap()), 0x8D);
        assert_eq!(iter.get_index(), 0x0003);
        assert_eq!(iter.get_address(), 0x1003);

        assert!(!iter.has_next());
    }

    #[test]
    fn test_previous_command() {
        let buffer = lda_sta_buffer();
        let mut iter = CommandIterator::new(&buffer).reverse();

        assert!(iter.has_previous());

        // $1003 STA $1234
        assert_eq!(opcode_of(iter.previous().unwrap()), 0x8D);
        assert_eq!(iter.get_index(), 0x0003);
        assert_eq!(iter.get_address(), 0x1003);

        // $1000 LDA $1234
        assert_eq!(opcode_of(iter.previous().unwrap()), 0xAD);
        assert_eq!(iter.get_index(), 0x0000);
        assert_eq!(iter.get_address(), 0x1000);

        assert!(!iter.has_previous());
    }

    #[test]
    fn test_forward_traversal_partitions_buffer() {
        let buffer = lda_sta_buffer();
        let mut iter = CommandIterator::new(&buffer);
        let mut covered = 0;
        while let Some(command) = iter.next() {
            assert_eq!(iter.get_index(), covered);
            covered += command.size();
        }
        assert_eq!(covered, buffer.len());
    }
}

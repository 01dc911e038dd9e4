//! Reading cursor over a raw machine code image.

use log::info;

use crate::opcode::{opcode, Opcode};
use crate::util::{require_valid_address, to_word};

/// A machine code image plus a read position, consumed by the decoder.
#[derive(Debug, Clone)]
pub struct CodeBuffer {
    start_address: u32,
    code: Vec<u8>,
    current: usize,
}

impl CodeBuffer {
    /// Wrap an image mapped at `start_address`.
    ///
    /// Panics if the start address is outside the 16 bit address space.
    pub fn new(start_address: u32, code: Vec<u8>) -> Self {
        require_valid_address(start_address);
        CodeBuffer {
            start_address,
            code,
            current: 0,
        }
    }

    /// Build a buffer from a program file, i.e. an image prefixed with its
    /// 2-byte little-endian load address.
    pub fn from_program(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < 2 {
            return Err(format!(
                "program image too short: {} bytes, need at least the load address",
                bytes.len()
            ));
        }
        let start_address = to_word(bytes, 0) as u32;
        if start_address == 0x0801 {
            // TODO skip over the BASIC line that usually starts such programs
            info!("load address $0801, program likely starts with a BASIC header");
        }
        Ok(CodeBuffer::new(start_address, bytes[2..].to_vec()))
    }

    pub fn start_address(&self) -> u32 {
        self.start_address
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

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Move the cursor. Panics when placed past the end of the image.
    pub fn set_current_index(&mut self, index: usize) {
        assert!(index <= self.code.len(), "index {} out of bounds", index);
        self.current = index;
    }

    /// Is there at least one more byte to read?
    pub fn has_more(&self) -> bool {
        self.current < self.code.len()
    }

    /// Are there at least `count` more bytes to read?
    pub fn has(&self, count: usize) -> bool {
        self.current + count <= self.code.len()
    }

    pub fn read_byte(&mut self) -> u8 {
        let byte = self.code[self.current];
        self.current += 1;
        byte
    }

    /// Read `size` bytes (0, 1 or 2) as a little-endian word.
    pub fn read(&mut self, size: usize) -> u16 {
        debug_assert!(size <= 2);
        let mut value: u16 = 0;
        for shift in 0..size {
            value |= (self.read_byte() as u16) << (8 * shift);
        }
        value
    }

    /// Read one byte and look it up in the opcode table.
    pub fn read_opcode(&mut self) -> &'static Opcode {
        opcode(self.read_byte())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_program_strips_load_address() {
        let buffer = CodeBuffer::from_program(&[0x01, 0x08, 0xA9, 0x00, 0x60]).unwrap();
        assert_eq!(buffer.start_address(), 0x0801);
        assert_eq!(buffer.code(), &[0xA9, 0x00, 0x60]);
    }

    #[test]
    fn test_from_program_rejects_short_image() {
        assert!(CodeBuffer::from_program(&[0x01]).is_err());
    }

    #[test]
    fn test_reading() {
        let mut buffer = CodeBuffer::new(0x1000, vec![0xAD, 0x34, 0x12]);
        assert!(buffer.has(3));
        let op = buffer.read_opcode();
        assert_eq!(op.code, 0xAD);
        assert_eq!(buffer.read(2), 0x1234);
        assert!(!buffer.has_more());
    }
}

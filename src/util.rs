//! Byte and hex helpers shared by the decoder, writer and persistence code.

/// Highest valid 6502 address.
pub const MAX_ADDRESS: u32 = 0xFFFF;

/// Panic if the given absolute address is outside the 16 bit address space.
pub fn require_valid_address(address: u32) {
    assert!(
        address <= MAX_ADDRESS,
        "address {:#06X} out of 16 bit address space",
        address
    );
}

/// Low byte of a 16 bit word.
pub fn lo(word: u16) -> u8 {
    (word & 0xFF) as u8
}

/// High byte of a 16 bit word.
pub fn hi(word: u16) -> u8 {
    (word >> 8) as u8
}

/// Read a little-endian 16 bit word at the given offset.
pub fn to_word(bytes: &[u8], offset: usize) -> u16 {
    (bytes[offset] as u16) | ((bytes[offset + 1] as u16) << 8)
}

/// Render a byte as `$XX`.
pub fn hex_byte(value: u8) -> String {
    format!("${:02X}", value)
}

/// Render a word as `$XXXX`.
pub fn hex_word(value: u32) -> String {
    format!("${:04X}", value)
}

/// Render a value as `$XX` when it fits a byte, `$XXXX` otherwise.
pub fn hex(value: u32) -> String {
    if value < 0x100 {
        hex_byte(value as u8)
    } else {
        hex_word(value)
    }
}

/// Render a byte as `XX` (no `$`), for the raw-bytes listing column.
pub fn hex_byte_plain(value: u8) -> String {
    format!("{:02X}", value)
}

/// Render a word as `XXXX` (no `$`), for addresses and label names.
pub fn hex_word_plain(value: u32) -> String {
    format!("{:04X}", value)
}

//! Decoded commands: opcodes, stored addresses and data runs.

use crate::command_buffer::CommandBuffer;
use crate::opcode::Opcode;
use crate::util::{hex_byte, hex_word, lo, hi};

/// Longest data run rendered on a single `!BYTE` line.
pub const MAX_DATA_BYTES: usize = 8;

/// One decoded command, starting at some index of the command buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A (possibly undocumented) instruction with its raw argument.
    Opcode {
        opcode: &'static Opcode,
        argument: u16,
        reachable: bool,
    },
    /// A little-endian absolute address stored as data.
    Address { address: u32 },
    /// A run of plain data bytes.
    Data { bytes: Vec<u8> },
}

impl Command {
    /// Number of code bytes this command covers.
    pub fn size(&self) -> usize {
        match self {
            Command::Opcode { opcode, .. } => opcode.size(),
            Command::Address { .. } => 2,
            Command::Data { bytes } => bytes.len(),
        }
    }

    /// The raw bytes this command was decoded from.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Command::Opcode {
                opcode, argument, ..
            } => {
                let mut bytes = vec![opcode.code];
                match opcode.mode.size() {
                    0 => {}
                    1 => bytes.push(lo(*argument)),
                    _ => {
                        bytes.push(lo(*argument));
                        bytes.push(hi(*argument));
                    }
                }
                bytes
            }
            Command::Address { address } => vec![lo(*address as u16), hi(*address as u16)],
            Command::Data { bytes } => bytes.clone(),
        }
    }

    /// Can execution not fall through to the following command?
    pub fn is_end(&self) -> bool {
        match self {
            Command::Opcode { opcode, .. } => opcode.ty.is_end(),
            Command::Address { .. } | Command::Data { .. } => true,
        }
    }

    /// Is this command currently considered reachable by the control flow?
    /// Only opcode commands can be reachable.
    pub fn is_reachable(&self) -> bool {
        match self {
            Command::Opcode { reachable, .. } => *reachable,
            Command::Address { .. } | Command::Data { .. } => false,
        }
    }

    /// Update reachability. No effect on non-opcode commands.
    pub fn set_reachable(&mut self, value: bool) {
        if let Command::Opcode { reachable, .. } = self {
            *reachable = value;
        }
    }

    /// Is this a subroutine call?
    pub fn is_jsr(&self) -> bool {
        matches!(self, Command::Opcode { opcode, .. } if opcode.ty == crate::opcode::OpcodeType::JSR)
    }

    /// The absolute address this command references, if any.
    pub fn argument_address(&self, pc: u32) -> Option<u32> {
        match self {
            Command::Opcode {
                opcode, argument, ..
            } if opcode.mode.is_address() => Some(opcode.mode.address(pc, *argument)),
            Command::Address { address } => Some(*address),
            _ => None,
        }
    }

    /// Try to append `other` to this command.
    ///
    /// Only data runs combine. A run of identical bytes may grow without
    /// bound since it renders as a single `!FILL`; mixed runs are capped at
    /// [`MAX_DATA_BYTES`] per line.
    pub fn combine_with(&mut self, other: &Command) -> bool {
        let (bytes, more) = match (&mut *self, other) {
            (Command::Data { bytes }, Command::Data { bytes: more }) => (bytes, more),
            _ => return false,
        };
        let same_byte = |run: &[u8]| run.windows(2).all(|pair| pair[0] == pair[1]);
        let uniform = same_byte(bytes)
            && same_byte(more)
            && (bytes.is_empty() || more.is_empty() || bytes[0] == more[0]);
        if !uniform && bytes.len() + more.len() > MAX_DATA_BYTES {
            return false;
        }
        bytes.extend_from_slice(more);
        true
    }

    /// Render the command as assembler source.
    ///
    /// `pc` is the absolute address of the command. Address arguments are
    /// substituted with labels from the buffer where one exists.
    pub fn render(&self, pc: u32, buffer: &CommandBuffer) -> String {
        match self {
            Command::Opcode {
                opcode, argument, ..
            } => {
                if opcode.mode.is_address() {
                    let address = opcode.mode.address(pc, *argument);
                    if let Some(label) = buffer.get_label(address) {
                        let operand = opcode.mode.render(&label.render_at(address));
                        return format!("{} {}", opcode.ty, operand);
                    }
                }
                opcode.render_raw(pc, *argument)
            }
            Command::Address { address } => match buffer.get_label(*address) {
                Some(label) => format!("!WORD {}", label.render_at(*address)),
                None => format!("!WORD {}", hex_word(*address)),
            },
            Command::Data { bytes } => {
                if bytes.len() > MAX_DATA_BYTES && bytes.iter().all(|b| *b == bytes[0]) {
                    format!("!FILL {}, {}", bytes.len(), hex_byte(bytes[0]))
                } else {
                    let rendered: Vec<String> = bytes.iter().map(|b| hex_byte(*b)).collect();
                    format!("!BYTE {}", rendered.join(", "))
                }
            }
        }
    }
}

//! Per-byte classification tags driving the reassembly fixed point.

use serde::{Deserialize, Serialize};

/// Classification of a single byte of the reassembled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CodeType {
    /// Classification is not known yet.
    Unknown,
    /// Plain data.
    Data,
    /// Code (opcode or argument byte).
    Code,
    /// An opcode starts at this position.
    Opcode,
    /// A little-endian absolute address stored as data.
    Address,
}

impl CodeType {
    /// Is the classification still undetermined?
    pub fn is_unknown(self) -> bool {
        self == CodeType::Unknown
    }

    /// Is this position known to hold code?
    pub fn is_code(self) -> bool {
        self == CodeType::Opcode || self == CodeType::Code
    }

    /// Is this position known to hold data?
    pub fn is_data(self) -> bool {
        self == CodeType::Data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(CodeType::Unknown.is_unknown());
        assert!(CodeType::Opcode.is_code());
        assert!(CodeType::Code.is_code());
        assert!(!CodeType::Data.is_code());
        assert!(CodeType::Data.is_data());
        assert!(!CodeType::Address.is_code());
    }
}

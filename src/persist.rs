//! Persistent, canonical TOML form of a reassembly session.
//!
//! The document captures the raw code, the rebase table including its
//! sentinel entries, the classification as run-length transitions (unknown
//! runs are skipped), the subroutines and the detector pipeline ids.
//! Loading re-runs the decoder, so commands, references and labels are
//! rebuilt rather than stored. Serialization is canonical: loading a saved
//! document and saving it again yields the identical string.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::code_type::CodeType;
use crate::command_buffer::{CommandBuffer, Subroutine};
use crate::command_creator::CommandCreator;
use crate::detector::detector_by_id;
use crate::reassembler::Reassembler;
use crate::util::{hex_word_plain, MAX_ADDRESS};

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassemblerDoc {
    pub detectors: Vec<String>,
    pub code: CodeDoc,
    pub addresses: Vec<AddressDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subroutines: Vec<SubroutineDoc>,
}

/// Raw code with its start address, both as plain hex.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDoc {
    pub start: String,
    pub bytes: String,
}

/// One rebase table entry.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDoc {
    pub index: String,
    pub base: String,
}

/// One classification run: `[index, end)` if `end` is present, a single
/// index otherwise.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDoc {
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(rename = "type")]
    pub code_type: CodeType,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubroutineDoc {
    pub address: String,
    pub length: String,
}

/// Capture the persistent state of a reassembler.
pub fn to_document(reassembler: &Reassembler) -> ReassemblerDoc {
    let commands = reassembler.commands();

    let mut bytes = String::with_capacity(commands.len() * 2);
    for byte in commands.code() {
        let _ = write!(bytes, "{:02X}", byte);
    }

    let addresses = commands
        .start_addresses()
        .iter()
        .map(|(index, base)| AddressDoc {
            index: hex_word_plain(*index as u32),
            base: hex_word_plain(*base),
        })
        .collect();

    let mut types = Vec::new();
    let mut index = 0;
    while index < commands.len() {
        let start = index;
        let code_type = commands.get_type(index);
        index += 1;
        if code_type.is_unknown() {
            continue;
        }
        while index < commands.len() && commands.get_type(index) == code_type {
            index += 1;
        }
        types.push(TypeDoc {
            index: hex_word_plain(start as u32),
            end: (index - start > 1).then(|| hex_word_plain(index as u32)),
            code_type,
        });
    }

    let subroutines = commands
        .subroutines()
        .values()
        .map(|subroutine| SubroutineDoc {
            address: hex_word_plain(subroutine.address),
            length: hex_word_plain(subroutine.length as u32),
        })
        .collect();

    ReassemblerDoc {
        detectors: reassembler
            .detectors()
            .iter()
            .map(|detector| detector.id().to_string())
            .collect(),
        code: CodeDoc {
            start: hex_word_plain(commands.start_address()),
            bytes,
        },
        addresses,
        types,
        subroutines,
    }
}

/// Serialize a reassembler to its canonical TOML form.
pub fn save(reassembler: &Reassembler) -> Result<String, String> {
    toml::to_string(&to_document(reassembler))
        .map_err(|e| format!("failed to serialize reassembler state: {}", e))
}

/// Restore a reassembler from its TOML form and re-run the decoder.
pub fn load(input: &str) -> Result<Reassembler, String> {
    let doc: ReassemblerDoc =
        toml::from_str(input).map_err(|e| format!("failed to parse reassembler state: {}", e))?;
    from_document(&doc)
}

/// Rebuild a reassembler from a parsed document.
///
/// Every value is validated before it reaches the command buffer, so a
/// parseable but corrupt document comes back as an error, never a panic.
pub fn from_document(doc: &ReassemblerDoc) -> Result<Reassembler, String> {
    let code = parse_hex_bytes(&doc.code.bytes)?;
    let start_address = parse_hex_word(&doc.code.start)?;
    if start_address > MAX_ADDRESS {
        return Err(format!(
            "start address {} out of the address space",
            doc.code.start
        ));
    }
    let length = code.len();
    if start_address as usize + length > MAX_ADDRESS as usize + 1 {
        return Err(format!(
            "{} code bytes at {} run past the address space",
            length, doc.code.start
        ));
    }

    // an empty image collapses both sentinels into a single entry
    if doc.addresses.is_empty() {
        return Err("rebase table must hold its sentinel entries".to_string());
    }
    let first = &doc.addresses[0];
    if parse_hex_word(&first.index)? != 0 || parse_hex_word(&first.base)? != start_address {
        return Err("first rebase entry must map index 0 to the start address".to_string());
    }
    let last = &doc.addresses[doc.addresses.len() - 1];
    if parse_hex_word(&last.index)? as usize != length
        || parse_hex_word(&last.base)? != start_address
    {
        return Err("last rebase entry must map the code length to the start address".to_string());
    }

    let mut commands = CommandBuffer::new(code, start_address);
    let mut previous = 0;
    for entry in &doc.addresses[1..doc.addresses.len().max(2) - 1] {
        let index = parse_hex_word(&entry.index)? as usize;
        if index <= previous || index >= length {
            return Err(format!(
                "rebase entry {} out of order or out of bounds",
                entry.index
            ));
        }
        let base = parse_hex_word(&entry.base)?;
        if base > MAX_ADDRESS {
            return Err(format!("rebase base {} out of the address space", entry.base));
        }
        commands.rebase(index, base);
        previous = index;
    }

    for run in &doc.types {
        let index = parse_hex_word(&run.index)? as usize;
        if index >= length {
            return Err(format!("type run at {} out of bounds", run.index));
        }
        match &run.end {
            Some(end) => {
                let end_index = parse_hex_word(end)? as usize;
                if end_index <= index || end_index > length {
                    return Err(format!("type run end {} out of bounds", end));
                }
                commands.set_type_range(index, end_index, run.code_type);
            }
            None => {
                commands.set_type(index, run.code_type);
            }
        }
    }

    for entry in &doc.subroutines {
        let address = parse_hex_word(&entry.address)?;
        if commands.get_subroutine(address).is_some() {
            return Err(format!("duplicate subroutine at {}", entry.address));
        }
        commands.add_subroutine(Subroutine {
            address,
            length: parse_hex_word(&entry.length)? as u16,
        });
    }

    CommandCreator::new(&mut commands).create_commands();

    let detectors = doc
        .detectors
        .iter()
        .map(|id| detector_by_id(id))
        .collect::<Result<Vec<_>, _>>()?;
    let mut reassembler = Reassembler::with_detectors(detectors);
    reassembler.set_commands(commands);
    Ok(reassembler)
}

fn parse_hex_word(hex: &str) -> Result<u32, String> {
    u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex word: {:?}", hex))
}

fn parse_hex_bytes(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("odd number of hex digits in code".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte: {:?}", &hex[i..i + 2]))
        })
        .collect()
}

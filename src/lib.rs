#![crate_name = "reasm64"]

#[macro_use]
extern crate lazy_static;

pub mod code_buffer;
pub mod code_type;
pub mod command;
pub mod command_buffer;
pub mod command_creator;
pub mod command_iter;
pub mod detector;
pub mod label;
pub mod opcode;
pub mod persist;
pub mod reassembler;
pub mod util;
pub mod writer;

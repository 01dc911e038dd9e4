use log::debug;
use reasm64::code_buffer::CodeBuffer;
use reasm64::detector::JsrDetector;
use reasm64::reassembler::Reassembler;
use reasm64::util::hex_word;
use std::env;
use std::fs;

/// Prints the subroutine call cross-reference of a program: every JSR
/// target with the addresses of its call sites.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <program.prg>", args[0]);
        std::process::exit(1);
    }

    let program = fs::read(&args[1])?;
    let code = CodeBuffer::from_program(&program)?;
    debug!("loaded {} code bytes from {}", code.len(), args[1]);

    let mut reassembler = Reassembler::new();
    reassembler.reassemble(code);
    let commands = reassembler.commands();

    let mut cross_reference = JsrDetector.cross_reference(commands);
    cross_reference.sort_keys();

    for (address, references) in &cross_reference {
        let sites: Vec<String> = references
            .iter()
            .map(|index| hex_word(commands.address_for_index(*index)))
            .collect();
        let subroutine = commands
            .get_subroutine(*address)
            .map(|s| format!(" ({} bytes)", s.length))
            .unwrap_or_default();
        println!(
            "{}{} <- {}",
            hex_word(*address),
            subroutine,
            sites.join(", ")
        );
    }

    Ok(())
}

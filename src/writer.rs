//! Writes assembler source with debug columns from a command buffer.

use std::fmt;

use crate::command::Command;
use crate::command_buffer::CommandBuffer;
use crate::command_iter::CommandIterator;
use crate::util::{hex, hex_byte_plain, hex_word, hex_word_plain};

const PREFIX_COLUMN: usize = 5;
const BYTES_COLUMN: usize = 21;
const TEXT_COLUMN: usize = 40;

/// Write the full listing: start address, external equates, then one line
/// per command.
pub fn write_listing(commands: &CommandBuffer, output: &mut impl fmt::Write) -> fmt::Result {
    writeln!(output, "*={}", hex_word(commands.start_address()))?;
    writeln!(output)?;

    // labels map is sorted by address
    for label in commands.external_labels() {
        writeln!(output, "{} = {}", label.name(), hex(label.address()))?;
    }
    writeln!(output)?;

    let mut line = String::with_capacity(80);
    let mut iter = CommandIterator::new(commands);
    while let Some(command) = iter.next() {
        let pc = iter.get_address();

        line.clear();

        // debug prefixes: U for unreachable code, C/D for labels colliding
        // with the middle of the command
        if let Command::Opcode {
            reachable: false, ..
        } = command
        {
            line.push('U');
        }
        if let Some(label) = iter.conflicting_label() {
            line.push(if label.is_code() { 'C' } else { 'D' });
        }
        fill_spaces(&mut line, PREFIX_COLUMN);
        line.push_str(" | ");

        // address and up to 3 raw bytes
        line.push_str(&hex_word_plain(pc));
        let bytes = command.to_bytes();
        for byte in bytes.iter().take(3) {
            line.push(' ');
            line.push_str(&hex_byte_plain(*byte));
        }
        fill_spaces(&mut line, BYTES_COLUMN);
        line.push_str(if bytes.len() > 3 { "..." } else { "   " });
        line.push_str(" | ");

        // label declaration
        if let Some(label) = iter.get_label() {
            line.push_str(&label.name());
            line.push(':');
        }
        fill_spaces(&mut line, TEXT_COLUMN);

        line.push_str(&command.render(pc, commands));
        writeln!(output, "{}", line.trim_end())?;
    }

    Ok(())
}

fn fill_spaces(line: &mut String, limit: usize) {
    while line.len() < limit {
        line.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_buffer::CodeBuffer;
    use crate::reassembler::Reassembler;

    fn listing_of(code: Vec<u8>, start_address: u32) -> String {
        let mut reassembler = Reassembler::new();
        reassembler.reassemble(CodeBuffer::new(start_address, code));
        let mut output = String::new();
        write_listing(reassembler.commands(), &mut output).unwrap();
        output
    }

    #[test]
    fn test_header_and_equates() {
        // LDA #$00, STA $D020, RTS
        let listing = listing_of(vec![0xA9, 0x00, 0x8D, 0x20, 0xD0, 0x60], 0x1000);
        let lines: Vec<&str> = listing.lines().collect();

        assert_eq!(lines[0], "*=$1000");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "X_D020 = $D020");
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_column_layout() {
        let listing = listing_of(vec![0xA9, 0x00, 0x8D, 0x20, 0xD0, 0x60], 0x1000);
        let lines: Vec<&str> = listing.lines().collect();

        // address column starts at 8, text column at 40
        let lda = lines[4];
        assert_eq!(&lda[8..12], "1000");
        assert_eq!(lda.find("LDA #$00"), Some(TEXT_COLUMN));

        let sta = lines[5];
        assert_eq!(&sta[8..12], "1002");
        assert_eq!(sta.find("STA X_D020"), Some(TEXT_COLUMN));

        let rts = lines[6];
        assert_eq!(&rts[8..15], "1005 60");
        assert_eq!(rts.find("RTS"), Some(TEXT_COLUMN));
    }

    #[test]
    fn test_label_declaration_and_fill() {
        // JSR $1004, RTS, subroutine: LDA #$01, RTS, then a run of zeros
        let mut code = vec![0x20, 0x04, 0x10, 0x60, 0xA9, 0x01, 0x60];
        code.extend_from_slice(&[0xFF; 10]);
        let mut reassembler = Reassembler::new();
        reassembler.reassemble(CodeBuffer::new(0x1000, code));
        reassembler
            .commands_mut()
            .set_type_range(7, 17, crate::code_type::CodeType::Data);
        reassembler.run();

        let mut output = String::new();
        write_listing(reassembler.commands(), &mut output).unwrap();

        // subroutine entry carries its code label declaration
        assert!(output.contains("L_1004:"));
        assert!(output.lines().any(|l| l.contains("JSR L_1004")));
        // the uniform data run collapses to a fill directive
        assert!(output.lines().any(|l| l.contains("!FILL 10, $FF")));
        // more than 3 raw bytes are marked with an ellipsis
        assert!(output.lines().any(|l| l.contains("...")));
    }
}

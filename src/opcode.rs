//! Static 6502 opcode table: mnemonic, addressing mode, size and flow behavior
//! for all 256 byte values, undocumented opcodes included.

use crate::util::{hex_byte, hex_word};
use std::fmt;

/// Opcode mnemonics.
///
/// Carries the two semantic flags the reassembler cares about: whether the
/// argument is a control flow destination and whether the following byte is
/// reachable by fall-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeType {
    // logical/arithmetic
    ORA,
    AND,
    EOR,
    ADC,
    SBC,
    CMP,
    CPX,
    CPY,
    DEC,
    DEX,
    DEY,
    INC,
    INX,
    INY,
    ASL,
    ROL,
    LSR,
    ROR,

    // moves
    LDA,
    STA,
    LDX,
    STX,
    LDY,
    STY,
    TAX,
    TXA,
    TAY,
    TYA,
    TSX,
    TXS,
    PLA,
    PHA,
    PLP,
    PHP,

    // jumps/flags
    BPL,
    BMI,
    BVC,
    BVS,
    BCC,
    BCS,
    BNE,
    BEQ,
    BRK,
    RTI,
    JSR,
    RTS,
    JMP,
    BIT,
    CLC,
    SEC,
    CLD,
    SED,
    CLI,
    SEI,
    CLV,
    NOP,

    // undocumented
    SLO,
    RLA,
    SRE,
    RRA,
    SAX,
    LAX,
    DCP,
    ISC,
    ANC,
    ALR,
    ARR,
    XAA,
    AXS,
    AHX,
    SHY,
    SHX,
    TAS,
    LAS,

    // jams the CPU
    KIL,
}

impl OpcodeType {
    /// Is the argument of this opcode a jump/branch destination?
    pub fn is_jump(self) -> bool {
        use OpcodeType::*;
        matches!(self, BPL | BMI | BVC | BVS | BCC | BCS | BNE | BEQ | JSR | JMP)
    }

    /// Is the byte right after this opcode not reachable by fall-through?
    pub fn is_end(self) -> bool {
        use OpcodeType::*;
        matches!(self, BRK | RTI | RTS | JMP)
    }
}

impl fmt::Display for OpcodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeMode {
    /// Implied, no argument.
    DIR,
    /// Accumulator, no argument.
    ACC,
    /// `#$00`
    IMM,
    /// `$00`
    ZPD,
    /// `$00,X`
    ZPX,
    /// `$00,Y`
    ZPY,
    /// `($00,X)`
    IZX,
    /// `($00),Y`
    IZY,
    /// `$0000`
    ABS,
    /// `$0000,X`
    ABX,
    /// `$0000,Y`
    ABY,
    /// `($0000)`
    IND,
    /// `$0000`, pc-relative encoded as a signed byte
    REL,
}

impl OpcodeMode {
    /// Number of argument bytes this mode consumes.
    pub fn size(self) -> usize {
        use OpcodeMode::*;
        match self {
            DIR | ACC => 0,
            IMM | ZPD | ZPX | ZPY | IZX | IZY | REL => 1,
            ABS | ABX | ABY | IND => 2,
        }
    }

    /// Does the argument denote a memory address?
    pub fn is_address(self) -> bool {
        use OpcodeMode::*;
        !matches!(self, DIR | ACC | IMM)
    }

    /// Compute the absolute address the argument denotes.
    ///
    /// `pc` is the address of the opcode byte. Only meaningful for modes
    /// where [`OpcodeMode::is_address`] holds.
    pub fn address(self, pc: u32, argument: u16) -> u32 {
        match self {
            // the argument is a signed byte relative to the next opcode
            OpcodeMode::REL => {
                (pc as i32 + 2 + (argument as u8 as i8) as i32) as u32 & 0xFFFF
            }
            _ => argument as u32,
        }
    }

    /// Operand grammar for this mode with an already rendered argument.
    /// Used for reassembly when the argument is a label.
    pub fn render(self, argument: &str) -> String {
        use OpcodeMode::*;
        match self {
            DIR | ACC => String::new(),
            IMM => format!("#{}", argument),
            ZPD | ABS | REL => argument.to_string(),
            ZPX | ABX => format!("{},X", argument),
            ZPY | ABY => format!("{},Y", argument),
            IZX => format!("({},X)", argument),
            IZY => format!("({}),Y", argument),
            IND => format!("({})", argument),
        }
    }

    /// Operand grammar with the raw numeric argument.
    pub fn render_raw(self, pc: u32, argument: u16) -> String {
        use OpcodeMode::*;
        match self {
            DIR | ACC => String::new(),
            REL => self.render(&hex_word(self.address(pc, argument))),
            _ if self.size() == 1 => self.render(&hex_byte(argument as u8)),
            _ => self.render(&hex_word(argument as u32)),
        }
    }
}

/// One entry of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    /// Byte representation.
    pub code: u8,
    /// Is this a documented opcode?
    pub legal: bool,
    /// Mnemonic and flow semantics.
    pub ty: OpcodeType,
    /// Addressing mode.
    pub mode: OpcodeMode,
    /// Cycles the opcode normally needs, ignoring page crossings.
    pub cycles: u8,
}

impl Opcode {
    /// Size of the whole instruction including the argument.
    pub fn size(&self) -> usize {
        1 + self.mode.size()
    }

    /// Disassembled representation with a raw argument.
    pub fn render_raw(&self, pc: u32, argument: u16) -> String {
        let operand = self.mode.render_raw(pc, argument);
        if operand.is_empty() {
            self.ty.to_string()
        } else {
            format!("{} {}", self.ty, operand)
        }
    }
}

lazy_static! {
    /// The full opcode table, indexed by byte value.
    pub static ref OPCODES: [Opcode; 256] = build_table();
}

/// Look up the table entry for a byte value.
pub fn opcode(code: u8) -> &'static Opcode {
    &OPCODES[code as usize]
}

fn build_table() -> [Opcode; 256] {
    use OpcodeMode::*;
    use OpcodeType::*;

    const REG: bool = true;
    const ILL: bool = false;

    // (legal, mnemonic, mode, cycles), row per high nibble
    let specs: [(bool, OpcodeType, OpcodeMode, u8); 256] = [
        // 0x00
        (REG, BRK, DIR, 7),
        (REG, ORA, IZX, 6),
        (ILL, KIL, DIR, 0),
        (ILL, SLO, IZX, 8),
        (ILL, NOP, ZPD, 3),
        (REG, ORA, ZPD, 3),
        (REG, ASL, ZPD, 5),
        (ILL, SLO, ZPD, 5),
        (REG, PHP, DIR, 3),
        (REG, ORA, IMM, 2),
        (REG, ASL, ACC, 2),
        (ILL, ANC, IMM, 2),
        (ILL, NOP, ABS, 4),
        (REG, ORA, ABS, 4),
        (REG, ASL, ABS, 6),
        (ILL, SLO, ABS, 6),
        // 0x10
        (REG, BPL, REL, 2),
        (REG, ORA, IZY, 5),
        (ILL, KIL, DIR, 0),
        (ILL, SLO, IZY, 8),
        (ILL, NOP, ZPX, 4),
        (REG, ORA, ZPX, 4),
        (REG, ASL, ZPX, 6),
        (ILL, SLO, ZPX, 6),
        (REG, CLC, DIR, 2),
        (REG, ORA, ABY, 4),
        (ILL, NOP, DIR, 2),
        (ILL, SLO, ABY, 7),
        (ILL, NOP, ABX, 4),
        (REG, ORA, ABX, 4),
        (REG, ASL, ABX, 7),
        (ILL, SLO, ABX, 7),
        // 0x20
        (REG, JSR, ABS, 6),
        (REG, AND, IZX, 6),
        (ILL, KIL, DIR, 0),
        (ILL, RLA, IZX, 8),
        (REG, BIT, ZPD, 3),
        (REG, AND, ZPD, 3),
        (REG, ROL, ZPD, 5),
        (ILL, RLA, ZPD, 5),
        (REG, PLP, DIR, 4),
        (REG, AND, IMM, 2),
        (REG, ROL, ACC, 2),
        (ILL, ANC, IMM, 2),
        (REG, BIT, ABS, 4),
        (REG, AND, ABS, 4),
        (REG, ROL, ABS, 6),
        (ILL, RLA, ABS, 6),
        // 0x30
        (REG, BMI, REL, 2),
        (REG, AND, IZY, 5),
        (ILL, KIL, DIR, 0),
        (ILL, RLA, IZY, 8),
        (ILL, NOP, ZPX, 4),
        (REG, AND, ZPX, 4),
        (REG, ROL, ZPX, 6),
        (ILL, RLA, ZPX, 6),
        (REG, SEC, DIR, 2),
        (REG, AND, ABY, 4),
        (ILL, NOP, DIR, 2),
        (ILL, RLA, ABY, 7),
        (ILL, NOP, ABX, 4),
        (REG, AND, ABX, 4),
        (REG, ROL, ABX, 7),
        (ILL, RLA, ABX, 7),
        // 0x40
        (REG, RTI, DIR, 6),
        (REG, EOR, IZX, 6),
        (ILL, KIL, DIR, 0),
        (ILL, SRE, IZX, 8),
        (ILL, NOP, ZPD, 3),
        (REG, EOR, ZPD, 3),
        (REG, LSR, ZPD, 5),
        (ILL, SRE, ZPD, 5),
        (REG, PHA, DIR, 3),
        (REG, EOR, IMM, 2),
        (REG, LSR, ACC, 2),
        (ILL, ALR, IMM, 2),
        (REG, JMP, ABS, 3),
        (REG, EOR, ABS, 4),
        (REG, LSR, ABS, 6),
        (ILL, SRE, ABS, 6),
        // 0x50
        (REG, BVC, REL, 2),
        (REG, EOR, IZY, 5),
        (ILL, KIL, DIR, 0),
        (ILL, SRE, IZY, 8),
        (ILL, NOP, ZPX, 4),
        (REG, EOR, ZPX, 4),
        (REG, LSR, ZPX, 6),
        (ILL, SRE, ZPX, 6),
        (REG, CLI, DIR, 2),
        (REG, EOR, ABY, 4),
        (ILL, NOP, DIR, 2),
        (ILL, SRE, ABY, 7),
        (ILL, NOP, ABX, 4),
        (REG, EOR, ABX, 4),
        (REG, LSR, ABX, 7),
        (ILL, SRE, ABX, 7),
        // 0x60
        (REG, RTS, DIR, 6),
        (REG, ADC, IZX, 6),
        (ILL, KIL, DIR, 0),
        (ILL, RRA, IZX, 8),
        (ILL, NOP, ZPD, 3),
        (REG, ADC, ZPD, 3),
        (REG, ROR, ZPD, 5),
        (ILL, RRA, ZPD, 5),
        (REG, PLA, DIR, 4),
        (REG, ADC, IMM, 2),
        (REG, ROR, ACC, 2),
        (ILL, ARR, IMM, 2),
        (REG, JMP, IND, 5),
        (REG, ADC, ABS, 4),
        (REG, ROR, ABS, 6),
        (ILL, RRA, ABS, 6),
        // 0x70
        (REG, BVS, REL, 2),
        (REG, ADC, IZY, 5),
        (ILL, KIL, DIR, 0),
        (ILL, RRA, IZY, 8),
        (ILL, NOP, ZPX, 4),
        (REG, ADC, ZPX, 4),
        (REG, ROR, ZPX, 6),
        (ILL, RRA, ZPX, 6),
        (REG, SEI, DIR, 2),
        (REG, ADC, ABY, 4),
        (ILL, NOP, DIR, 2),
        (ILL, RRA, ABY, 7),
        (ILL, NOP, ABX, 4),
        (REG, ADC, ABX, 4),
        (REG, ROR, ABX, 7),
        (ILL, RRA, ABX, 7),
        // 0x80
        (ILL, NOP, IMM, 2),
        (REG, STA, IZX, 6),
        (ILL, NOP, IMM, 2),
        (ILL, SAX, IZX, 6),
        (REG, STY, ZPD, 3),
        (REG, STA, ZPD, 3),
        (REG, STX, ZPD, 3),
        (ILL, SAX, ZPD, 3),
        (REG, DEY, DIR, 2),
        (ILL, NOP, IMM, 2),
        (REG, TXA, DIR, 2),
        (ILL, XAA, IMM, 2),
        (REG, STY, ABS, 4),
        (REG, STA, ABS, 4),
        (REG, STX, ABS, 4),
        (ILL, SAX, ABS, 4),
        // 0x90
        (REG, BCC, REL, 2),
        (REG, STA, IZY, 6),
        (ILL, KIL, DIR, 0),
        (ILL, AHX, IZY, 6),
        (REG, STY, ZPX, 4),
        (REG, STA, ZPX, 4),
        (REG, STX, ZPY, 4),
        (ILL, SAX, ZPY, 4),
        (REG, TYA, DIR, 2),
        (REG, STA, ABY, 5),
        (REG, TXS, DIR, 2),
        (ILL, TAS, ABY, 5),
        (ILL, SHY, ABX, 5),
        (REG, STA, ABX, 5),
        (ILL, SHX, ABY, 5),
        (ILL, AHX, ABY, 5),
        // 0xA0
        (REG, LDY, IMM, 2),
        (REG, LDA, IZX, 6),
        (REG, LDX, IMM, 2),
        (ILL, LAX, IZX, 6),
        (REG, LDY, ZPD, 3),
        (REG, LDA, ZPD, 3),
        (REG, LDX, ZPD, 3),
        (ILL, LAX, ZPD, 3),
        (REG, TAY, DIR, 2),
        (REG, LDA, IMM, 2),
        (REG, TAX, DIR, 2),
        (ILL, LAX, IMM, 2),
        (REG, LDY, ABS, 4),
        (REG, LDA, ABS, 4),
        (REG, LDX, ABS, 4),
        (ILL, LAX, ABS, 4),
        // 0xB0
        (REG, BCS, REL, 2),
        (REG, LDA, IZY, 5),
        (ILL, KIL, DIR, 0),
        (ILL, LAX, IZY, 5),
        (REG, LDY, ZPX, 4),
        (REG, LDA, ZPX, 4),
        (REG, LDX, ZPY, 4),
        (ILL, LAX, ZPY, 4),
        (REG, CLV, DIR, 2),
        (REG, LDA, ABY, 4),
        (REG, TSX, DIR, 2),
        (ILL, LAS, ABY, 4),
        (REG, LDY, ABX, 4),
        (REG, LDA, ABX, 4),
        (REG, LDX, ABY, 4),
        (ILL, LAX, ABY, 4),
        // 0xC0
        (REG, CPY, IMM, 2),
        (REG, CMP, IZX, 6),
        (ILL, NOP, IMM, 2),
        (ILL, DCP, IZX, 8),
        (REG, CPY, ZPD, 3),
        (REG, CMP, ZPD, 3),
        (REG, DEC, ZPD, 5),
        (ILL, DCP, ZPD, 5),
        (REG, INY, DIR, 2),
        (REG, CMP, IMM, 2),
        (REG, DEX, DIR, 2),
        (ILL, AXS, IMM, 2),
        (REG, CPY, ABS, 4),
        (REG, CMP, ABS, 4),
        (REG, DEC, ABS, 6),
        (ILL, DCP, ABS, 6),
        // 0xD0
        (REG, BNE, REL, 2),
        (REG, CMP, IZY, 5),
        (ILL, KIL, DIR, 0),
        (ILL, DCP, IZY, 8),
        (ILL, NOP, ZPX, 4),
        (REG, CMP, ZPX, 4),
        (REG, DEC, ZPX, 6),
        (ILL, DCP, ZPX, 6),
        (REG, CLD, DIR, 2),
        (REG, CMP, ABY, 4),
        (ILL, NOP, DIR, 2),
        (ILL, DCP, ABY, 7),
        (ILL, NOP, ABX, 4),
        (REG, CMP, ABX, 4),
        (REG, DEC, ABX, 7),
        (ILL, DCP, ABX, 7),
        // 0xE0
        (REG, CPX, IMM, 2),
        (REG, SBC, IZX, 6),
        (ILL, NOP, IMM, 2),
        (ILL, ISC, IZX, 8),
        (REG, CPX, ZPD, 3),
        (REG, SBC, ZPD, 3),
        (REG, INC, ZPD, 5),
        (ILL, ISC, ZPD, 5),
        (REG, INX, DIR, 2),
        (REG, SBC, IMM, 2),
        (REG, NOP, DIR, 2),
        (ILL, SBC, IMM, 2),
        (REG, CPX, ABS, 4),
        (REG, SBC, ABS, 4),
        (REG, INC, ABS, 6),
        (ILL, ISC, ABS, 6),
        // 0xF0
        (REG, BEQ, REL, 2),
        (REG, SBC, IZY, 5),
        (ILL, KIL, DIR, 0),
        (ILL, ISC, IZY, 8),
        (ILL, NOP, ZPX, 4),
        (REG, SBC, ZPX, 4),
        (REG, INC, ZPX, 6),
        (ILL, ISC, ZPX, 6),
        (REG, SED, DIR, 2),
        (REG, SBC, ABY, 4),
        (ILL, NOP, DIR, 2),
        (ILL, ISC, ABY, 7),
        (ILL, NOP, ABX, 4),
        (REG, SBC, ABX, 4),
        (REG, INC, ABX, 7),
        (ILL, ISC, ABX, 7),
    ];

    std::array::from_fn(|i| {
        let (legal, ty, mode, cycles) = specs[i];
        Opcode {
            code: i as u8,
            legal,
            ty,
            mode,
            cycles,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_total() {
        for code in 0..=255u8 {
            let op = opcode(code);
            assert_eq!(op.code, code);
            assert!(op.size() >= 1 && op.size() <= 3);
        }
        assert_eq!(opcode(0x00).cycles, 7); // BRK
        assert_eq!(opcode(0xEA).cycles, 2); // NOP
    }

    #[test]
    fn test_flow_semantics() {
        assert!(opcode(0x60).ty.is_end()); // RTS
        assert!(opcode(0x00).ty.is_end()); // BRK
        assert!(opcode(0x4C).ty.is_end()); // JMP abs
        assert!(!opcode(0x20).ty.is_end()); // JSR falls through on return
        assert!(opcode(0x20).ty.is_jump()); // JSR targets code
        assert!(opcode(0xD0).ty.is_jump()); // BNE targets code
        assert!(!opcode(0x8D).ty.is_jump()); // STA targets data
    }

    #[test]
    fn test_relative_address() {
        // BNE at $1000 with argument $FE branches onto itself
        assert_eq!(OpcodeMode::REL.address(0x1000, 0xFE), 0x1000);
        // forward branch
        assert_eq!(OpcodeMode::REL.address(0x1000, 0x10), 0x1012);
        // wraps around the address space
        assert_eq!(OpcodeMode::REL.address(0xFFFE, 0x10), 0x0010);
    }

    #[test]
    fn test_rendering() {
        assert_eq!(opcode(0xA9).render_raw(0x1000, 0x42), "LDA #$42");
        assert_eq!(opcode(0x8D).render_raw(0x1000, 0xD020), "STA $D020");
        assert_eq!(opcode(0xB1).render_raw(0x1000, 0xFB), "LDA ($FB),Y");
        assert_eq!(opcode(0x6C).render_raw(0x1000, 0x0302), "JMP ($0302)");
        assert_eq!(opcode(0xEA).render_raw(0x1000, 0), "NOP");
        assert_eq!(opcode(0xD0).render_raw(0x1000, 0xFE), "BNE $1000");
    }
}

//! Opcode and operand-format tables.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A 5-bit TRC3 opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    Hlt = 1,
    Add = 2,
    Adi = 3,
    Sub = 4,
    Xor = 5,
    Xno = 6,
    Ior = 7,
    Nor = 8,
    And = 9,
    Nan = 10,
    Rsh = 11,
    Ldi = 12,
    Jmp = 13,
    Beq = 14,
    Bne = 15,
    Bgt = 16,
    Blt = 17,
    Cal = 18,
    Ret = 19,
    Rea = 20,
    Sto = 21,
    Gpi = 22,
    Gpo = 23,
    Bel = 24,
    Pas = 25,
    Pag = 26,
}

impl Opcode {
    /// Every opcode, indexed by its numeric value.
    pub const ALL: [Opcode; 27] = [
        Opcode::Nop, Opcode::Hlt, Opcode::Add, Opcode::Adi,
        Opcode::Sub, Opcode::Xor, Opcode::Xno, Opcode::Ior,
        Opcode::Nor, Opcode::And, Opcode::Nan, Opcode::Rsh,
        Opcode::Ldi, Opcode::Jmp, Opcode::Beq, Opcode::Bne,
        Opcode::Bgt, Opcode::Blt, Opcode::Cal, Opcode::Ret,
        Opcode::Rea, Opcode::Sto, Opcode::Gpi, Opcode::Gpo,
        Opcode::Bel, Opcode::Pas, Opcode::Pag,
    ];

    const MNEMONICS: [&'static str; 27] = [
        "NOP", "HLT", "ADD", "ADI",
        "SUB", "XOR", "XNO", "IOR",
        "NOR", "AND", "NAN", "RSH",
        "LDI", "JMP", "BEQ", "BNE",
        "BGT", "BLT", "CAL", "RET",
        "REA", "STO", "GPI", "GPO",
        "BEL", "PAS", "PAG",
    ];

    /// Look up an opcode by its numeric value (0-26).
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Look up an opcode by mnemonic, ignoring case.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::MNEMONICS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(mnemonic))
            .map(|i| Self::ALL[i])
    }

    /// The numeric opcode.
    #[inline]
    pub fn value(self) -> u8 {
        self as u8
    }

    /// The upper-case assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        Self::MNEMONICS[self as usize]
    }

    /// The operand-format tag this opcode is encoded with.
    pub fn format(self) -> OperandFormat {
        use Opcode::*;
        match self {
            Nop | Hlt | Ret | Bel => OperandFormat::None,
            Add | Sub | Xor | Xno | Ior | Nor | And | Nan | Rsh | Rea | Sto => OperandFormat::Alu,
            Adi | Ldi => OperandFormat::Imm8ToReg,
            Jmp | Beq | Bne | Bgt | Blt | Cal => OperandFormat::Imm10,
            Gpi => OperandFormat::Imm3ToReg,
            Gpo => OperandFormat::RegToImm3,
            Pas => OperandFormat::Imm3OrReg,
            Pag => OperandFormat::RegOnly,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Shape of the 11-bit operand field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandFormat {
    /// `00000000000`
    None,
    /// `00` a(3) b(3) c(3)
    Alu,
    /// imm(8) reg(3)
    Imm8ToReg,
    /// imm(10) `0`
    Imm10,
    /// `00000` imm(3) reg(3)
    Imm3ToReg,
    /// `00` reg(3) imm(3) `000`
    RegToImm3,
    /// imm(3) `00` reg(3) `000`
    Imm3OrReg,
    /// `00000000` reg(3)
    RegOnly,
}

/// One operand slot of a format: where it sits in the word and how wide it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub shift: u32,
    pub width: u32,
}

impl Field {
    const fn reg(shift: u32) -> Self {
        Self { shift, width: 3 }
    }

    const fn imm(shift: u32, width: u32) -> Self {
        Self { shift, width }
    }

    /// Largest value this field can hold.
    #[inline]
    pub fn max(&self) -> u16 {
        ((1u32 << self.width) - 1) as u16
    }
}

impl OperandFormat {
    /// Operand fields in assembly source order.
    ///
    /// IMM8_TO_REG is written destination-first (`LDI r1 5`) even though the
    /// register sits in the low bits.
    pub fn fields(self) -> &'static [Field] {
        static ALU: [Field; 3] = [Field::reg(6), Field::reg(3), Field::reg(0)];
        static IMM8_TO_REG: [Field; 2] = [Field::reg(0), Field::imm(3, 8)];
        static IMM10: [Field; 1] = [Field::imm(1, 10)];
        static IMM3_TO_REG: [Field; 2] = [Field::imm(3, 3), Field::reg(0)];
        static REG_TO_IMM3: [Field; 2] = [Field::reg(6), Field::imm(3, 3)];
        static IMM3_OR_REG: [Field; 2] = [Field::imm(8, 3), Field::reg(3)];
        static REG_ONLY: [Field; 1] = [Field::reg(0)];

        match self {
            OperandFormat::None => &[],
            OperandFormat::Alu => &ALU,
            OperandFormat::Imm8ToReg => &IMM8_TO_REG,
            OperandFormat::Imm10 => &IMM10,
            OperandFormat::Imm3ToReg => &IMM3_TO_REG,
            OperandFormat::RegToImm3 => &REG_TO_IMM3,
            OperandFormat::Imm3OrReg => &IMM3_OR_REG,
            OperandFormat::RegOnly => &REG_ONLY,
        }
    }

    /// Number of operands written in source for this format.
    #[inline]
    pub fn operand_count(self) -> usize {
        self.fields().len()
    }
}

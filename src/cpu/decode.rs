//! Instruction decoder for the TRC3.
//!
//! Turns a 16-bit word into a typed [`Instruction`] using the shared operand
//! layouts in [`crate::isa`], and back again.

use crate::cpu::alu::AluOp;
use crate::isa::{self, Opcode};
use serde::{Serialize, Deserialize};

pub use crate::isa::DecodeError;

/// Branch condition for the conditional jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// BEQ: Zero flag set
    Zero,
    /// BNE: Zero flag clear
    NotZero,
    /// BGT: Carry flag set
    Carry,
    /// BLT: Carry flag clear
    NotCarry,
}

/// Decoded TRC3 instruction.
///
/// Register operands are indices 0-7; `target` is an instruction index 0-1023.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// No operation
    Nop,

    /// Halt execution
    Hlt,

    // ==================== ALU ====================

    /// r[c] := alu(op, r[a], r[b])
    Alu { op: AluOp, a: u8, b: u8, c: u8 },

    /// r[c] := r[c] + imm
    Adi { c: u8, imm: u8 },

    /// r[c] := imm
    Ldi { c: u8, imm: u8 },

    // ==================== Control Flow ====================

    /// Unconditional jump
    Jmp { target: u16 },

    /// Conditional jump on a flag
    Branch { cond: Condition, target: u16 },

    /// Push the return slot and jump
    Cal { target: u16 },

    /// Pop a return slot and jump there
    Ret,

    // ==================== Memory ====================

    /// r[c] := mem[page, r[a] + imm]
    Rea { a: u8, imm: u8, c: u8 },

    /// mem[page, r[a] + imm] := r[c]
    Sto { a: u8, imm: u8, c: u8 },

    // ==================== I/O ====================

    /// r[c] := input(port)
    Gpi { port: u8, c: u8 },

    /// output(port, r[c])
    Gpo { c: u8, port: u8 },

    /// Ring the bell
    Bel,

    // ==================== Paging ====================

    /// page := imm | r[b]
    Pas { imm: u8, b: u8 },

    /// r[c] := page
    Pag { c: u8 },
}

impl Instruction {
    /// The opcode this instruction encodes to.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Nop => Opcode::Nop,
            Instruction::Hlt => Opcode::Hlt,
            Instruction::Alu { op, .. } => op.opcode(),
            Instruction::Adi { .. } => Opcode::Adi,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Branch { cond, .. } => match cond {
                Condition::Zero => Opcode::Beq,
                Condition::NotZero => Opcode::Bne,
                Condition::Carry => Opcode::Bgt,
                Condition::NotCarry => Opcode::Blt,
            },
            Instruction::Cal { .. } => Opcode::Cal,
            Instruction::Ret => Opcode::Ret,
            Instruction::Rea { .. } => Opcode::Rea,
            Instruction::Sto { .. } => Opcode::Sto,
            Instruction::Gpi { .. } => Opcode::Gpi,
            Instruction::Gpo { .. } => Opcode::Gpo,
            Instruction::Bel => Opcode::Bel,
            Instruction::Pas { .. } => Opcode::Pas,
            Instruction::Pag { .. } => Opcode::Pag,
        }
    }

    /// Operands in assembly source order.
    pub fn operands(&self) -> Vec<u16> {
        match *self {
            Instruction::Nop | Instruction::Hlt | Instruction::Ret | Instruction::Bel => vec![],
            Instruction::Alu { a, b, c, .. } => vec![a as u16, b as u16, c as u16],
            Instruction::Adi { c, imm } | Instruction::Ldi { c, imm } => vec![c as u16, imm as u16],
            Instruction::Jmp { target }
            | Instruction::Branch { target, .. }
            | Instruction::Cal { target } => vec![target],
            Instruction::Rea { a, imm, c } | Instruction::Sto { a, imm, c } => {
                vec![a as u16, imm as u16, c as u16]
            }
            Instruction::Gpi { port, c } => vec![port as u16, c as u16],
            Instruction::Gpo { c, port } => vec![c as u16, port as u16],
            Instruction::Pas { imm, b } => vec![imm as u16, b as u16],
            Instruction::Pag { c } => vec![c as u16],
        }
    }
}

/// Decode a 16-bit instruction word.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let (opcode, ops) = isa::decode_word(word)?;
    // Field widths guarantee every register/imm3 operand fits in a u8
    let r = |i: usize| ops[i] as u8;

    let instruction = match opcode {
        Opcode::Nop => Instruction::Nop,
        Opcode::Hlt => Instruction::Hlt,
        Opcode::Add | Opcode::Sub | Opcode::Xor | Opcode::Xno | Opcode::Ior
        | Opcode::Nor | Opcode::And | Opcode::Nan | Opcode::Rsh => {
            let op = AluOp::from_opcode(opcode).ok_or(DecodeError::InvalidOpcode(opcode.value()))?;
            Instruction::Alu { op, a: r(0), b: r(1), c: r(2) }
        }
        Opcode::Adi => Instruction::Adi { c: r(0), imm: r(1) },
        Opcode::Ldi => Instruction::Ldi { c: r(0), imm: r(1) },
        Opcode::Jmp => Instruction::Jmp { target: ops[0] },
        Opcode::Beq => Instruction::Branch { cond: Condition::Zero, target: ops[0] },
        Opcode::Bne => Instruction::Branch { cond: Condition::NotZero, target: ops[0] },
        Opcode::Bgt => Instruction::Branch { cond: Condition::Carry, target: ops[0] },
        Opcode::Blt => Instruction::Branch { cond: Condition::NotCarry, target: ops[0] },
        Opcode::Cal => Instruction::Cal { target: ops[0] },
        Opcode::Ret => Instruction::Ret,
        Opcode::Rea => Instruction::Rea { a: r(0), imm: r(1), c: r(2) },
        Opcode::Sto => Instruction::Sto { a: r(0), imm: r(1), c: r(2) },
        Opcode::Gpi => Instruction::Gpi { port: r(0), c: r(1) },
        Opcode::Gpo => Instruction::Gpo { c: r(0), port: r(1) },
        Opcode::Bel => Instruction::Bel,
        Opcode::Pas => Instruction::Pas { imm: r(0), b: r(1) },
        Opcode::Pag => Instruction::Pag { c: r(0) },
    };

    Ok(instruction)
}

/// Encode an instruction back to a 16-bit word.
///
/// Out-of-range fields are masked to their width.
pub fn encode(instr: &Instruction) -> u16 {
    let opcode = instr.opcode();
    let mut word = (opcode.value() as u16) << 11;
    for (field, value) in opcode.format().fields().iter().zip(instr.operands()) {
        word |= (value & field.max()) << field.shift;
    }
    word
}

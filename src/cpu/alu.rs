//! The TRC3 arithmetic/logic unit.
//!
//! A pure function of two 8-bit operands. Carry generation follows the
//! redstone adder the machine is built around rather than textbook overflow:
//! XOR and XNOR report carries from the shared flood-carry line, RSH takes its
//! carry from the pre-shift sum, and NAND never carries.

use crate::isa::Opcode;
use serde::{Serialize, Deserialize};

/// Operations the ALU can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Sub,
    Xor,
    Xno,
    Ior,
    Nor,
    And,
    Nan,
    Rsh,
}

impl AluOp {
    /// The ALU operation selected by an opcode, if it is an ALU opcode.
    pub fn from_opcode(opcode: Opcode) -> Option<Self> {
        match opcode {
            Opcode::Add => Some(AluOp::Add),
            Opcode::Sub => Some(AluOp::Sub),
            Opcode::Xor => Some(AluOp::Xor),
            Opcode::Xno => Some(AluOp::Xno),
            Opcode::Ior => Some(AluOp::Ior),
            Opcode::Nor => Some(AluOp::Nor),
            Opcode::And => Some(AluOp::And),
            Opcode::Nan => Some(AluOp::Nan),
            Opcode::Rsh => Some(AluOp::Rsh),
            _ => None,
        }
    }

    /// The opcode that selects this operation.
    pub fn opcode(self) -> Opcode {
        match self {
            AluOp::Add => Opcode::Add,
            AluOp::Sub => Opcode::Sub,
            AluOp::Xor => Opcode::Xor,
            AluOp::Xno => Opcode::Xno,
            AluOp::Ior => Opcode::Ior,
            AluOp::Nor => Opcode::Nor,
            AluOp::And => Opcode::And,
            AluOp::Nan => Opcode::Nan,
            AluOp::Rsh => Opcode::Rsh,
        }
    }
}

/// Result byte and flags produced by one ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOutput {
    pub result: u8,
    pub carry: bool,
    pub zero: bool,
}

impl AluOutput {
    /// Flags derived from a 9-bit adder output: bit 8 is the carry.
    fn from_adder(output: u32) -> Self {
        Self {
            result: (output & 0xFF) as u8,
            carry: output > 0xFF,
            zero: output & 0xFF == 0,
        }
    }
}

/// Run one ALU operation on two register values.
pub fn alu(op: AluOp, a: u8, b: u8) -> AluOutput {
    let (a, b) = (a as u32, b as u32);

    let output = match op {
        AluOp::Add => a + b,
        AluOp::Sub => a + (!b & 0xFF) + 1,
        AluOp::Xor => {
            let mut out = a ^ b;
            // Flood-carry: the carry line follows magnitude, not overflow
            if a > b {
                out += 0x100;
            }
            out
        }
        AluOp::Xno => {
            let mut out = !(a ^ b) & 0xFF;
            if a + b > 0xFF {
                out += 0x100;
            }
            out
        }
        AluOp::Ior => a | b,
        AluOp::Nor => !(a | b) & 0xFF,
        AluOp::And => a & b,
        // Each input is inverted to 8 bits before the AND
        AluOp::Nan => (!a & 0xFF) & (!b & 0xFF),
        AluOp::Rsh => {
            let sum = a + b;
            let shifted = (sum & 0xFF) >> 1;
            return AluOutput {
                result: shifted as u8,
                carry: sum > 0xFF,
                zero: shifted == 0,
            };
        }
    };

    AluOutput::from_adder(output)
}

//! Instruction records to bytes.
//!
//! Each instruction becomes one 16-bit word stored low byte first. The data
//! segment follows as one byte per variable.

use crate::isa::{encode_word, word_to_bytes, EncodeError, Opcode};

/// A fully resolved instruction, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledInstruction {
    pub opcode: Opcode,
    /// Operand values in source order.
    pub operands: Vec<u16>,
    /// Instruction index (byte address is twice this).
    pub index: u16,
    /// 1-based source line.
    pub line: usize,
}

impl AssembledInstruction {
    pub fn encode(&self) -> Result<u16, EncodeError> {
        encode_word(self.opcode, &self.operands)
    }
}

/// Encode the program segment followed by the data segment.
pub fn encode_program(
    instructions: &[AssembledInstruction],
    data: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::with_capacity(instructions.len() * 2 + data.len());
    for instr in instructions {
        bytes.extend_from_slice(&word_to_bytes(instr.encode()?));
    }
    bytes.extend_from_slice(data);
    Ok(bytes)
}

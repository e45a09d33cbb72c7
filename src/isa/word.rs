//! Packing and unpacking of 16-bit instruction words.
//!
//! Word layout, MSB first: `[15:11]` opcode, `[10:0]` operand field shaped by
//! the opcode's [`OperandFormat`](super::OperandFormat). In memory a word is
//! stored little-endian: low byte at the even address, high byte after it.

use super::Opcode;
use thiserror::Error;

const OPCODE_SHIFT: u32 = 11;
const OPERAND_MASK: u16 = 0x7FF;

/// Pack an opcode and its operands (in source order) into a word.
///
/// Operand count and widths are contract checks: the assembler validates both
/// before calling this, so a failure here means the two disagree.
pub fn encode_word(opcode: Opcode, operands: &[u16]) -> Result<u16, EncodeError> {
    let fields = opcode.format().fields();
    if operands.len() != fields.len() {
        return Err(EncodeError::OperandCount {
            opcode,
            expected: fields.len(),
            found: operands.len(),
        });
    }

    let mut word: u32 = (opcode.value() as u32) << OPCODE_SHIFT;
    for (index, (field, &value)) in fields.iter().zip(operands).enumerate() {
        if value > field.max() {
            return Err(EncodeError::FieldOverflow {
                opcode,
                index,
                value,
                width: field.width,
            });
        }
        word |= (value as u32) << field.shift;
    }

    if word > u16::MAX as u32 {
        return Err(EncodeError::WordLength(word));
    }
    Ok(word as u16)
}

/// Split a word into its opcode and operands (in source order).
///
/// Padding bits of the operand field are ignored, as the hardware does.
pub fn decode_word(word: u16) -> Result<(Opcode, Vec<u16>), DecodeError> {
    let raw = (word >> OPCODE_SHIFT) as u8;
    let opcode = Opcode::from_u8(raw).ok_or(DecodeError::InvalidOpcode(raw))?;
    let operand_field = word & OPERAND_MASK;

    let operands = opcode
        .format()
        .fields()
        .iter()
        .map(|f| (operand_field >> f.shift) & f.max())
        .collect();

    Ok((opcode, operands))
}

/// Little-endian byte pair `[lo, hi]` of a word.
#[inline]
pub fn word_to_bytes(word: u16) -> [u8; 2] {
    word.to_le_bytes()
}

/// Reassemble a word from its low and high bytes.
#[inline]
pub fn word_from_bytes(lo: u8, hi: u8) -> u16 {
    ((hi as u16) << 8) | lo as u16
}

/// The assembler handed the encoder something the format cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{opcode} takes {expected} operand(s), encoder was given {found}")]
    OperandCount { opcode: Opcode, expected: usize, found: usize },

    #[error("{opcode} operand {index} = {value} does not fit in {width} bits")]
    FieldOverflow { opcode: Opcode, index: usize, value: u16, width: u32 },

    #[error("packed instruction word {0:#x} is not 16 bits")]
    WordLength(u32),
}

/// A word that does not correspond to any implemented instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unimplemented opcode {0}")]
    InvalidOpcode(u8),
}

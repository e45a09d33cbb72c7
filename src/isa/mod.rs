//! The TRC3 instruction set contract.
//!
//! Both halves of the toolchain depend on this module and nothing else for the
//! bit layout of an instruction:
//! - [`Opcode`] - the 27 opcodes and their mnemonics
//! - [`OperandFormat`] - the eight shapes of the 11-bit operand field
//! - [`encode_word`] / [`decode_word`] - packing operands into a 16-bit word

mod opcode;
mod word;

pub use opcode::{Opcode, OperandFormat, Field};
pub use word::{encode_word, decode_word, word_to_bytes, word_from_bytes, EncodeError, DecodeError};

/// Number of bytes in the machine's address space.
pub const MEMORY_BYTES: usize = 2048;

/// Number of instruction slots in the address space (one per 2 bytes).
pub const MAX_INSTRUCTIONS: usize = MEMORY_BYTES / 2;

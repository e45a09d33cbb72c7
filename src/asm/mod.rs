//! Assembler and disassembler for TRC3 programs.
//!
//! This module provides:
//! - A two-pass assembler (source text → binary image)
//! - Binary image load/save in raw and textual `bits` form
//! - A disassembler (binary image → readable text)

pub mod token;
pub mod resolver;
pub mod assembler;
pub mod encoder;
pub mod image;
pub mod disasm;

pub use assembler::{assemble, assemble_with_logger, AssemblerError, AssemblerSession, Diagnostic};
pub use disasm::disassemble;
pub use image::{Image, ImageError, ImageFormat, load_image, save_image};

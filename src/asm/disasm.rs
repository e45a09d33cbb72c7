//! Disassembler for TRC3 programs.
//!
//! Converts instruction words back to assembly text that the assembler
//! accepts.

use crate::cpu::decode::{decode, Instruction};
use crate::isa::word_from_bytes;

/// Disassemble a single instruction word to text.
pub fn disassemble_word(word: u16) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!("??? ; {:#06x}", word),
    }
}

/// Disassemble an image into a listing.
///
/// `instruction_count` limits how many words are treated as code; the rest is
/// listed as data bytes. Pass `None` to treat every whole word as code.
pub fn disassemble(image: &[u8], instruction_count: Option<usize>) -> String {
    let words = instruction_count.unwrap_or(image.len() / 2).min(image.len() / 2);

    let mut output = String::new();
    output.push_str("; TRC3 Disassembly\n");
    output.push_str("; ----------------\n\n");

    for index in 0..words {
        let addr = index << 1;
        let word = word_from_bytes(image[addr], image[addr + 1]);
        output.push_str(&format!(
            "{:04}: {:<16} ; {:#05x}  {:08b} {:08b}\n",
            index,
            disassemble_word(word),
            addr,
            word >> 8,
            word & 0xFF
        ));
    }

    for (addr, byte) in image.iter().enumerate().skip(words << 1) {
        output.push_str(&format!("      {:<16} ; {:#05x}  {:08b}\n", byte, addr, byte));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let mnemonic = instr.opcode().mnemonic();
    match *instr {
        Instruction::Nop | Instruction::Hlt | Instruction::Ret | Instruction::Bel => mnemonic.to_string(),
        Instruction::Alu { a, b, c, .. } => format!("{} r{} r{} r{}", mnemonic, a, b, c),
        Instruction::Adi { c, imm } | Instruction::Ldi { c, imm } => format!("{} r{} {}", mnemonic, c, imm),
        Instruction::Jmp { target }
        | Instruction::Branch { target, .. }
        | Instruction::Cal { target } => format!("{} {}", mnemonic, target),
        Instruction::Rea { a, imm, c } | Instruction::Sto { a, imm, c } => {
            format!("{} r{} {} r{}", mnemonic, a, imm, c)
        }
        Instruction::Gpi { port, c } => format!("{} p{} r{}", mnemonic, port, c),
        Instruction::Gpo { c, port } => format!("{} r{} p{}", mnemonic, c, port),
        Instruction::Pas { imm, b } => format!("{} {} r{}", mnemonic, imm, b),
        Instruction::Pag { c } => format!("{} r{}", mnemonic, c),
    }
}

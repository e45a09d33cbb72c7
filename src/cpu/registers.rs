//! TRC3 CPU registers.
//!
//! The TRC3 has:
//! - r0: hard-wired zero register (writes are discarded)
//! - r1-r7: 8-bit general purpose registers
//! - PC: 10-bit program counter, counting instructions rather than bytes
//! - C/Z: carry and zero flags, set by the ALU
//! - Page: 3-bit register selecting the 256-byte window used by REA/STO

use serde::{Serialize, Deserialize};
use std::fmt;

/// Number of addressable registers, including r0.
pub const REGISTER_COUNT: usize = 8;

/// Number of pages in the data view of memory.
pub const PAGE_COUNT: u8 = 8;

/// The TRC3 register file.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// r0-r7. Slot 0 is never written.
    gpr: [u8; REGISTER_COUNT],

    /// Program counter, in instructions.
    pub pc: u16,

    /// Carry flag, set by the ALU.
    pub carry: bool,

    /// Zero flag, set by the ALU.
    pub zero: bool,

    /// Page register for data access.
    page: u8,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers and flags to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Read a register (0-7). r0 always reads 0.
    #[inline]
    pub fn read(&self, index: u8) -> u8 {
        self.gpr[(index & 0x7) as usize]
    }

    /// Write a register (0-7), masking the value to 8 bits.
    /// Writes to r0 are discarded.
    #[inline]
    pub fn write(&mut self, index: u8, value: u32) {
        let index = (index & 0x7) as usize;
        if index == 0 {
            return;
        }
        self.gpr[index] = (value & 0xFF) as u8;
    }

    /// The current page (0-7).
    #[inline]
    pub fn page(&self) -> u8 {
        self.page
    }

    /// Select a page. Only the low 3 bits are kept.
    #[inline]
    pub fn set_page(&mut self, page: u8) {
        self.page = page & 0x7;
    }

    /// Set both flags at once.
    #[inline]
    pub fn set_flags(&mut self, carry: bool, zero: bool) {
        self.carry = carry;
        self.zero = zero;
    }

    /// Increment the program counter by one instruction.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Point the program counter one slot before `target`.
    ///
    /// The execute loop advances the PC after every instruction, so this lands
    /// on `target` once that increment happens.
    pub fn jump(&mut self, target: u16) {
        self.pc = (target & 0x3FF).wrapping_sub(1);
    }

    /// Register values r1-r7, for traces.
    pub fn general(&self) -> &[u8] {
        &self.gpr[1..]
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 1..REGISTER_COUNT {
            if i > 1 {
                write!(f, ", ")?;
            }
            write!(f, "r{}={}", i, self.gpr[i])?;
        }
        write!(
            f,
            "] pc={} C={} Z={} page={}",
            self.pc, self.carry as u8, self.zero as u8, self.page
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r0_is_hardwired_zero() {
        let mut regs = Registers::new();
        regs.write(0, 42);
        assert_eq!(regs.read(0), 0);
    }

    #[test]
    fn test_write_masks_to_eight_bits() {
        let mut regs = Registers::new();
        regs.write(3, 0x1FF);
        assert_eq!(regs.read(3), 0xFF);
        regs.write(7, 256);
        assert_eq!(regs.read(7), 0);
    }

    #[test]
    fn test_page_keeps_three_bits() {
        let mut regs = Registers::new();
        regs.set_page(0b1101);
        assert_eq!(regs.page(), 0b101);
    }

    #[test]
    fn test_jump_prebias() {
        let mut regs = Registers::new();
        regs.pc = 12;

        regs.jump(5);
        regs.advance_pc();
        assert_eq!(regs.pc, 5);

        regs.jump(0);
        regs.advance_pc();
        assert_eq!(regs.pc, 0);
    }

    #[test]
    fn test_debug_lists_registers() {
        let mut regs = Registers::new();
        regs.write(1, 5);
        regs.carry = true;
        let text = format!("{:?}", regs);
        assert!(text.starts_with("[r1=5, r2=0"));
        assert!(text.contains("C=1 Z=0"));
    }
}

//! CPU emulation for the TRC3.
//!
//! This module implements the TRC3 datapath:
//! - 2048 bytes of memory, fetched linearly and accessed for data in 8 pages
//! - r0 (hard-wired zero) and 7 general-purpose 8-bit registers
//! - carry/zero flags, a 3-bit page register and a 16-slot call stack
//! - 27 instructions, one 16-bit word each

pub mod alu;
pub mod memory;
pub mod registers;
pub mod stack;
pub mod decode;
pub mod execute;

pub use alu::{alu, AluOp, AluOutput};
pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use stack::{CallStack, StackEvent};
pub use decode::{Instruction, Condition, DecodeError};
pub use execute::{Cpu, CpuError, CpuState, RunConfig, StopReason};

//! # TRC3 Toolchain
//!
//! An assembler and emulator for the TRC3, a 16-bit, 8-register redstone
//! microcomputer with a 2 KiB address space, a 16-slot call stack and
//! eight GPIO ports.
//!
//! - [`asm`] turns assembly source into a binary image and back
//! - [`cpu`] executes images
//! - [`io`] connects GPI/GPO to a console, a script or the terminal mode

pub mod isa;
pub mod cpu;
pub mod asm;
pub mod io;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use isa::{Opcode, MEMORY_BYTES};
pub use cpu::{Cpu, CpuError, CpuState, Instruction, Memory, Registers, RunConfig, StopReason};
pub use asm::{assemble, disassemble, AssemblerError, Image, ImageFormat, load_image, save_image};
pub use io::{ConsolePorts, Ports, ScriptedPorts};

#[cfg(feature = "tui")]
pub use tui::run_terminal;

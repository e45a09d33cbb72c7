//! CPU execution engine for the TRC3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::alu::alu;
use crate::cpu::decode::{self, Condition, Instruction, DecodeError};
use crate::cpu::memory::MemoryError;
use crate::asm::disasm::format_instruction;
use crate::cpu::stack::{CallStack, StackEvent};
use crate::cpu::{Memory, Registers};
use crate::io::Ports;
use crate::isa::MAX_INSTRUCTIONS;
use serde::{Serialize, Deserialize};
use slog::{debug, info, o, trace, warn, Discard, Logger};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (HLT, or the PC ran off the end of memory).
    Halted,
}

/// Limits for [`Cpu::run_with`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunConfig {
    /// Stop after this many instructions even if the program has not halted.
    pub max_cycles: Option<u64>,
    /// Sleep between cycles to approximate a clock rate. Purely cosmetic.
    pub clock_hz: Option<f64>,
}

impl RunConfig {
    fn cycle_delay(&self) -> Option<Duration> {
        match self.clock_hz {
            Some(hz) if hz > 0.0 => Duration::try_from_secs_f64(1.0 / hz).ok(),
            _ => None,
        }
    }
}

/// Why [`Cpu::run_with`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Executed HLT.
    Halted,
    /// PC reached the end of the address space.
    EndOfMemory,
    /// Hit `RunConfig::max_cycles`.
    CycleLimit,
    /// The stop flag was raised.
    Interrupted,
}

/// The TRC3 CPU.
#[derive(Clone, Serialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Call stack.
    pub stack: CallStack,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    #[serde(skip)]
    log: Logger,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    pub fn new() -> Self {
        Self::with_logger(None)
    }

    /// Create a CPU that reports its activity to `logger`.
    pub fn with_logger<L: Into<Option<Logger>>>(logger: L) -> Self {
        let log = logger
            .into()
            .unwrap_or_else(|| Logger::root(Discard, o!()))
            .new(o!("stage" => "execution"));

        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            stack: CallStack::new(),
            state: CpuState::Running,
            cycles: 0,
            log,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.stack.reset();
        self.state = CpuState::Running;
        self.cycles = 0;
    }

    /// Load a binary image into memory at address 0.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_image(image)?;
        debug!(self.log, "image loaded"; "bytes" => image.len());
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error.
    pub fn step(&mut self, io: &mut dyn Ports) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch
        let pc = self.regs.pc;
        let word = self.mem.fetch_word(pc)?;

        // Decode
        let instr = decode::decode(word)?;
        trace!(self.log, "fetch";
            "pc" => pc,
            "address" => format!("{:#06x}", (pc as usize) << 1),
            "word" => format!("{:08b} {:08b}", word >> 8, word & 0xFF),
            "instr" => format_instruction(&instr));

        // Execute
        self.execute(instr, io)?;
        trace!(self.log, "execute done"; "regs" => ?self.regs);

        self.cycles += 1;

        if instr == Instruction::Hlt {
            self.state = CpuState::Halted;
            info!(self.log, "halted"; "pc" => self.regs.pc, "cycles" => self.cycles);
        } else {
            self.regs.advance_pc();
            if self.reached_end() {
                self.state = CpuState::Halted;
                info!(self.log, "reached end of memory"; "cycles" => self.cycles);
            }
        }

        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self, io: &mut dyn Ports) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(io)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, io: &mut dyn Ports, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(io)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run under a [`RunConfig`], checking `stop` between cycles.
    pub fn run_with(
        &mut self,
        io: &mut dyn Ports,
        config: &RunConfig,
        stop: &AtomicBool,
    ) -> Result<StopReason, CpuError> {
        let start_cycles = self.cycles;
        let delay = config.cycle_delay();

        loop {
            if self.state == CpuState::Halted {
                return Ok(self.halt_reason());
            }
            if stop.load(Ordering::Relaxed) {
                info!(self.log, "interrupted"; "pc" => self.regs.pc);
                return Ok(StopReason::Interrupted);
            }
            if let Some(max) = config.max_cycles {
                if self.cycles - start_cycles >= max {
                    info!(self.log, "cycle limit reached"; "cycles" => max);
                    return Ok(StopReason::CycleLimit);
                }
            }

            self.step(io)?;

            if let Some(delay) = delay {
                thread::sleep(delay);
            }
        }
    }

    fn halt_reason(&self) -> StopReason {
        if self.reached_end() {
            StopReason::EndOfMemory
        } else {
            StopReason::Halted
        }
    }

    /// Execute a decoded instruction. The PC is advanced by the caller.
    fn execute(&mut self, instr: Instruction, io: &mut dyn Ports) -> Result<(), CpuError> {
        match instr {
            Instruction::Nop | Instruction::Hlt => {}

            // ==================== ALU ====================

            Instruction::Alu { op, a, b, c } => {
                let out = alu(op, self.regs.read(a), self.regs.read(b));
                self.regs.write(c, out.result as u32);
                self.regs.set_flags(out.carry, out.zero);
            }

            Instruction::Adi { c, imm } => {
                let sum = self.regs.read(c) as u32 + imm as u32;
                self.regs.write(c, sum);
            }

            Instruction::Ldi { c, imm } => {
                self.regs.write(c, imm as u32);
            }

            // ==================== Control Flow ====================

            Instruction::Jmp { target } => self.regs.jump(target),

            Instruction::Branch { cond, target } => {
                let taken = match cond {
                    Condition::Zero => self.regs.zero,
                    Condition::NotZero => !self.regs.zero,
                    Condition::Carry => self.regs.carry,
                    Condition::NotCarry => !self.regs.carry,
                };
                if taken {
                    self.regs.jump(target);
                }
            }

            Instruction::Cal { target } => {
                // From slot 1023 the return address wraps to 0, which the stack
                // cannot tell apart from empty; the matching RET is then a NOP.
                let ret = self.regs.pc.wrapping_add(1);
                if let StackEvent::Overflow { dropped } = self.stack.push(ret) {
                    warn!(self.log, "call stack overflow, oldest return address lost";
                        "dropped" => dropped);
                }
                debug!(self.log, "call"; "target" => target, "return" => ret);
                self.regs.jump(target);
            }

            Instruction::Ret => match self.stack.pop() {
                Some(ret) => {
                    debug!(self.log, "return"; "target" => ret);
                    self.regs.jump(ret);
                }
                None => warn!(self.log, "RET on an empty call stack"; "pc" => self.regs.pc),
            },

            // ==================== Memory ====================

            Instruction::Rea { a, imm, c } => {
                let offset = self.regs.read(a) as u16 + imm as u16;
                let value = self.mem.read_paged(self.regs.page(), offset);
                self.regs.write(c, value as u32);
            }

            Instruction::Sto { a, imm, c } => {
                let offset = self.regs.read(a) as u16 + imm as u16;
                let page = self.regs.page();
                let value = self.regs.read(c);
                trace!(self.log, "store";
                    "address" => Memory::paged_address(page, offset), "value" => value);
                self.mem.write_paged(page, offset, value);
            }

            // ==================== I/O ====================

            Instruction::Gpi { port, c } => {
                let value = io.input(port)?;
                debug!(self.log, "gpio input"; "port" => port, "value" => value);
                self.regs.write(c, value as u32);
            }

            Instruction::Gpo { c, port } => {
                let value = self.regs.read(c);
                debug!(self.log, "gpio output"; "port" => port, "value" => value);
                io.output(port, value)?;
            }

            Instruction::Bel => io.bell()?,

            // ==================== Paging ====================

            Instruction::Pas { imm, b } => {
                self.regs.set_page(imm | self.regs.read(b));
                debug!(self.log, "page select"; "page" => self.regs.page());
            }

            Instruction::Pag { c } => {
                self.regs.write(c, self.regs.page() as u32);
            }
        }

        Ok(())
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Whether the PC has run past the last instruction slot.
    pub fn reached_end(&self) -> bool {
        self.regs.pc as usize >= MAX_INSTRUCTIONS
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("stack", &self.stack.slots())
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("GPIO error: {0}")]
    Io(#[from] io::Error),
}

//! GPIO ports and the bell.
//!
//! The CPU talks to the outside world only through [`Ports`]. Three
//! implementations live here:
//! - [`ConsolePorts`] - prompts for decimal bytes on a line-based console
//! - [`ScriptedPorts`] - canned input and recorded output, for tests and batch runs
//! - the terminal mode in `tui`, built on [`Handoff`]

mod handoff;

pub use handoff::Handoff;

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Number of GPIO ports addressable by GPI/GPO.
pub const PORT_COUNT: usize = 8;

/// Interface to the GPIO ports and the bell.
pub trait Ports {
    /// Called when a GPI instruction executes. Blocks until a byte is available.
    ///
    /// # Parameters
    /// - `port`: the port number (0-7) from the instruction.
    fn input(&mut self, port: u8) -> io::Result<u8>;

    /// Called when a GPO instruction executes.
    ///
    /// # Parameters
    /// - `port`: the port number (0-7) from the instruction.
    /// - `value`: the value of the source register.
    fn output(&mut self, port: u8, value: u8) -> io::Result<()>;

    /// Called when a BEL instruction executes.
    fn bell(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Line-based console ports.
///
/// GPI prompts `Input for port N: ` and re-prompts until it reads a decimal
/// byte. GPO prints `Port N: value`.
pub struct ConsolePorts<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePorts<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the wrapped reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl ConsolePorts<io::StdinLock<'static>, io::Stdout> {
    /// Console ports on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Ports for ConsolePorts<R, W> {
    fn input(&mut self, port: u8) -> io::Result<u8> {
        let mut line = String::new();
        loop {
            write!(self.output, "Input for port {}: ", port)?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("input closed while port {} was waiting", port),
                ));
            }

            match line.trim().parse::<u8>() {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.output, "Invalid input! Enter a decimal byte (0-255).")?,
            }
        }
    }

    fn output(&mut self, port: u8, value: u8) -> io::Result<()> {
        writeln!(self.output, "Port {}: {}", port, value)
    }

    fn bell(&mut self) -> io::Result<()> {
        self.output.write_all(b"\x07")?;
        self.output.flush()
    }
}

/// Ports fed from a queue, recording everything written.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPorts {
    inputs: VecDeque<u8>,
    /// `(port, value)` pairs in the order GPO wrote them.
    pub outputs: Vec<(u8, u8)>,
    /// Number of times BEL rang.
    pub bells: usize,
}

impl ScriptedPorts {
    pub fn new<I: IntoIterator<Item = u8>>(inputs: I) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Values written to one port.
    pub fn port_output(&self, port: u8) -> Vec<u8> {
        self.outputs
            .iter()
            .filter(|(p, _)| *p == port)
            .map(|&(_, v)| v)
            .collect()
    }
}

impl Ports for ScriptedPorts {
    fn input(&mut self, port: u8) -> io::Result<u8> {
        self.inputs.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted input left for port {}", port),
            )
        })
    }

    fn output(&mut self, port: u8, value: u8) -> io::Result<()> {
        self.outputs.push((port, value));
        Ok(())
    }

    fn bell(&mut self) -> io::Result<()> {
        self.bells += 1;
        Ok(())
    }
}

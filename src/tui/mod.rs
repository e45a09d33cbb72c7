//! Terminal mode.
//!
//! Shows the eight GPIO ports as text terminals:
//! - GPO bytes are printed to the port's terminal
//! - GPI blocks until a key is typed into that terminal
//! - The CPU runs on its own thread; Esc stops it and quits

mod app;
mod ui;

pub use app::{run_terminal, CpuEvent, TerminalApp, TerminalPorts, TerminalScreen};

//! Terminal-mode application state and logic.

use crate::cpu::{Cpu, CpuError, RunConfig, StopReason};
use crate::io::{Handoff, Ports, PORT_COUNT};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Character shown for control codes that have no rendering.
const REPLACEMENT: char = '\u{FFFD}';

/// Lines kept per terminal.
const SCROLLBACK: usize = 500;

/// Messages from the CPU thread to the UI.
#[derive(Debug)]
pub enum CpuEvent {
    Output { port: u8, value: u8 },
    Bell,
    Finished(Result<StopReason, String>),
}

/// Ports backed by the terminal window.
///
/// GPI blocks on the port's handoff until the UI gives it a keystroke.
pub struct TerminalPorts {
    handoffs: Arc<Vec<Handoff>>,
    events: Sender<CpuEvent>,
}

impl Ports for TerminalPorts {
    fn input(&mut self, port: u8) -> io::Result<u8> {
        self.handoffs[port as usize % PORT_COUNT]
            .get()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Interrupted, "terminal closed"))
    }

    fn output(&mut self, port: u8, value: u8) -> io::Result<()> {
        self.events
            .send(CpuEvent::Output { port, value })
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
    }

    fn bell(&mut self) -> io::Result<()> {
        self.events
            .send(CpuEvent::Bell)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
    }
}

/// Scrollback of one terminal.
#[derive(Debug, Clone)]
pub struct TerminalScreen {
    pub lines: Vec<String>,
    /// Received output while not being viewed.
    pub unread: bool,
}

impl TerminalScreen {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            unread: false,
        }
    }

    /// Apply one output byte.
    pub fn put(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.lines.push(String::new());
                if self.lines.len() > SCROLLBACK {
                    self.lines.remove(0);
                }
            }
            0x08 | 0x7F => {
                if let Some(line) = self.lines.last_mut() {
                    line.pop();
                }
            }
            0x20..=0x7E => self.current_line().push(byte as char),
            0x00..=0x1F => self.current_line().push(REPLACEMENT),
            _ => {}
        }
    }

    fn current_line(&mut self) -> &mut String {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl Default for TerminalScreen {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal-mode application state.
pub struct TerminalApp {
    pub terminals: Vec<TerminalScreen>,
    /// Index of the terminal on screen.
    pub viewed: usize,
    pub handoffs: Arc<Vec<Handoff>>,
    /// The CPU thread has finished.
    pub halted: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    pub bells: usize,
}

impl TerminalApp {
    pub fn new(handoffs: Arc<Vec<Handoff>>) -> Self {
        Self {
            terminals: vec![TerminalScreen::new(); PORT_COUNT],
            viewed: 0,
            handoffs,
            halted: false,
            should_quit: false,
            status: "Running. Tab/F1-F8: switch terminal, Esc: quit.".into(),
            bells: 0,
        }
    }

    pub fn handle_event(&mut self, event: CpuEvent) {
        match event {
            CpuEvent::Output { port, value } => {
                let port = port as usize % PORT_COUNT;
                self.terminals[port].put(value);
                if port != self.viewed {
                    self.terminals[port].unread = true;
                }
            }
            CpuEvent::Bell => {
                self.bells += 1;
                self.status = format!("Bell ({})", self.bells);
            }
            CpuEvent::Finished(result) => {
                self.halted = true;
                self.status = match result {
                    Ok(StopReason::Halted) => "Halted. Esc: quit.".into(),
                    Ok(StopReason::EndOfMemory) => "Reached end of memory. Esc: quit.".into(),
                    Ok(reason) => format!("Stopped: {:?}. Esc: quit.", reason),
                    Err(e) => format!("Error: {}. Esc: quit.", e),
                };
            }
        }
    }

    /// Send a typed character to the viewed terminal's port.
    ///
    /// Returns whether a GPI was waiting for it.
    pub fn key_char(&mut self, c: char) -> bool {
        match u8::try_from(c) {
            Ok(byte @ 0x20..=0x7E) => self.handoffs[self.viewed].give(byte),
            _ => false,
        }
    }

    pub fn select(&mut self, index: usize) {
        if index < PORT_COUNT {
            self.viewed = index;
            self.terminals[index].unread = false;
        }
    }

    pub fn next_terminal(&mut self) {
        self.select((self.viewed + 1) % PORT_COUNT);
    }

    pub fn prev_terminal(&mut self) {
        self.select((self.viewed + PORT_COUNT - 1) % PORT_COUNT);
    }

    /// Whether a GPI is blocked on `port`.
    pub fn is_waiting(&self, port: usize) -> bool {
        self.handoffs[port].is_waiting()
    }

    fn close_ports(&self) {
        for handoff in self.handoffs.iter() {
            handoff.close();
        }
    }
}

fn spawn_cpu(
    mut cpu: Cpu,
    config: RunConfig,
    ports: TerminalPorts,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<(Cpu, Result<StopReason, CpuError>)> {
    thread::spawn(move || {
        let mut ports = ports;
        let mut result = cpu.run_with(&mut ports, &config, &stop);

        // A GPI released by Esc is a stop, not a failure
        if stop.load(Ordering::Relaxed) {
            if let Err(CpuError::Io(e)) = &result {
                if e.kind() == io::ErrorKind::Interrupted {
                    result = Ok(StopReason::Interrupted);
                }
            }
        }

        let summary = match &result {
            Ok(reason) => Ok(*reason),
            Err(e) => Err(e.to_string()),
        };
        let _ = ports.events.send(CpuEvent::Finished(summary));
        (cpu, result)
    })
}

/// Run a loaded CPU in terminal mode until the user quits.
///
/// Returns the CPU in its final state and how the run ended.
pub fn run_terminal(cpu: Cpu, config: RunConfig) -> io::Result<(Cpu, Result<StopReason, CpuError>)> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let handoffs: Arc<Vec<Handoff>> = Arc::new((0..PORT_COUNT).map(|_| Handoff::new()).collect());
    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx): (Sender<CpuEvent>, Receiver<CpuEvent>) = mpsc::channel();

    let ports = TerminalPorts {
        handoffs: Arc::clone(&handoffs),
        events: tx,
    };
    let worker = spawn_cpu(cpu, config, ports, Arc::clone(&stop));

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = TerminalApp::new(Arc::clone(&handoffs));

    // Main loop
    let outcome = (|| -> io::Result<()> {
        loop {
            while let Ok(event) = rx.try_recv() {
                app.handle_event(event);
            }

            terminal.draw(|frame| {
                super::ui::draw(frame, &app);
            })?;

            if event::poll(Duration::from_millis(30))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Esc => app.should_quit = true,
                            KeyCode::Tab => app.next_terminal(),
                            KeyCode::BackTab => app.prev_terminal(),
                            KeyCode::F(n @ 1..=8) => app.select(n as usize - 1),
                            KeyCode::Char(c) => {
                                app.key_char(c);
                            }
                            _ => {}
                        }
                    }
                }
            }

            if app.should_quit {
                return Ok(());
            }
        }
    })();

    // Stop the CPU between cycles and release a blocked GPI
    stop.store(true, Ordering::Relaxed);
    app.close_ports();

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    outcome?;

    worker
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "CPU thread panicked"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> TerminalApp {
        TerminalApp::new(Arc::new((0..PORT_COUNT).map(|_| Handoff::new()).collect()))
    }

    #[test]
    fn test_screen_control_codes() {
        let mut screen = TerminalScreen::new();
        for &b in b"abc\x08d\nxy\x7F\x01\xC3" {
            screen.put(b);
        }
        assert_eq!(screen.text(), "abd\nx\u{FFFD}");
    }

    #[test]
    fn test_backspace_on_empty_line() {
        let mut screen = TerminalScreen::new();
        screen.put(0x08);
        screen.put(b'a');
        assert_eq!(screen.text(), "a");
    }

    #[test]
    fn test_output_marks_unviewed_unread() {
        let mut app = app();
        app.handle_event(CpuEvent::Output { port: 0, value: b'x' });
        app.handle_event(CpuEvent::Output { port: 3, value: b'y' });
        assert!(!app.terminals[0].unread);
        assert!(app.terminals[3].unread);

        app.select(3);
        assert!(!app.terminals[3].unread);
        assert_eq!(app.terminals[3].text(), "y");
    }

    #[test]
    fn test_switching_wraps() {
        let mut app = app();
        app.prev_terminal();
        assert_eq!(app.viewed, 7);
        app.next_terminal();
        assert_eq!(app.viewed, 0);
        app.select(8);
        assert_eq!(app.viewed, 0);
    }

    #[test]
    fn test_keys_without_pending_gpi_are_dropped() {
        let mut app = app();
        assert!(!app.key_char('a'));
        assert!(!app.key_char('\u{e9}'));
    }

    #[test]
    fn test_finished_event() {
        let mut app = app();
        app.handle_event(CpuEvent::Finished(Ok(StopReason::Halted)));
        assert!(app.halted);
        assert!(app.status.starts_with("Halted"));
    }

    #[test]
    fn test_cpu_thread_reads_keys_and_writes_output() {
        use crate::asm::assemble;

        // Echo one character from port 2 back to port 2, then halt
        let image = assemble("GPI p2 r1\nGPO r1 p2\nHLT").unwrap();
        let mut cpu = Cpu::new();
        cpu.load_image(image.bytes()).unwrap();

        let handoffs: Arc<Vec<Handoff>> = Arc::new((0..PORT_COUNT).map(|_| Handoff::new()).collect());
        let (tx, rx) = mpsc::channel();
        let ports = TerminalPorts { handoffs: Arc::clone(&handoffs), events: tx };
        let worker = spawn_cpu(cpu, RunConfig::default(), ports, Arc::new(AtomicBool::new(false)));

        let mut app = TerminalApp::new(handoffs);
        app.select(2);
        while !app.is_waiting(2) {
            thread::yield_now();
        }
        assert!(app.key_char('Z'));

        let (cpu, result) = worker.join().unwrap();
        assert_eq!(result.unwrap(), StopReason::Halted);
        assert_eq!(cpu.regs.read(1), b'Z');

        for event in rx.try_iter() {
            app.handle_event(event);
        }
        assert_eq!(app.terminals[2].text(), "Z");
        assert!(app.halted);
    }

    #[test]
    fn test_stop_releases_blocked_gpi() {
        let mut cpu = Cpu::new();
        cpu.load_image(&crate::asm::assemble("GPI p0 r1").unwrap().into_bytes()).unwrap();

        let handoffs: Arc<Vec<Handoff>> = Arc::new((0..PORT_COUNT).map(|_| Handoff::new()).collect());
        let (tx, _rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let ports = TerminalPorts { handoffs: Arc::clone(&handoffs), events: tx };
        let worker = spawn_cpu(cpu, RunConfig::default(), ports, Arc::clone(&stop));

        while !handoffs[0].is_waiting() {
            thread::yield_now();
        }
        stop.store(true, Ordering::Relaxed);
        handoffs[0].close();

        let (_, result) = worker.join().unwrap();
        assert_eq!(result.unwrap(), StopReason::Interrupted);
    }
}

//! TRC3 toolchain - CLI Entry Point
//!
//! Commands:
//! - `trc3emu asm <source>` - Assemble to a binary image
//! - `trc3emu run <image>` - Run an image (or an `.asm` file)
//! - `trc3emu disasm <image>` - Disassemble an image

use clap::{Parser, Subcommand};
use colored::Colorize;
use slog::{o, Drain, Level, Logger};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use thiserror::Error;
use trc3::asm::{assemble_with_logger, disassemble, load_image, save_image, AssemblerError, Image, ImageError, ImageFormat};
use trc3::cpu::{Cpu, CpuError, RunConfig, StopReason};
use trc3::io::ConsolePorts;

#[derive(Parser)]
#[command(name = "trc3emu")]
#[command(version)]
#[command(about = "Assembler and emulator for the TRC3 redstone computer")]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble source to a binary image
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output image file (default: source with a .bin extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format: bin or bits
        #[arg(long, default_value = "bin")]
        format: ImageFormat,
    },
    /// Run a program until it halts
    Run {
        /// Image to execute; `.asm` files are assembled first
        image: PathBuf,
        /// Image format: auto, bin or bits
        #[arg(long, default_value = "auto")]
        format: ImageFormat,
        /// Approximate clock rate in Hz (default: as fast as possible)
        #[arg(long)]
        clock: Option<f64>,
        /// Stop after this many instructions
        #[arg(long)]
        max_cycles: Option<u64>,
        /// Interactive terminal mode with one terminal per GPIO port
        #[arg(short, long)]
        terminal: bool,
        /// Print the final CPU state as JSON
        #[arg(long)]
        dump_state: bool,
    },
    /// Disassemble an image to readable text
    Disasm {
        /// Path to the image
        image: PathBuf,
        /// Image format: auto, bin or bits
        #[arg(long, default_value = "auto")]
        format: ImageFormat,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("terminal error: {0}")]
    Terminal(io::Error),

    #[error("program is empty, no output will be written")]
    EmptyImage,

    #[cfg(not(feature = "tui"))]
    #[error("terminal mode is not available in this build")]
    NoTerminal,

    #[error("could not serialize CPU state: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Syntax errors exit with 1, everything else with 2.
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Assembler(e) if e.is_syntax() => 1,
            CliError::EmptyImage => 1,
            _ => 2,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let code = {
        let log = build_logger(cli.verbose);
        match dispatch(cli.command, &log) {
            Ok(()) => 0,
            Err(e) => {
                report(&e);
                e.exit_code()
            }
        }
        // Async drain flushes when `log` drops here
    };
    std::process::exit(code);
}

fn build_logger(verbose: u8) -> Logger {
    let level = match verbose {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    };

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    Logger::root(drain, o!())
}

fn dispatch(command: Commands, log: &Logger) -> Result<(), CliError> {
    match command {
        Commands::Asm { source, output, format } => assemble_file(&source, output, format, log),
        Commands::Run {
            image,
            format,
            clock,
            max_cycles,
            terminal,
            dump_state,
        } => {
            let config = RunConfig {
                max_cycles,
                clock_hz: clock,
            };
            run_program(&image, format, config, terminal, dump_state, log)
        }
        Commands::Disasm { image, format } => disassemble_file(&image, format),
    }
}

fn report(error: &CliError) {
    if let CliError::Assembler(e) = error {
        for diagnostic in e.diagnostics() {
            eprintln!("{:?}", miette::Report::new(diagnostic.clone()));
        }
    }
    eprintln!("{} {}", "error:".red().bold(), error);
}

fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("asm"))
        .unwrap_or(false)
}

fn assemble_file(source_path: &Path, output: Option<PathBuf>, format: ImageFormat, log: &Logger) -> Result<(), CliError> {
    let out_path = output.unwrap_or_else(|| source_path.with_extension("bin"));

    let source = read_source(source_path)?;
    let image = assemble_with_logger(&source, log.clone())?;

    if image.is_empty() {
        return Err(CliError::EmptyImage);
    }
    if out_path.exists() {
        eprintln!("{} overwriting {}", "warning:".yellow().bold(), out_path.display());
    }

    save_image(&out_path, &image, format)?;

    println!(
        "{} {} instruction(s), {} variable(s), {} bytes -> {}",
        "Assembled".green().bold(),
        image.instruction_count(),
        image.variable_count().unwrap_or(0),
        image.len(),
        out_path.display()
    );
    Ok(())
}

fn load_program(path: &Path, format: ImageFormat, log: &Logger) -> Result<Image, CliError> {
    if is_source(path) {
        let source = read_source(path)?;
        Ok(assemble_with_logger(&source, log.clone())?)
    } else {
        Ok(load_image(path, format)?)
    }
}

fn run_program(
    path: &Path,
    format: ImageFormat,
    config: RunConfig,
    terminal: bool,
    dump_state: bool,
    log: &Logger,
) -> Result<(), CliError> {
    let image = load_program(path, format, log)?;

    let cpu = if terminal {
        // Log lines would tear the alternate screen
        let mut cpu = Cpu::new();
        cpu.load_image(image.bytes()).map_err(CpuError::from)?;
        let (cpu, result) = run_in_terminal(cpu, config)?;
        summarize(&cpu, result?);
        cpu
    } else {
        let mut cpu = Cpu::with_logger(log.clone());
        cpu.load_image(image.bytes()).map_err(CpuError::from)?;
        let mut ports = ConsolePorts::stdio();
        let stop = AtomicBool::new(false);
        let reason = cpu.run_with(&mut ports, &config, &stop)?;
        summarize(&cpu, reason);
        cpu
    };

    if dump_state {
        println!("{}", serde_json::to_string_pretty(&cpu)?);
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_in_terminal(cpu: Cpu, config: RunConfig) -> Result<(Cpu, Result<StopReason, CpuError>), CliError> {
    trc3::tui::run_terminal(cpu, config).map_err(CliError::Terminal)
}

#[cfg(not(feature = "tui"))]
fn run_in_terminal(_cpu: Cpu, _config: RunConfig) -> Result<(Cpu, Result<StopReason, CpuError>), CliError> {
    Err(CliError::NoTerminal)
}

fn summarize(cpu: &Cpu, reason: StopReason) {
    let headline = match reason {
        StopReason::Halted => "Halted".green().bold(),
        StopReason::EndOfMemory => "Reached end of memory".green().bold(),
        StopReason::CycleLimit => "Cycle limit reached".yellow().bold(),
        StopReason::Interrupted => "Interrupted".yellow().bold(),
    };
    println!("{} after {} cycle(s)", headline, cpu.cycles);
    println!(
        "pc={} page={} zero={} carry={}",
        cpu.regs.pc,
        cpu.regs.page(),
        cpu.regs.zero as u8,
        cpu.regs.carry as u8
    );
    let registers: Vec<String> = cpu
        .regs
        .general()
        .iter()
        .enumerate()
        .map(|(i, v)| format!("r{}={}", i + 1, v))
        .collect();
    println!("{}", registers.join(" "));
}

fn disassemble_file(path: &Path, format: ImageFormat) -> Result<(), CliError> {
    let image = load_image(path, format)?;
    print!("{}", disassemble(image.bytes(), None));
    Ok(())
}

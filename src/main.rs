//! LS-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run an `.ls8` image or `.asm` source
//! - `ls8-emu debug <program>` - Interactive debugger
//! - `ls8-emu asm <source>` - Assemble to an `.ls8` image
//! - `ls8-emu disasm <program>` - Disassemble an image
//!
//! Program output goes to stdout; everything else goes to stderr.

use clap::{Parser, Subcommand};
use ls8::MachineConfig;
use std::process;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version)]
#[command(about = "An emulator of the LS-8 8-bit computer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .ls8 image or .asm source to execute
        program: String,
        /// JSON machine configuration file
        #[arg(short, long)]
        config: Option<String>,
        /// Maximum number of instructions to run (0 = unlimited)
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print PRN output as decimal lines instead of raw bytes
        #[arg(short, long)]
        decimal: bool,
        /// Pause between instructions, in microseconds
        #[arg(long)]
        interval_us: Option<u64>,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        dump_state: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the .ls8 image or .asm source to debug
        program: String,
        /// JSON machine configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Assemble source to an .ls8 image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an .ls8 image to readable text
    Disasm {
        /// Path to the image file
        program: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, config, max_cycles, decimal, interval_us, trace, dump_state }) => {
            let mut config = load_config(config.as_deref());
            if let Some(max_cycles) = max_cycles {
                config.max_cycles = max_cycles;
            }
            if decimal {
                config.output = ls8::OutputMode::Decimal;
            }
            if let Some(interval_us) = interval_us {
                config.step_interval_us = interval_us;
            }
            run_program(&program, &config, trace, dump_state);
        }
        Some(Commands::Debug { program, config }) => {
            let config = load_config(config.as_deref());
            debug_program(&program, config);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        None => {
            println!("LS-8 Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("An 8-bit stored-program computer emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    process::exit(1);
}

fn load_config(path: Option<&str>) -> MachineConfig {
    match path {
        Some(path) => MachineConfig::load(path)
            .unwrap_or_else(|e| fail(format!("Failed to load config: {}", e))),
        None => MachineConfig::default(),
    }
}

/// Load program bytes from an image, or assemble them from source.
fn load_program(path: &str) -> Vec<u8> {
    use ls8::{assemble, load_image};

    let program = if path.ends_with(".asm") {
        let source = std::fs::read_to_string(path)
            .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e)));
        let program = assemble(&source)
            .unwrap_or_else(|e| fail(format!("Assembly error: {}", e)));
        eprintln!("📝 Assembled {} bytes", program.len());
        program
    } else {
        let image = load_image(path)
            .unwrap_or_else(|e| fail(format!("Failed to load image: {}", e)));
        eprintln!("📂 Loaded {} bytes", image.len());
        image.bytes
    };

    if program.is_empty() {
        fail("No instructions to execute");
    }
    program
}

fn run_program(path: &str, config: &MachineConfig, trace: bool, dump_state: bool) {
    use ls8::asm::disasm::disassemble_instruction;
    use std::io::Write;
    use std::time::Duration;

    eprintln!("🔧 Running: {}", path);
    let program = load_program(path);

    let mut cpu = config.build_cpu()
        .unwrap_or_else(|e| fail(format!("Bad configuration: {}", e)));
    if let Err(e) = cpu.load_program(&program) {
        fail(format!("Failed to load program: {}", e));
    }

    let stdout = std::io::stdout();
    let mut out = ls8::output::sink(config.output, stdout.lock());
    let limit = config.cycle_limit();
    let interval = Duration::from_micros(config.step_interval_us);
    let mut fault = None;

    while cpu.is_running() && limit.map_or(true, |limit| cpu.cycles < limit) {
        let pc = cpu.regs.pc;

        match cpu.step(&mut *out) {
            Ok(instr) => {
                if trace {
                    eprintln!("{:02X}: {:<14} R={:02X?} FL={} SP={:02X}",
                        pc, disassemble_instruction(&instr),
                        cpu.regs.general, cpu.regs.flags_string(), cpu.regs.sp());
                }
            }
            Err(e) => {
                fault = Some((pc, e));
                break;
            }
        }

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    if let Err(e) = out.flush() {
        eprintln!("❌ Failed to flush output: {}", e);
    }
    drop(out);

    eprintln!();
    eprintln!("━━━ Result ━━━");
    eprintln!("Cycles: {}", cpu.cycles);
    eprintln!("State: {:?}", cpu.state);
    eprintln!("PC: {:#04x}  FL: {}  SP: {:#04x}", cpu.regs.pc, cpu.regs.flags_string(), cpu.regs.sp());

    if dump_state {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("❌ Failed to serialize state: {}", e),
        }
    }

    if let Some((pc, e)) = fault {
        fail(format!("CPU error at PC={:#04x}: {}", pc, e));
    }

    if cpu.is_running() {
        eprintln!();
        eprintln!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", config.max_cycles);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, config: MachineConfig) {
    eprintln!("🔍 Loading: {}", path);
    let program = load_program(path);

    eprintln!("🚀 Launching debugger...");
    if let Err(e) = ls8::run_debugger(program, config) {
        fail(format!("Debugger error: {}", e));
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _config: MachineConfig) {
    fail("Debugger not available: built without the `tui` feature");
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use ls8::{assemble, save_image, ProgramImage};

    let out_path = output.unwrap_or_else(|| {
        source_path.replace(".asm", ".ls8")
    });
    if out_path == source_path {
        fail("Output path would overwrite the source; pass --output");
    }

    eprintln!("📝 Assembling: {} → {}", source_path, out_path);

    let source = std::fs::read_to_string(source_path)
        .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e)));
    let program = assemble(&source)
        .unwrap_or_else(|e| fail(format!("Assembly error: {}", e)));

    eprintln!("✓ Assembled {} bytes", program.len());

    if let Err(e) = save_image(&out_path, &ProgramImage::from_bytes(&program)) {
        fail(format!("Failed to save image: {}", e));
    }

    eprintln!("✓ Saved to {}", out_path);
}

fn disassemble_file(path: &str) {
    use ls8::{disassemble, load_image};

    let image = load_image(path)
        .unwrap_or_else(|e| fail(format!("Failed to load image: {}", e)));

    println!("{}", disassemble(&image.bytes));
}

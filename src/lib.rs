//! # LS-8 Emulator
//!
//! An emulator of the LS-8, a minimal 8-bit stored-program computer.
//!
//! The machine has eight 8-bit registers, a flag register, a program
//! counter and 256 bytes of memory shared by code, data and a downward
//! growing stack. The CPU is stepped explicitly by the caller; it owns no
//! clock or thread of its own.
//!
//! ```
//! use ls8::{assemble, Cpu};
//!
//! let program = assemble("LDI R0, 5\nLDI R1, 10\nADD R0, R1\nPRN R0\nHLT").unwrap();
//! let mut cpu = Cpu::new();
//! cpu.load_program(&program).unwrap();
//!
//! let mut out = Vec::new();
//! cpu.run(&mut out).unwrap();
//! assert_eq!(out, vec![15]);
//! assert!(cpu.is_halted());
//! ```

pub mod cpu;
pub mod asm;
pub mod config;
pub mod output;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Instruction, Opcode};
pub use asm::{assemble, disassemble, AssemblerError, ProgramImage, load_image, save_image};
pub use config::MachineConfig;
pub use output::{OutputMode, DecimalSink};

#[cfg(feature = "tui")]
pub use tui::run_debugger;

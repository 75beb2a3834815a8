//! Assembler, disassembler and program image format for LS-8 programs.
//!
//! This module provides:
//! - A simple two-pass assembler (text → program bytes)
//! - A disassembler (program bytes → readable text)
//! - The `.ls8` binary-literal image format

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_instruction};
pub use image::{ProgramImage, ImageError, load_image, parse_image, save_image};

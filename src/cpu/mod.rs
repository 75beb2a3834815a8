//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 architecture:
//! - 256 bytes of flat memory shared by code, data and the stack
//! - 8 general-purpose registers (R7 is the stack pointer), PC, IR and FL
//! - 15-instruction set with operand counts encoded in the opcode

pub mod memory;
pub mod registers;
pub mod alu;
pub mod decode;
pub mod dispatch;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use alu::{AluOp, AluError};
pub use decode::{Instruction, Opcode, DecodeError};
pub use execute::{Cpu, CpuError, CpuState};

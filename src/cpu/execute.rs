//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle. The CPU owns no clock: a
//! driver calls [`Cpu::step`] in whatever cadence it likes and stops once
//! the CPU leaves [`CpuState::Running`].

use crate::cpu::alu::{self, AluError};
use crate::cpu::decode::{operand_count, Instruction};
use crate::cpu::dispatch::{DispatchTable, Exec, Flow};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::RegisterError;
use crate::cpu::{Memory, Registers};
use serde::{Serialize, Deserialize};
use std::io::Write;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
    /// CPU stopped on a fault.
    Error,
}

/// The LS-8 CPU together with its attached memory.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    /// Last successfully executed instruction (for debugging).
    last_instr: Option<Instruction>,
    #[serde(skip)]
    table: DispatchTable,
}

impl Cpu {
    /// Create a CPU with 256 bytes of zeroed memory.
    pub fn new() -> Self {
        Self::with_memory(Memory::new())
    }

    /// Create a CPU attached to the given memory.
    pub fn with_memory(mem: Memory) -> Self {
        Self {
            regs: Registers::for_memory(mem.len()),
            mem,
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
            table: DispatchTable::new(),
        }
    }

    /// Reset the CPU and clear memory.
    pub fn reset(&mut self) {
        self.regs = Registers::for_memory(self.mem.len());
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load a program into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)
    }

    /// Execute a single instruction, sending PRN output to `out`.
    ///
    /// Returns the instruction that was executed. Any error moves the CPU
    /// to [`CpuState::Error`] and leaves PC on the faulting instruction.
    pub fn step(&mut self, out: &mut dyn Write) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        match self.execute(out) {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                Ok(instr)
            }
            Err(e) => {
                self.state = CpuState::Error;
                Err(e)
            }
        }
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed. A program that never
    /// halts never returns; use [`Cpu::run_limited`] for untrusted code.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64, out: &mut dyn Write) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn execute(&mut self, out: &mut dyn Write) -> Result<Instruction, CpuError> {
        // Fetch
        let pc = self.regs.pc;
        self.regs.ir = self.mem.read(pc)?;

        // Decode
        let (opcode, handler) = self.table
            .lookup(self.regs.ir)
            .ok_or(CpuError::InvalidOpcode { opcode: self.regs.ir, pc })?;

        // Both operand bytes are always fetched
        let operand_a = self.mem.read(self.mem.wrap(pc as usize + 1))?;
        let operand_b = self.mem.read(self.mem.wrap(pc as usize + 2))?;

        // Execute
        let mut exec = Exec {
            regs: &mut self.regs,
            mem: &mut self.mem,
            out,
        };
        let flow = handler(&mut exec, operand_a, operand_b)?;

        match flow {
            Flow::Jump(target) => self.regs.pc = target,
            Flow::Next => self.advance_pc(),
            Flow::Halt => {
                self.advance_pc();
                self.state = CpuState::Halted;
            }
        }

        Ok(Instruction::new(opcode, operand_a, operand_b))
    }

    /// Move PC past the instruction in IR.
    fn advance_pc(&mut self) {
        let size = operand_count(self.regs.ir) + 1;
        let next = alu::add(self.regs.pc, size);
        self.regs.pc = self.mem.wrap(next as usize);
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU halted cleanly.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Check if the CPU stopped on a fault.
    pub fn is_faulted(&self) -> bool {
        self.state == CpuState::Error
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
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("invalid instruction {opcode:#010b} at PC={pc:#04x}")]
    InvalidOpcode { opcode: u8, pc: u8 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("output error: {0}")]
    Output(String),
}

impl From<AluError> for CpuError {
    fn from(e: AluError) -> Self {
        match e {
            AluError::DivisionByZero => CpuError::DivisionByZero,
            AluError::Register(r) => CpuError::Register(r),
        }
    }
}

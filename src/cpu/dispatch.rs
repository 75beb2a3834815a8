//! Opcode dispatch table and instruction handlers.
//!
//! Each opcode maps to a plain function taking the machine state and the
//! two operand bytes that followed it. Handlers report how control should
//! continue through [`Flow`].

use crate::cpu::alu::{self, AluOp, Operand};
use crate::cpu::decode::Opcode;
use crate::cpu::execute::CpuError;
use crate::cpu::registers::SP;
use crate::cpu::{Memory, Registers};
use std::io::Write;

/// Machine state a handler may touch.
pub struct Exec<'a> {
    pub regs: &'a mut Registers,
    pub mem: &'a mut Memory,
    /// Sink for PRN output.
    pub out: &'a mut dyn Write,
}

/// How execution continues after a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Advance PC past the instruction.
    Next,
    /// Set PC to the given address.
    Jump(u8),
    /// Advance PC, then stop the CPU.
    Halt,
}

/// An instruction handler.
pub type Handler = fn(&mut Exec<'_>, u8, u8) -> Result<Flow, CpuError>;

/// Exact-match mapping from opcode byte to handler, built once.
#[derive(Clone)]
pub struct DispatchTable {
    entries: [Option<(Opcode, Handler)>; 256],
}

impl DispatchTable {
    /// Build the table for the full instruction set.
    pub fn new() -> Self {
        let mut entries: [Option<(Opcode, Handler)>; 256] = [None; 256];
        for op in Opcode::ALL {
            entries[op.byte() as usize] = Some((op, handler_for(op)));
        }
        Self { entries }
    }

    /// Find the handler registered for `byte`.
    #[inline]
    pub fn lookup(&self, byte: u8) -> Option<(Opcode, Handler)> {
        self.entries[byte as usize]
    }

    /// Number of registered opcodes.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().flatten().map(|(op, _)| op))
            .finish()
    }
}

fn handler_for(op: Opcode) -> Handler {
    match op {
        Opcode::Hlt => hlt,
        Opcode::Prn => prn,
        Opcode::Pop => pop,
        Opcode::Push => push,
        Opcode::Jmp => jmp,
        Opcode::Jeq => jeq,
        Opcode::Jne => jne,
        Opcode::Inc => inc,
        Opcode::Dec => dec,
        Opcode::Ldi => ldi,
        Opcode::Cmp => cmp,
        Opcode::Add => add,
        Opcode::Sub => sub,
        Opcode::Mul => mul,
        Opcode::Div => div,
    }
}

// ==================== ALU ====================

fn binary(x: &mut Exec<'_>, op: AluOp, reg_a: u8, reg_b: u8) -> Result<Flow, CpuError> {
    alu::apply(x.regs, op, reg_a, Operand::Register(reg_b))?;
    Ok(Flow::Next)
}

fn unary(x: &mut Exec<'_>, op: AluOp, reg: u8) -> Result<Flow, CpuError> {
    alu::apply(x.regs, op, reg, Operand::None)?;
    Ok(Flow::Next)
}

fn add(x: &mut Exec<'_>, a: u8, b: u8) -> Result<Flow, CpuError> {
    binary(x, AluOp::Add, a, b)
}

fn sub(x: &mut Exec<'_>, a: u8, b: u8) -> Result<Flow, CpuError> {
    binary(x, AluOp::Sub, a, b)
}

fn mul(x: &mut Exec<'_>, a: u8, b: u8) -> Result<Flow, CpuError> {
    binary(x, AluOp::Mul, a, b)
}

fn div(x: &mut Exec<'_>, a: u8, b: u8) -> Result<Flow, CpuError> {
    binary(x, AluOp::Div, a, b)
}

fn cmp(x: &mut Exec<'_>, a: u8, b: u8) -> Result<Flow, CpuError> {
    binary(x, AluOp::Cmp, a, b)
}

fn inc(x: &mut Exec<'_>, a: u8, _: u8) -> Result<Flow, CpuError> {
    unary(x, AluOp::Inc, a)
}

fn dec(x: &mut Exec<'_>, a: u8, _: u8) -> Result<Flow, CpuError> {
    unary(x, AluOp::Dec, a)
}

// ==================== Transfer ====================

fn ldi(x: &mut Exec<'_>, reg: u8, value: u8) -> Result<Flow, CpuError> {
    x.regs.set(reg, value)?;
    Ok(Flow::Next)
}

fn push(x: &mut Exec<'_>, reg: u8, _: u8) -> Result<Flow, CpuError> {
    let value = x.regs.get(reg)?;

    // SP is only moved once the write has succeeded.
    let sp = x.mem.prev_addr(x.regs.sp());
    x.mem.write(sp, value)?;
    x.regs.set(SP, sp)?;

    Ok(Flow::Next)
}

fn pop(x: &mut Exec<'_>, reg: u8, _: u8) -> Result<Flow, CpuError> {
    x.regs.get(reg)?;
    let value = x.mem.read(x.regs.sp())?;
    let sp = x.mem.next_addr(x.regs.sp());
    x.regs.set(SP, sp)?;
    // Written after the increment, so `POP R7` leaves SP = popped value.
    x.regs.set(reg, value)?;

    Ok(Flow::Next)
}

fn prn(x: &mut Exec<'_>, reg: u8, _: u8) -> Result<Flow, CpuError> {
    let value = x.regs.get(reg)?;
    x.out
        .write_all(&[value])
        .map_err(|e| CpuError::Output(e.to_string()))?;
    Ok(Flow::Next)
}

// ==================== Control Flow ====================

fn jmp(x: &mut Exec<'_>, reg: u8, _: u8) -> Result<Flow, CpuError> {
    Ok(Flow::Jump(x.regs.get(reg)?))
}

fn jeq(x: &mut Exec<'_>, reg: u8, _: u8) -> Result<Flow, CpuError> {
    let target = x.regs.get(reg)?;
    Ok(if x.regs.equal() { Flow::Jump(target) } else { Flow::Next })
}

fn jne(x: &mut Exec<'_>, reg: u8, _: u8) -> Result<Flow, CpuError> {
    let target = x.regs.get(reg)?;
    Ok(if x.regs.equal() { Flow::Next } else { Flow::Jump(target) })
}

fn hlt(_: &mut Exec<'_>, _: u8, _: u8) -> Result<Flow, CpuError> {
    Ok(Flow::Halt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::registers::{FLAG_EQUAL, STACK_TOP};

    struct Fixture {
        regs: Registers,
        mem: Memory,
        out: Vec<u8>,
    }

    impl Fixture {
        fn new() -> Self {
            Self { regs: Registers::new(), mem: Memory::new(), out: Vec::new() }
        }

        fn run(&mut self, op: Opcode, a: u8, b: u8) -> Result<Flow, CpuError> {
            let (_, handler) = DispatchTable::new().lookup(op.byte()).unwrap();
            let mut exec = Exec { regs: &mut self.regs, mem: &mut self.mem, out: &mut self.out };
            handler(&mut exec, a, b)
        }
    }

    #[test]
    fn test_table_covers_instruction_set() {
        let table = DispatchTable::new();

        assert_eq!(table.len(), Opcode::ALL.len());
        for op in Opcode::ALL {
            assert_eq!(table.lookup(op.byte()).map(|(o, _)| o), Some(op));
        }
        assert!(table.lookup(0).is_none());
        assert!(table.lookup(0xFF).is_none());
    }

    #[test]
    fn test_ldi() {
        let mut fx = Fixture::new();

        assert_eq!(fx.run(Opcode::Ldi, 4, 200), Ok(Flow::Next));
        assert_eq!(fx.regs.general[4], 200);
    }

    #[test]
    fn test_push_pop() {
        let mut fx = Fixture::new();
        fx.regs.general[1] = 77;

        fx.run(Opcode::Push, 1, 0).unwrap();
        assert_eq!(fx.regs.sp(), STACK_TOP - 1);
        assert_eq!(fx.mem.read(STACK_TOP - 1), Ok(77));

        fx.run(Opcode::Pop, 5, 0).unwrap();
        assert_eq!(fx.regs.general[5], 77);
        assert_eq!(fx.regs.sp(), STACK_TOP);
    }

    #[test]
    fn test_push_fault_keeps_sp() {
        let mut fx = Fixture::new();
        fx.mem = Memory::with_size(128).unwrap();

        let err = fx.run(Opcode::Push, 0, 0).unwrap_err();
        assert!(matches!(err, CpuError::Memory(_)));
        assert_eq!(fx.regs.sp(), STACK_TOP);
    }

    #[test]
    fn test_stack_wraps_on_small_memory() {
        let mut fx = Fixture::new();
        fx.mem = Memory::with_size(64).unwrap();
        fx.regs = Registers::for_memory(64);
        fx.regs.general[2] = 9;

        fx.run(Opcode::Push, 2, 0).unwrap();
        assert_eq!(fx.regs.sp(), 63);
        assert_eq!(fx.mem.read(63), Ok(9));

        fx.run(Opcode::Pop, 3, 0).unwrap();
        assert_eq!(fx.regs.general[3], 9);
        assert_eq!(fx.regs.sp(), 0);
    }

    #[test]
    fn test_prn_output_failure() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut out = Closed;
        let (_, handler) = DispatchTable::new().lookup(Opcode::Prn.byte()).unwrap();
        let mut exec = Exec { regs: &mut regs, mem: &mut mem, out: &mut out };

        assert!(matches!(handler(&mut exec, 0, 0), Err(CpuError::Output(_))));
    }

    #[test]
    fn test_pop_into_sp() {
        let mut fx = Fixture::new();
        fx.mem.write(STACK_TOP, 0x40).unwrap();

        fx.run(Opcode::Pop, SP, 0).unwrap();
        assert_eq!(fx.regs.sp(), 0x40);
    }

    #[test]
    fn test_prn_writes_raw_byte() {
        let mut fx = Fixture::new();
        fx.regs.general[0] = 15;

        fx.run(Opcode::Prn, 0, 0).unwrap();
        assert_eq!(fx.out, vec![15]);
    }

    #[test]
    fn test_conditional_jumps() {
        let mut fx = Fixture::new();
        fx.regs.general[2] = 0x20;

        fx.regs.fl = FLAG_EQUAL;
        assert_eq!(fx.run(Opcode::Jeq, 2, 0), Ok(Flow::Jump(0x20)));
        assert_eq!(fx.run(Opcode::Jne, 2, 0), Ok(Flow::Next));

        fx.regs.fl = 0;
        assert_eq!(fx.run(Opcode::Jeq, 2, 0), Ok(Flow::Next));
        assert_eq!(fx.run(Opcode::Jne, 2, 0), Ok(Flow::Jump(0x20)));
        assert_eq!(fx.run(Opcode::Jmp, 2, 0), Ok(Flow::Jump(0x20)));
    }

    #[test]
    fn test_bad_register_operand() {
        let mut fx = Fixture::new();

        assert!(matches!(fx.run(Opcode::Prn, 8, 0), Err(CpuError::Register(_))));
        assert!(fx.out.is_empty());
    }

    #[test]
    fn test_hlt() {
        let mut fx = Fixture::new();
        assert_eq!(fx.run(Opcode::Hlt, 0, 0), Ok(Flow::Halt));
    }
}

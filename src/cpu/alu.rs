//! Arithmetic/logic unit.
//!
//! All arithmetic is performed on 8-bit values and wraps modulo 256.
//! [`compute`] is the pure value-level core; [`apply`] resolves register
//! operands and writes the result back into the register file.

use crate::cpu::registers::{RegisterError, Registers};
use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use thiserror::Error;

/// ALU operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Inc,
    Dec,
    Cmp,
}

/// Second ALU input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Value of another general-purpose register.
    Register(u8),
    /// A literal value.
    Immediate(u8),
    /// Unary operation, no second input.
    None,
}

/// What an ALU operation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOutput {
    /// A new value for the destination register.
    Value(u8),
    /// A comparison result destined for FL.
    Compare(Ordering),
}

/// Wrapping 8-bit addition.
///
/// Also used by the CPU to advance the program counter.
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a.wrapping_add(b)
}

/// Compute `op` on two 8-bit values.
///
/// Unary operations ignore `b`.
pub fn compute(op: AluOp, a: u8, b: u8) -> Result<AluOutput, AluError> {
    let value = match op {
        AluOp::Add => add(a, b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Mul => a.wrapping_mul(b),
        AluOp::Div => a.checked_div(b).ok_or(AluError::DivisionByZero)?,
        AluOp::Inc => add(a, 1),
        AluOp::Dec => a.wrapping_sub(1),
        AluOp::Cmp => return Ok(AluOutput::Compare(a.cmp(&b))),
    };

    Ok(AluOutput::Value(value))
}

/// Run `op` with register `reg_a` as destination and first input.
///
/// On error nothing is written.
pub fn apply(regs: &mut Registers, op: AluOp, reg_a: u8, operand: Operand) -> Result<(), AluError> {
    let val_a = regs.get(reg_a)?;
    let val_b = match operand {
        Operand::Register(reg_b) => regs.get(reg_b)?,
        Operand::Immediate(value) => value,
        Operand::None => 0,
    };

    match compute(op, val_a, val_b)? {
        AluOutput::Value(value) => regs.set(reg_a, value)?,
        AluOutput::Compare(ordering) => regs.set_compare(ordering),
    }

    Ok(())
}

/// Errors raised by the ALU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AluError {
    #[error("division by zero")]
    DivisionByZero,

    #[error(transparent)]
    Register(#[from] RegisterError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(op: AluOp, a: u8, b: u8) -> u8 {
        match compute(op, a, b).unwrap() {
            AluOutput::Value(v) => v,
            AluOutput::Compare(_) => panic!("expected a value"),
        }
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(value(AluOp::Add, 200, 100), 44);
        assert_eq!(value(AluOp::Sub, 3, 5), 254);
        assert_eq!(value(AluOp::Mul, 16, 17), 16);
        assert_eq!(value(AluOp::Div, 200, 7), 28);
        assert_eq!(value(AluOp::Inc, 255, 0), 0);
        assert_eq!(value(AluOp::Dec, 0, 0), 255);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(compute(AluOp::Div, 10, 0), Err(AluError::DivisionByZero));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compute(AluOp::Cmp, 5, 5), Ok(AluOutput::Compare(Ordering::Equal)));
        assert_eq!(compute(AluOp::Cmp, 9, 5), Ok(AluOutput::Compare(Ordering::Greater)));
        assert_eq!(compute(AluOp::Cmp, 0, 5), Ok(AluOutput::Compare(Ordering::Less)));
    }

    #[test]
    fn test_apply_registers() {
        let mut regs = Registers::new();
        regs.set(0, 5).unwrap();
        regs.set(1, 10).unwrap();

        apply(&mut regs, AluOp::Add, 0, Operand::Register(1)).unwrap();
        assert_eq!(regs.get(0), Ok(15));
        assert_eq!(regs.get(1), Ok(10));

        apply(&mut regs, AluOp::Add, 0, Operand::Immediate(3)).unwrap();
        assert_eq!(regs.get(0), Ok(18));

        apply(&mut regs, AluOp::Cmp, 0, Operand::Register(1)).unwrap();
        assert!(regs.greater());
        assert_eq!(regs.get(0), Ok(18));
    }

    #[test]
    fn test_apply_failure_leaves_registers() {
        let mut regs = Registers::new();
        regs.set(2, 40).unwrap();
        let before = regs.clone();

        assert_eq!(
            apply(&mut regs, AluOp::Div, 2, Operand::Register(3)),
            Err(AluError::DivisionByZero)
        );
        assert_eq!(
            apply(&mut regs, AluOp::Add, 2, Operand::Register(9)),
            Err(AluError::Register(RegisterError(9)))
        );
        assert_eq!(regs, before);
    }
}

//! LS-8 CPU registers.
//!
//! The LS-8 has:
//! - R0-R7: eight 8-bit general-purpose registers (R7 is the stack pointer
//!   by convention)
//! - PC: 8-bit program counter
//! - IR: instruction register (the most recently fetched opcode)
//! - FL: 8-bit flag register, only the low three bits are defined

use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Register conventionally used as the stack pointer.
pub const SP: u8 = 7;

/// Initial stack pointer value (stack is empty).
pub const STACK_TOP: u8 = 0xF3;

/// FL bit 0: last comparison found A == B.
pub const FLAG_EQUAL: u8 = 0b001;
/// FL bit 1: last comparison found A > B.
pub const FLAG_GREATER: u8 = 0b010;
/// FL bit 2: last comparison found A < B.
pub const FLAG_LESS: u8 = 0b100;

const FLAG_MASK: u8 = FLAG_EQUAL | FLAG_GREATER | FLAG_LESS;

/// The LS-8 register file.
///
/// Control registers are kept in separate fields so that a register
/// operand from an instruction can only ever reach R0-R7.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7 general-purpose registers.
    pub general: [u8; REGISTER_COUNT],

    /// PC: address of the next instruction byte to fetch.
    pub pc: u8,

    /// IR: most recently fetched opcode.
    pub ir: u8,

    /// FL: comparison flags (bit 0 E, bit 1 G, bit 2 L).
    pub fl: u8,
}

impl Registers {
    /// Create a register file in its power-on state.
    pub fn new() -> Self {
        let mut general = [0; REGISTER_COUNT];
        general[SP as usize] = STACK_TOP;

        Self {
            general,
            pc: 0,
            ir: 0,
            fl: 0,
        }
    }

    /// Power-on state for a memory of `memory_size` cells.
    ///
    /// Memories too small to reach [`STACK_TOP`] start with SP at 0, so the
    /// first PUSH wraps onto the last cell.
    pub fn for_memory(memory_size: usize) -> Self {
        let mut regs = Self::new();
        if memory_size <= STACK_TOP as usize {
            regs.general[SP as usize] = 0;
        }
        regs
    }

    /// Read a general-purpose register.
    #[inline]
    pub fn get(&self, index: u8) -> Result<u8, RegisterError> {
        self.general
            .get(index as usize)
            .copied()
            .ok_or(RegisterError(index))
    }

    /// Write a general-purpose register.
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let slot = self.general
            .get_mut(index as usize)
            .ok_or(RegisterError(index))?;
        *slot = value;
        Ok(())
    }

    /// Current stack pointer.
    #[inline]
    pub fn sp(&self) -> u8 {
        self.general[SP as usize]
    }

    /// Record a comparison result in FL.
    ///
    /// Each of E/G/L is explicitly set or cleared; undefined bits are left alone.
    pub fn set_compare(&mut self, ordering: Ordering) {
        let bits = match ordering {
            Ordering::Equal => FLAG_EQUAL,
            Ordering::Greater => FLAG_GREATER,
            Ordering::Less => FLAG_LESS,
        };
        self.fl = (self.fl & !FLAG_MASK) | bits;
    }

    /// True if the E flag is set.
    #[inline]
    pub fn equal(&self) -> bool {
        self.fl & FLAG_EQUAL != 0
    }

    /// True if the G flag is set.
    #[inline]
    pub fn greater(&self) -> bool {
        self.fl & FLAG_GREATER != 0
    }

    /// True if the L flag is set.
    #[inline]
    pub fn less(&self) -> bool {
        self.fl & FLAG_LESS != 0
    }

    /// Render FL's defined bits as `LGE` letters, `-` for clear bits.
    pub fn flags_string(&self) -> String {
        [(self.less(), 'L'), (self.greater(), 'G'), (self.equal(), 'E')]
            .iter()
            .map(|&(set, c)| if set { c } else { '-' })
            .collect()
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// A register operand outside R0-R7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid register index {0} (expected 0-7)")]
pub struct RegisterError(pub u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_state() {
        let regs = Registers::new();

        assert_eq!(regs.general, [0, 0, 0, 0, 0, 0, 0, 0xF3]);
        assert_eq!(regs.sp(), STACK_TOP);
        assert_eq!((regs.pc, regs.ir, regs.fl), (0, 0, 0));
    }

    #[test]
    fn test_power_on_stack_for_memory_size() {
        assert_eq!(Registers::for_memory(256), Registers::new());
        assert_eq!(Registers::for_memory(64).sp(), 0);
        assert_eq!(Registers::for_memory(1).sp(), 0);
    }

    #[test]
    fn test_register_access() {
        let mut regs = Registers::new();

        regs.set(3, 99).unwrap();
        assert_eq!(regs.get(3), Ok(99));
        assert_eq!(regs.get(8), Err(RegisterError(8)));
        assert_eq!(regs.set(200, 1), Err(RegisterError(200)));
    }

    #[test]
    fn test_compare_flags() {
        let mut regs = Registers::new();

        regs.set_compare(Ordering::Equal);
        assert!(regs.equal() && !regs.greater() && !regs.less());

        regs.set_compare(Ordering::Greater);
        assert!(!regs.equal() && regs.greater() && !regs.less());

        regs.set_compare(Ordering::Less);
        assert!(!regs.equal() && !regs.greater() && regs.less());
        assert_eq!(regs.flags_string(), "L--");
    }

    #[test]
    fn test_compare_preserves_undefined_bits() {
        let mut regs = Registers::new();
        regs.fl = 0b1010_0000;

        regs.set_compare(Ordering::Equal);
        assert_eq!(regs.fl, 0b1010_0001);
    }
}

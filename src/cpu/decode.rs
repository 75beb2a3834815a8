//! Instruction decoder for the LS-8.
//!
//! Every instruction starts with a one-byte opcode. Bits 7-6 of the opcode
//! hold the number of operand bytes that follow it (0, 1 or 2).

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The LS-8 instruction set.
///
/// Discriminants are the opcode bytes as they appear in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Control ====================

    /// Halt the CPU.
    Hlt = 0b0000_0001,

    /// Print the numeric value of a register.
    Prn = 0b0100_0011,

    /// Pop the top of stack into a register.
    Pop = 0b0100_1100,

    /// Push a register onto the stack.
    Push = 0b0100_1101,

    /// Jump to the address held in a register.
    Jmp = 0b0101_0000,

    /// Jump if the E flag is set.
    Jeq = 0b0101_0001,

    /// Jump if the E flag is clear.
    Jne = 0b0101_0010,

    // ==================== ALU ====================

    Inc = 0b0111_1000,
    Dec = 0b0111_1001,
    Cmp = 0b1010_0000,
    Add = 0b1010_1000,
    Sub = 0b1010_1001,
    Mul = 0b1010_1010,
    Div = 0b1010_1011,

    // ==================== Transfer ====================

    /// Load an immediate into a register.
    Ldi = 0b1001_1001,
}

impl Opcode {
    /// Every opcode, in encoding order.
    pub const ALL: [Opcode; 15] = [
        Opcode::Hlt,
        Opcode::Prn,
        Opcode::Pop,
        Opcode::Push,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
        Opcode::Inc,
        Opcode::Dec,
        Opcode::Ldi,
        Opcode::Cmp,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
    ];

    /// Look up the opcode for an instruction byte.
    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.byte() == byte)
            .ok_or(DecodeError::InvalidOpcode(byte))
    }

    /// Look up an opcode by its assembly mnemonic (case-insensitive).
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }

    /// The opcode byte.
    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Operand bytes following this opcode.
    #[inline]
    pub fn operand_count(self) -> u8 {
        operand_count(self.byte())
    }

    /// Total instruction length in bytes.
    #[inline]
    pub fn size(self) -> u8 {
        self.operand_count() + 1
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Prn => "PRN",
            Opcode::Pop => "POP",
            Opcode::Push => "PUSH",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Ldi => "LDI",
            Opcode::Cmp => "CMP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
        }
    }

    /// True for instructions that may overwrite PC.
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Jeq | Opcode::Jne)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Operand count encoded in bits 7-6 of any instruction byte.
#[inline]
pub fn operand_count(byte: u8) -> u8 {
    (byte >> 6) & 0b11
}

/// A fetched instruction: the opcode plus the two bytes after it.
///
/// Both operand bytes are always fetched; instructions with fewer
/// operands ignore the extras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand_a: u8,
    pub operand_b: u8,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand_a: u8, operand_b: u8) -> Self {
        Self { opcode, operand_a, operand_b }
    }

    /// Decode the instruction starting at `bytes[0]`.
    ///
    /// Missing operand bytes read as zero.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let first = *bytes.first().ok_or(DecodeError::Truncated)?;
        let opcode = Opcode::from_byte(first)?;
        let operand_a = bytes.get(1).copied().unwrap_or(0);
        let operand_b = bytes.get(2).copied().unwrap_or(0);
        Ok(Self { opcode, operand_a, operand_b })
    }

    /// Encode to the bytes the instruction occupies in memory.
    pub fn encode(&self) -> Vec<u8> {
        [self.opcode.byte(), self.operand_a, self.operand_b][..self.opcode.size() as usize].to_vec()
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode {0:#010b}")]
    InvalidOpcode(u8),

    #[error("no instruction bytes to decode")]
    Truncated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_bytes() {
        assert_eq!(Opcode::Ldi.byte(), 0b1001_1001);
        assert_eq!(Opcode::Hlt.byte(), 0b0000_0001);
        assert_eq!(Opcode::from_byte(0b0100_0011), Ok(Opcode::Prn));
        assert_eq!(Opcode::from_byte(0xFF), Err(DecodeError::InvalidOpcode(0xFF)));
    }

    #[test]
    fn test_operand_counts() {
        assert_eq!(Opcode::Hlt.operand_count(), 0);
        for op in [Opcode::Prn, Opcode::Push, Opcode::Pop, Opcode::Jmp, Opcode::Inc, Opcode::Dec] {
            assert_eq!(op.operand_count(), 1, "{op}");
        }
        for op in [Opcode::Ldi, Opcode::Add, Opcode::Sub, Opcode::Mul, Opcode::Div, Opcode::Cmp] {
            assert_eq!(op.operand_count(), 2, "{op}");
        }
    }

    #[test]
    fn test_opcodes_unique() {
        for (i, a) in Opcode::ALL.iter().enumerate() {
            for b in &Opcode::ALL[i + 1..] {
                assert_ne!(a.byte(), b.byte());
            }
        }
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(Opcode::from_mnemonic("push"), Some(Opcode::Push));
        assert_eq!(Opcode::from_mnemonic("LDI"), Some(Opcode::Ldi));
        assert_eq!(Opcode::from_mnemonic("CALL"), None);
    }

    #[test]
    fn test_decode_encode() {
        let instr = Instruction::decode(&[0b1001_1001, 2, 42, 7]).unwrap();
        assert_eq!(instr, Instruction::new(Opcode::Ldi, 2, 42));
        assert_eq!(instr.encode(), vec![0b1001_1001, 2, 42]);

        let prn = Instruction::decode(&[0b0100_0011, 0]).unwrap();
        assert_eq!(prn.encode(), vec![0b0100_0011, 0]);

        assert_eq!(Instruction::decode(&[]), Err(DecodeError::Truncated));
    }
}

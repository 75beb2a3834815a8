//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (`#` works too)
//! LOOP:               ; Define a label
//!     LDI R0, 10      ; Load immediate (decimal, 0x.., 0b.. or a label)
//!     ADD R0, R1      ; Register operands are R0-R7
//!     LDI R2, LOOP
//!     JNE R2          ; Jump to the address held in R2
//!     HLT             ; Halt
//!
//!     DB 42           ; Define a data byte
//! ```

use crate::cpu::decode::Opcode;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to program bytes.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> address).
    symbols: HashMap<String, usize>,
    /// Pending references: (output_index, label, source_line).
    pending: Vec<(usize, String, usize)>,
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve forward references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find([';', '#']) {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("bad label `{}`", &line[..colon_idx]),
                });
            }
            if self.symbols.insert(label.clone(), self.output.len()).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, rest)) => (m.to_uppercase(), rest.trim()),
            None => (line.to_uppercase(), ""),
        };

        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };

        // Directives
        if mnemonic == "DB" || mnemonic == "DATA" {
            if operands.is_empty() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "DB requires at least one value".into(),
                });
            }
            for operand in operands {
                self.emit_value(operand, line_num)?;
            }
            return Ok(());
        }

        let opcode = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| {
            AssemblerError::UnknownMnemonic { line: line_num, mnemonic: mnemonic.clone() }
        })?;

        let expected = opcode.operand_count() as usize;
        if operands.len() != expected {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!(
                    "{} takes {} operand(s), found {}",
                    opcode, expected, operands.len()
                ),
            });
        }

        self.output.push(opcode.byte());

        match (opcode, operands.as_slice()) {
            (Opcode::Ldi, [reg, value]) => {
                let reg = parse_register(reg, line_num)?;
                self.output.push(reg);
                self.emit_value(value, line_num)?;
            }
            (_, regs) => {
                for reg in regs {
                    let reg = parse_register(reg, line_num)?;
                    self.output.push(reg);
                }
            }
        }

        Ok(())
    }

    /// Emit a literal byte, or a placeholder for a label reference.
    fn emit_value(&mut self, operand: &str, line_num: usize) -> Result<(), AssemblerError> {
        let value = match parse_number(operand) {
            Some(Ok(value)) => value,
            Some(Err(_)) => {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid number `{}`", operand),
                });
            }
            None => {
                // Must be a label reference - resolved in pass 2
                self.pending.push((self.output.len(), operand.to_uppercase(), line_num));
                0
            }
        };

        let byte = u8::try_from(value)
            .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })?;
        self.output.push(byte);
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, line_num) in &self.pending {
            let addr = *self.symbols.get(label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: *line_num,
                label: label.clone(),
            })?;

            self.output[*out_idx] = u8::try_from(addr).map_err(|_| AssemblerError::ValueOutOfRange {
                line: *line_num,
                value: addr as i64,
            })?;
        }
        Ok(())
    }
}

/// Parse `R0`..`R7`.
fn parse_register(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let bad = || AssemblerError::BadRegister { line: line_num, operand: operand.to_string() };

    let digits = operand
        .strip_prefix('R')
        .or_else(|| operand.strip_prefix('r'))
        .ok_or_else(bad)?;
    match digits.parse::<u8>() {
        Ok(reg) if reg < 8 => Ok(reg),
        _ => Err(bad()),
    }
}

/// Parse a numeric literal. `None` means the operand is not a number at all.
fn parse_number(operand: &str) -> Option<Result<i64, std::num::ParseIntError>> {
    let lower = operand.to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix("0x") {
        return Some(i64::from_str_radix(hex, 16));
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return Some(i64::from_str_radix(bin, 2));
    }
    if lower.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return Some(lower.parse::<i64>());
    }
    None
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("bad register on line {line}: {operand} (expected R0-R7)")]
    BadRegister { line: usize, operand: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Add two numbers and print the result
            LDI R0, 5
            LDI R1, 10
            ADD R0, R1
            PRN R0
            HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![
            0b1001_1001, 0, 5,
            0b1001_1001, 1, 10,
            0b1010_1000, 0, 1,
            0b0100_0011, 0,
            0b0000_0001,
        ]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
            LDI R2, END     # forward reference
        LOOP: INC R0
            JMP R2
        END:
            HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result[2], 7);
        assert_eq!(result[7], Opcode::Hlt.byte());
    }

    #[test]
    fn test_assemble_data() {
        let result = assemble("DB 42, 0x10, 0b101\nDB 255").unwrap();
        assert_eq!(result, vec![42, 16, 5, 255]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            assemble("FOO R0"),
            Err(AssemblerError::UnknownMnemonic { line: 1, .. })
        ));
        assert!(matches!(
            assemble("NOP:\nLDI R8, 1"),
            Err(AssemblerError::BadRegister { line: 2, .. })
        ));
        assert!(matches!(
            assemble("LDI R0, 256"),
            Err(AssemblerError::ValueOutOfRange { value: 256, .. })
        ));
        assert!(matches!(
            assemble("JMP R0, R1"),
            Err(AssemblerError::SyntaxError { .. })
        ));
        assert!(matches!(
            assemble("LDI R0, NOWHERE"),
            Err(AssemblerError::UndefinedLabel { .. })
        ));
        assert!(matches!(
            assemble("A:\nA:"),
            Err(AssemblerError::DuplicateLabel { line: 2, .. })
        ));
    }
}

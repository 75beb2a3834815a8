//! Disassembler for LS-8 programs.
//!
//! Converts program bytes back to readable assembly.

use crate::cpu::decode::{Instruction, Opcode};

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(instr: &Instruction) -> String {
    let Instruction { opcode, operand_a: a, operand_b: b } = *instr;
    match opcode.operand_count() {
        0 => opcode.to_string(),
        1 => format!("{} R{}", opcode, a),
        _ if opcode == Opcode::Ldi => format!("{} R{}, {}", opcode, a, b),
        _ => format!("{} R{}, R{}", opcode, a, b),
    }
}

/// Disassemble the instruction at `addr` in `bytes`.
///
/// Returns the text and the number of bytes consumed. Unknown opcodes are
/// rendered as a data byte.
pub fn disassemble_at(bytes: &[u8], addr: usize) -> (String, usize) {
    let tail = bytes.get(addr..).unwrap_or(&[]);
    match Instruction::decode(tail) {
        Ok(instr) => {
            let size = instr.opcode.size() as usize;
            (disassemble_instruction(&instr), size)
        }
        Err(_) => {
            let byte = tail.first().copied().unwrap_or(0);
            (format!("DB {:#010b}", byte), 1)
        }
    }
}

/// Disassemble a program listing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 Disassembly\n");
    output.push_str("; ----------------\n\n");

    let mut addr = 0;
    while addr < bytes.len() {
        let (text, size) = disassemble_at(bytes, addr);
        let end = (addr + size).min(bytes.len());
        let raw: Vec<String> = bytes[addr..end].iter().map(|b| format!("{:08b}", b)).collect();
        output.push_str(&format!("{:03}: {:<14} ; {}\n", addr, text, raw.join(" ")));
        addr += size;
    }

    output
}

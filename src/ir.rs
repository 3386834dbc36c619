//! Bytecode instruction set for the stack machine. An instruction is one
//! opcode byte, optionally followed by an inline little-endian i64 operand.

use num_enum::TryFromPrimitive;

use crate::intern::{Interner, Symbol};

pub const OPERAND_SIZE: usize = std::mem::size_of::<i64>();

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Push = 0,
    Pop,
    Dup,

    Add,
    Sub,
    Mul,
    Div,

    And,
    Or,
    Not,

    Eq,
    Neq,
    Lt,
    Gt,

    Store,
    Load,
    StoreGlob,
    LoadGlob,

    Jump,
    Call,
    Return,
    JumpIf,
    JumpIfNot,
}

impl Opcode {
    pub fn has_operand(self) -> bool {
        matches!(
            self,
            Opcode::Push
                | Opcode::Store
                | Opcode::Load
                | Opcode::StoreGlob
                | Opcode::LoadGlob
                | Opcode::Jump
                | Opcode::Call
                | Opcode::JumpIf
                | Opcode::JumpIfNot
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Store => "STORE",
            Opcode::Load => "LOAD",
            Opcode::StoreGlob => "STORE_GLOB",
            Opcode::LoadGlob => "LOAD_GLOB",
            Opcode::Jump => "JUMP",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::JumpIf => "JUMP_IF",
            Opcode::JumpIfNot => "JUMP_IFNOT",
        }
    }
}

/// Reads an inline operand; short reads yield 0 like the executor's guard.
pub fn read_i64(code: &[u8], at: usize) -> i64 {
    match code.get(at..at + OPERAND_SIZE) {
        Some(bytes) => i64::from_le_bytes(bytes.try_into().unwrap_or([0; OPERAND_SIZE])),
        None => 0,
    }
}

/// A growable bytecode buffer with emit/patch helpers.
#[derive(Debug, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Appends an operand-less instruction; returns its offset.
    pub fn emit(&mut self, op: Opcode) -> usize {
        let at = self.code.len();
        self.code.push(op as u8);
        at
    }

    /// Appends an instruction with an inline operand; returns the offset of
    /// the operand bytes so jumps can be patched once targets are known.
    pub fn emit_with(&mut self, op: Opcode, operand: i64) -> usize {
        self.code.push(op as u8);
        let at = self.code.len();
        self.code.extend_from_slice(&operand.to_le_bytes());
        at
    }

    /// Overwrites the operand previously reserved at `operand_at`.
    pub fn patch(&mut self, operand_at: usize, value: i64) {
        self.code[operand_at..operand_at + OPERAND_SIZE].copy_from_slice(&value.to_le_bytes());
    }

    /// Human-readable listing. Global accesses resolve their interned name.
    pub fn disassemble(&self, interner: &Interner) -> String {
        let mut out = String::new();
        let mut at = 0;
        while at < self.code.len() {
            let byte = self.code[at];
            match Opcode::try_from(byte) {
                Ok(op) => {
                    if op.has_operand() {
                        let operand = read_i64(&self.code, at + 1);
                        match op {
                            Opcode::StoreGlob | Opcode::LoadGlob => {
                                let idx = operand as usize;
                                let name = if operand >= 0 && idx < interner.len() {
                                    interner.resolve(Symbol::from_index(idx))
                                } else {
                                    "?"
                                };
                                out.push_str(&format!("{:04} {} {}\n", at, op.mnemonic(), name));
                            }
                            _ => {
                                out.push_str(&format!("{:04} {} {}\n", at, op.mnemonic(), operand));
                            }
                        }
                        at += 1 + OPERAND_SIZE;
                    } else {
                        out.push_str(&format!("{:04} {}\n", at, op.mnemonic()));
                        at += 1;
                    }
                }
                Err(_) => {
                    out.push_str(&format!("{:04} ??? ({})\n", at, byte));
                    at += 1;
                }
            }
        }
        out
    }
}

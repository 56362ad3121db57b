//! Bytecode errors

use thiserror::Error;

/// Errors that can occur during bytecode operations
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Word at `offset` is not a known opcode
    #[error("Invalid opcode {opcode} at offset {offset}")]
    InvalidOpcode {
        /// The raw instruction word
        opcode: i32,
        /// Word offset of the instruction
        offset: usize,
    },

    /// Operand references something outside its table
    #[error("Invalid operand at offset {offset}: {reason}")]
    InvalidOperand {
        /// Word offset of the operand
        offset: usize,
        /// What was out of range
        reason: String,
    },

    /// Unexpected end of the instruction stream
    #[error("Unexpected end of bytecode at offset {0}")]
    UnexpectedEnd(usize),

    /// Line table is empty, does not start at 0, or is not strictly increasing
    #[error("Invalid line table: {0}")]
    InvalidLineTable(String),

    /// Type table entry references a missing type or struct
    #[error("Invalid type table entry {index}: {reason}")]
    InvalidType {
        /// Index of the offending descriptor
        index: u32,
        /// What was wrong with it
        reason: String,
    },

    /// Payload could not be (de)serialized
    #[error("Malformed module payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Writing disassembly text failed
    #[error("Formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}

impl BytecodeError {
    /// Create an operand error
    pub fn operand(offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidOperand {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;

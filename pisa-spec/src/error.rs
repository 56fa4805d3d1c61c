//! Error types for the P-ISA instruction model

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PisaError {
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("Malformed w-param {text:?}: {reason}")]
    MalformedWParam { text: String, reason: String },

    #[error("Instruction {opcode} expects {expected} fields, found {found}")]
    FieldCountMismatch {
        opcode: String,
        expected: usize,
        found: usize,
    },

    #[error("Expected a number in field {field:?}: {source}")]
    InvalidNumber {
        field: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Malformed operand bank suffix: {0:?}")]
    MalformedBank(String),
}

pub type Result<T> = std::result::Result<T, PisaError>;

//! Runtime error types

use pisa_spec::Opcode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Spec error: {0}")]
    Spec(#[from] pisa_spec::PisaError),

    #[error("Width mismatch: left register has {left} elements, right has {right}")]
    WidthMismatch { left: usize, right: usize },

    #[error("Copy requested unallocated memory address: {0}")]
    MissingRegister(String),

    #[error("Residue {residue} is outside the modulus chain (length {chain_len})")]
    MissingResidue { residue: usize, chain_len: usize },

    #[error("No NTT twiddle factors for residue {residue}")]
    MissingNttTwiddle { residue: usize },

    #[error("No iNTT twiddle table for galois element {galois}")]
    MissingGaloisTable { galois: String },

    #[error("No iNTT twiddle factors for galois element {galois}, residue {residue}")]
    MissingInttTwiddle { galois: String, residue: usize },

    #[error("Failed to decode {0}")]
    DecodeFailed(Opcode),

    #[error("Input {name} has {len} elements, not a multiple of the register width {width}; mapping undefined")]
    UnevenInput {
        name: String,
        len: usize,
        width: usize,
    },

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Malformed memory dump at line {line}: {reason}")]
    MalformedDump { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data file error: {0}")]
    Data(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

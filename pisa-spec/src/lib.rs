//! # P-ISA Specification
//!
//! Instruction set model for a polynomial accelerator targeting homomorphic
//! encryption. Instructions operate on wide vectors of 32-bit residues in RNS
//! form.
//!
//! ## Key Features
//! - Closed taxonomy of nine operations (add, sub, mul, mac, maci, muli,
//!   copy, ntt, intt)
//! - Uniform operand/attribute schema per variant, with textual round-trip
//! - RNS residue indices into a modulus chain
//! - Packed w-parameters and galois elements for the NTT/iNTT stages

pub mod error;
pub mod instruction;
pub mod operand;
pub mod wparam;

pub use error::PisaError;
pub use instruction::{Field, Instruction, Opcode};
pub use operand::Operand;
pub use wparam::WParam;

/// Polynomial coefficient type (32-bit residues)
pub type Word = u32;

/// Widened intermediate type for modular reductions
pub type Wide = u64;

/// Canonical multi-register width (elements per device register)
pub const DEFAULT_REGISTER_WIDTH: usize = 8192;

/// Default galois element key for iNTT twiddle lookup
pub const DEFAULT_GALOIS_ELEMENT: u32 = 1;

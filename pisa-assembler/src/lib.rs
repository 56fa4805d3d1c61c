//! P-ISA Assembler
//!
//! Parse P-ISA instruction streams from their CSV textual form and write
//! them back out.
//!
//! ## Example
//!
//! ```rust
//! use pisa_assembler::parse_program;
//!
//! let source = "14, add, c_0_0, a_0_0, b_0_0, 1\n14, copy, d_0_0, c_0_0\n";
//! let instructions = parse_program(source).unwrap();
//! assert_eq!(instructions.len(), 2);
//! ```

pub mod error;
pub mod parser;

pub use error::{ParseError, Result};
pub use parser::{parse_file, parse_line, parse_program, write_program};

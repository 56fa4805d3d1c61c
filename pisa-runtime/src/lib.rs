//! P-ISA Runtime
//!
//! Functional simulation of P-ISA instruction streams: a string-addressed
//! device memory of wide registers, a decode/execute engine with modular
//! arithmetic and single-stage NTT/iNTT transforms, optional instruction
//! tracing, memory dumps, and the program runtime that loads test vectors,
//! executes, and validates results.

pub mod arith;
pub mod data;
pub mod dump;
pub mod engine;
pub mod error;
pub mod memory;
pub mod multi_register;
pub mod runtime;
pub mod trace;
pub mod validate;

pub use data::{ProgramData, TwiddleData};
pub use engine::{FunctionalModel, TwiddleMap};
pub use error::{Result, RuntimeError};
pub use memory::MemoryModel;
pub use multi_register::MultiRegister;
pub use runtime::ProgramRuntime;
pub use trace::InstructionTrace;
pub use validate::{ValidationEntry, ValidationReport};

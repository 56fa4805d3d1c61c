//! Parser error types

use pisa_spec::PisaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: PisaError,
    },

    #[error("Line {line}: empty instruction")]
    EmptyLine { line: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_carries_line() {
        let err = ParseError::Malformed {
            line: 7,
            source: PisaError::UnknownOpcode("xor".to_string()),
        };
        assert_eq!(err.to_string(), "Line 7: Unknown opcode: xor");
    }
}

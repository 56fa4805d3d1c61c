//! Analysis error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Requested node id {0} does not exist")]
    UnknownNode(usize),

    #[error("Unknown hardware model: {0}")]
    UnknownHardwareModel(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_node_display() {
        assert_eq!(
            AnalysisError::UnknownNode(42).to_string(),
            "Requested node id 42 does not exist"
        );
    }
}

//! Error types for pipe construction

use thiserror::Error;

/// Result type alias using PipeError
pub type PipeResult<T> = std::result::Result<T, PipeError>;

/// Errors raised while assembling pipes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipeError {
    #[error("A meta pipe needs at least two pipes, got {0}")]
    TooFewPipes(usize),

    #[error("First pipe {0} does not accept a source")]
    RejectsSource(String),

    #[error("Last pipe {0} produces no output")]
    NoOutput(String),
}

impl From<PipeError> for pipegraph_core::Error {
    fn from(e: PipeError) -> Self {
        pipegraph_core::Error::InvalidArgument(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_graph_error() {
        let err: pipegraph_core::Error = PipeError::TooFewPipes(1).into();
        assert!(matches!(err, pipegraph_core::Error::InvalidArgument(msg) if msg.contains("at least two")));
    }
}

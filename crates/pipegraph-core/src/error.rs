//! Error types for Pipegraph Core

use crate::types::ElementKind;
use thiserror::Error;

/// Result type alias using Pipegraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Pipegraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Duplicate {kind} identifier: {id}")]
    DuplicateIdentifier { kind: ElementKind, id: String },

    #[error("Unknown {kind} reference: {id}")]
    UnknownReference { kind: ElementKind, id: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Vetoed by hook '{hook}': {reason}")]
    Vetoed { hook: String, reason: String },

    #[error("Graph has been shut down")]
    ShutDown,

    #[error("Revision conflict on {target}: element changed concurrently")]
    RevisionConflict { target: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn duplicate(kind: ElementKind, id: &impl std::fmt::Debug) -> Self {
        Self::DuplicateIdentifier {
            kind,
            id: format!("{:?}", id),
        }
    }

    pub(crate) fn unknown(kind: ElementKind, id: &impl std::fmt::Debug) -> Self {
        Self::UnknownReference {
            kind,
            id: format!("{:?}", id),
        }
    }

    pub(crate) fn lock<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(format!("Lock error: {}", e))
    }

    /// Whether this error came from a hook refusing the mutation
    pub fn is_veto(&self) -> bool {
        matches!(self, Self::Vetoed { .. })
    }
}

/// A refusal returned by a "before" hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Veto {
    pub reason: String,
}

impl Veto {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub(crate) fn into_error(self, hook: impl Into<String>) -> Error {
        Error::Vetoed {
            hook: hook.into(),
            reason: self.reason,
        }
    }
}

impl std::fmt::Display for Veto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

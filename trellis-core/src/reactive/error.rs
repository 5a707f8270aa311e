//! Engine errors.

use thiserror::Error;

use super::scope::ScopeId;

/// Errors raised by the reactive engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Work was submitted to a scope that has already been torn down.
    #[error("scope {0} has been disposed")]
    ScopeDisposed(ScopeId),

    /// A chain of effects kept re-triggering itself past the configured limit.
    #[error("update depth exceeded ({depth} nested effect runs)")]
    UpdateDepthExceeded { depth: usize },

    /// The engine configuration could not be parsed.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidConfig(err.to_string())
    }
}

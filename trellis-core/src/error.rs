//! Facade errors.

use thiserror::Error;

/// Errors reported by the facade's strict operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FacadeError {
    /// A write reached a formula that was built without a setter.
    #[error("formula has no setter; the write was discarded")]
    ReadOnlyFormula,
}

/// Result type for facade operations.
pub type FacadeResult<T> = Result<T, FacadeError>;

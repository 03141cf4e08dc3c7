//! Error types for mock bus operations.

use thiserror::Error;

use jw_core::{CoreError, SignalKey, SignalKind};

/// Result type for mock bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors that abort a publish cycle.
///
/// A failed cycle leaves the addressed join untouched: nothing is stored
/// and no subscriber is notified. Cycles that completed earlier in the same
/// cascade keep their effects.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BusError {
    /// A value of one kind was published to, or produced for, a join of another.
    #[error("Kind mismatch on {key}: expected {expected}, got {actual}")]
    KindMismatch {
        key: SignalKey,
        expected: SignalKind,
        actual: SignalKind,
    },

    /// A cascade nested deeper than the configured limit.
    #[error("Recursion limit of {limit} reached while publishing {key}")]
    RecursionLimit { key: SignalKey, limit: usize },

    /// A logic wave refused the incoming value.
    #[error("Logic wave on {key} failed: {what}")]
    Wave { key: SignalKey, what: String },

    /// Invalid block or rule configuration.
    #[error("Invalid mock configuration: {what}")]
    InvalidConfig { what: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl BusError {
    /// Convenience for logic waves that reject a value.
    pub fn wave(key: SignalKey, what: impl Into<String>) -> Self {
        BusError::Wave {
            key,
            what: what.into(),
        }
    }
}

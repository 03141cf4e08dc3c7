use thiserror::Error;

use crate::signal::SignalKind;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown signal kind: {name}")]
    UnknownKind { name: String },

    #[error("Cannot parse '{input}' as a {kind} value")]
    ParseValue { kind: SignalKind, input: String },

    #[error("Kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: SignalKind,
        actual: SignalKind,
    },
}

use thiserror::Error;

use jw_core::SignalKind;
use jw_joins::JoinError;
use jw_mock::BusError;

pub type BindingResult<T> = Result<T, BindingError>;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("Invalid join specification: {0}")]
    Join(#[from] JoinError),

    #[error(transparent)]
    Bus(#[from] BusError),

    /// Multi-address publish with the wrong number of values. Nothing is published.
    #[error("Given {actual} values for a binding of {expected} addresses")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Index {index} is out of range for a binding of {len} addresses")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Binding expects {expected} values, got {actual}")]
    KindMismatch {
        expected: SignalKind,
        actual: SignalKind,
    },
}

//! Error types for join resolution and join map lookups.

use thiserror::Error;

/// Result type for join operations.
pub type JoinResult<T> = Result<T, JoinError>;

/// Errors raised while resolving specs or walking a join map.
///
/// The `Invalid join specification` variants are reported before any
/// subscription is made.
#[derive(Debug, Error)]
pub enum JoinError {
    /// An explicit address list with no entries.
    #[error("Invalid join specification: empty address list{}", context_suffix(.context))]
    EmptyList { context: Option<String> },

    /// A `{start, end}` range with `start > end`.
    #[error("Invalid join specification: range start {start} is greater than end {end}")]
    EmptyRange { start: i64, end: i64 },

    /// A range with more addresses than a binding may hold.
    #[error("Invalid join specification: range {start}..={end} exceeds {limit} addresses")]
    RangeTooLarge { start: i64, end: i64, limit: usize },

    /// A numeric join whose offset address does not fit in an `i64`.
    #[error("Invalid join specification: join {join} with offset {offset} overflows")]
    AddressOverflow { join: i64, offset: i64 },

    /// No leaf exists at the given path.
    #[error("No join at path '{path}'")]
    PathNotFound { path: String },

    /// A path index past the end of a list or a multi-address leaf.
    #[error("Index {index} out of range at '{path}' (len={len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    /// A malformed path expression.
    #[error("Invalid join path '{path}': {what}")]
    InvalidPath { path: String, what: &'static str },

    #[error("Render error: {0}")]
    Render(#[from] serde_json::Error),
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(c) => format!(" ({})", c),
        None => String::new(),
    }
}

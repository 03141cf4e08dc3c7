//! Error types for the jw-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one error to report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(#[from] jw_project::ProjectError),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: jw_project::ProjectError,
    },

    #[error("Project validation failed: {0}")]
    Validation(#[from] jw_project::ValidationError),

    #[error("Join map error: {0}")]
    Join(#[from] jw_joins::JoinError),

    #[error("Binding error: {0}")]
    Binding(#[from] jw_binding::BindingError),

    #[error("Bus error: {0}")]
    Bus(#[from] jw_mock::BusError),

    #[error("Join not bound: {0}")]
    JoinNotBound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for jw-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<jw_core::CoreError> for AppError {
    fn from(err: jw_core::CoreError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

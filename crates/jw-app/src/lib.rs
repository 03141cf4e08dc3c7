//! Shared application service layer for joinwave.
//!
//! Loads project files, compiles them into a live mock session (a bus with
//! every mock and rule installed plus one binding per join) and replays
//! publish scripts against it. The CLI is a thin shell over this crate.

pub mod error;
pub mod project_service;
pub mod script;
pub mod session;

pub use error::{AppError, AppResult};
pub use project_service::{ProjectSummary, load_project, render_joins, summarize_project};
pub use script::{StepOutcome, StepStatus, Transcript, parse_step, run};
pub use session::{Session, StateRow, build_rule, compile};

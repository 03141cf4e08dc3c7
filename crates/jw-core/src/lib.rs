//! jw-core: shared foundation for joinwave.
//!
//! Contains:
//! - signal (the three join kinds, their values and addresses)
//! - ids (subscription handles)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod signal;

pub use error::{CoreError, CoreResult};
pub use ids::SubscriptionId;
pub use signal::{Address, SignalKey, SignalKind, SignalValue};

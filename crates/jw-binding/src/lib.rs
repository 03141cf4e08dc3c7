//! Bindings between join specs and a control system.
//!
//! A [`JoinBinding`] is what a panel component holds: it subscribes on
//! creation, tracks the latest value of each bound join, publishes through
//! the join spec's debounce and reset-after effects, and unsubscribes when
//! dropped. Timing effects run on a virtual [`Timeline`] so sessions are
//! deterministic.
//!
//! ```rust
//! use jw_binding::{JoinBinding, Timeline};
//! use jw_core::{SignalKind, SignalValue};
//! use jw_joins::JoinSpec;
//! use jw_mock::MockBus;
//!
//! let bus = MockBus::new();
//! let timeline = Timeline::new();
//! let spec = JoinSpec::single(SignalKind::Boolean, 1).with_reset_after(200);
//! let button = JoinBinding::new(bus.clone(), spec, timeline.clone()).unwrap();
//!
//! button.publish(true).unwrap();
//! assert_eq!(button.value(), SignalValue::Boolean(true));
//!
//! timeline.advance_by(200);
//! assert_eq!(button.value(), SignalValue::Boolean(false));
//! ```

pub mod binding;
pub mod error;
pub mod log;
pub mod timeline;

pub use binding::JoinBinding;
pub use error::{BindingError, BindingResult};
pub use log::{LogDirection, LogFormatter, LogMode, LogRecord};
pub use timeline::{Timeline, TimerId};

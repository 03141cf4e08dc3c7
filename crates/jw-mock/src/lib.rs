//! Mock control-system engine for joinwave.
//!
//! This crate stands in for a live control processor so panels can be
//! developed without hardware. It stores the current value of every join,
//! notifies subscribers, and runs "logic waves": transforms registered per
//! join that emulate the processor's program (toggles, clamps, interlocks).
//!
//! # Architecture
//!
//! - [`SignalStore`]: current value per `(kind, address)`, lazily defaulted
//! - [`SubscriberRegistry`]: callbacks per join, notified in registration order
//! - [`WaveEngine`]: logic waves and declarative rules per join
//! - [`MockBus`]: the facade; the only way state changes
//!
//! Every state change goes through one publish cycle:
//!
//! 1. apply the join's logic wave and rules (which may publish to other joins)
//! 2. store the resulting value
//! 3. notify the join's subscribers
//!
//! Execution is single-threaded and synchronous; a publish returns only
//! after every cascade it caused has completed.
//!
//! # Example
//!
//! ```rust
//! use jw_core::{SignalKind, SignalValue};
//! use jw_mock::{LogicBlock, MockBus};
//!
//! let bus = MockBus::new();
//! bus.register_block(SignalKind::Number, "1", LogicBlock::Clamp { min: 0.0, max: 100.0 })
//!     .unwrap();
//!
//! bus.publish(SignalKind::Number, "1", 150).unwrap();
//! assert_eq!(bus.state(SignalKind::Number, "1"), SignalValue::Number(100.0));
//! ```

pub mod blocks;
pub mod bus;
pub mod error;
pub mod registry;
pub mod rules;
pub mod store;
pub mod transport;
pub mod wave;

pub use blocks::LogicBlock;
pub use bus::{BusConfig, MockBus};
pub use error::{BusError, BusResult};
pub use registry::{Callback, SubscriberRegistry};
pub use rules::{Effect, MockRule, Trigger};
pub use store::SignalStore;
pub use transport::ControlSystem;
pub use wave::{LogicWave, WaveContext, WaveEngine, logic_wave};

//! The seam between bindings and whatever carries join traffic.

use jw_core::{Address, SignalKind, SignalValue, SubscriptionId};

use crate::error::BusResult;
use crate::registry::Callback;
use crate::wave::LogicWave;

/// Operations a binding needs from a control system.
///
/// [`MockBus`](crate::MockBus) is the in-process implementation; a live
/// processor link would implement the same trait.
pub trait ControlSystem {
    /// Register `callback` for a join. Implementations deliver the current
    /// value once before returning.
    fn subscribe_state(
        &self,
        kind: SignalKind,
        address: &Address,
        callback: Callback,
    ) -> SubscriptionId;

    /// Returns `false` if `id` was not subscribed to this join.
    fn unsubscribe_state(&self, kind: SignalKind, address: &Address, id: SubscriptionId) -> bool;

    fn publish_event(&self, kind: SignalKind, address: &Address, value: SignalValue)
    -> BusResult<()>;

    fn state(&self, kind: SignalKind, address: &Address) -> SignalValue;

    /// Install mock behavior for a join. Transports without a mock layer
    /// ignore the request and return `Ok(false)`.
    fn register_mock(
        &self,
        _kind: SignalKind,
        _address: &Address,
        _wave: Option<LogicWave>,
        _initial: Option<SignalValue>,
    ) -> BusResult<bool> {
        Ok(false)
    }
}

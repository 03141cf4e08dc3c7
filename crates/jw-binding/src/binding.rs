//! A live binding between one join spec and a control system.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{error, warn};

use jw_core::{Address, SignalValue, SubscriptionId};
use jw_joins::{JoinSpec, resolve};
use jw_mock::{Callback, ControlSystem};

use crate::error::{BindingError, BindingResult};
use crate::log::{LogDirection, LogMode, LogRecord};
use crate::timeline::{Timeline, TimerId};

struct Shared<S: ControlSystem + 'static> {
    system: S,
    spec: JoinSpec,
    addresses: Vec<Address>,
    values: RefCell<Vec<SignalValue>>,
    log: LogMode,
    timeline: Timeline,
    subscribing: Cell<bool>,
    debounce: Cell<Option<TimerId>>,
    resets: RefCell<Vec<TimerId>>,
    subscriptions: RefCell<Vec<SubscriptionId>>,
}

impl<S: ControlSystem + 'static> Shared<S> {
    fn record<'a>(
        &'a self,
        index: usize,
        direction: LogDirection,
        value: &'a SignalValue,
    ) -> LogRecord<'a> {
        LogRecord {
            kind: self.spec.kind,
            join: &self.addresses[index],
            direction,
            value,
            key: self.spec.key.as_deref(),
            index: self.spec.is_multi().then_some(index),
        }
    }

    fn receive(&self, index: usize, value: &SignalValue) {
        let direction = if self.subscribing.get() {
            LogDirection::Init
        } else {
            LogDirection::Received
        };
        self.log.emit(&self.record(index, direction, value));
        if let Some(slot) = self.values.borrow_mut().get_mut(index) {
            *slot = value.clone();
        }
    }

    /// Publish every value to its address, no effects applied.
    fn send(&self, values: &[SignalValue]) -> BindingResult<()> {
        for (index, value) in values.iter().enumerate() {
            self.send_one(index, value.clone())?;
        }
        Ok(())
    }

    fn send_one(&self, index: usize, value: SignalValue) -> BindingResult<()> {
        self.log.emit(&self.record(index, LogDirection::Sent, &value));
        self.system
            .publish_event(self.spec.kind, &self.addresses[index], value)?;
        Ok(())
    }

    fn reset_values(&self) -> Vec<SignalValue> {
        vec![self.spec.kind.default_value(); self.addresses.len()]
    }

    fn check(&self, values: &[SignalValue]) -> BindingResult<()> {
        if values.len() != self.addresses.len() {
            error!(
                key = self.spec.key.as_deref().unwrap_or_default(),
                expected = self.addresses.len(),
                actual = values.len(),
                "publish length does not match the binding's addresses; nothing sent"
            );
            return Err(BindingError::LengthMismatch {
                expected: self.addresses.len(),
                actual: values.len(),
            });
        }
        if let Some(bad) = values.iter().find(|v| v.kind() != self.spec.kind) {
            return Err(BindingError::KindMismatch {
                expected: self.spec.kind,
                actual: bad.kind(),
            });
        }
        Ok(())
    }
}

/// Publish `values` now and schedule the reset-after publish, if configured.
fn send_with_reset<S: ControlSystem + 'static>(
    shared: &Rc<Shared<S>>,
    values: &[SignalValue],
) -> BindingResult<()> {
    shared.send(values)?;
    let Some(delay) = shared.spec.effects.reset_after_ms else {
        return Ok(());
    };

    let weak = Rc::downgrade(shared);
    let id = shared.timeline.schedule(delay, move || {
        if let Some(shared) = weak.upgrade() {
            let defaults = shared.reset_values();
            if let Err(err) = shared.send(&defaults) {
                warn!(error = %err, "reset-after publish failed");
            }
        }
    });
    let timeline = &shared.timeline;
    let mut resets = shared.resets.borrow_mut();
    resets.retain(|id| timeline.is_pending(*id));
    resets.push(id);
    Ok(())
}

/// Route a publish through the configured effects.
fn dispatch<S: ControlSystem + 'static>(
    shared: &Rc<Shared<S>>,
    values: Vec<SignalValue>,
) -> BindingResult<()> {
    let Some(quiet) = shared.spec.effects.debounce_ms else {
        return send_with_reset(shared, &values);
    };

    if let Some(pending) = shared.debounce.take() {
        shared.timeline.cancel(pending);
    }
    let weak: Weak<Shared<S>> = Rc::downgrade(shared);
    let id = shared.timeline.schedule(quiet, move || {
        if let Some(shared) = weak.upgrade() {
            shared.debounce.set(None);
            if let Err(err) = send_with_reset(&shared, &values) {
                warn!(error = %err, "debounced publish failed");
            }
        }
    });
    shared.debounce.set(Some(id));
    Ok(())
}

/// Subscribes to every address of a [`JoinSpec`] for as long as it lives.
///
/// The binding keeps a local copy of the joined values, updated by the
/// system's notifications. Publishing goes through the join spec's effects:
/// `debounce_ms` coalesces bursts and sends only the last value after the
/// quiet period; `reset_after_ms` publishes the kind's default value to
/// every address some time after each publish. Both run on the binding's
/// [`Timeline`].
///
/// Dropping the binding unsubscribes everything and cancels pending effects.
pub struct JoinBinding<S: ControlSystem + 'static> {
    shared: Rc<Shared<S>>,
}

impl<S: ControlSystem + 'static> JoinBinding<S> {
    /// Bind with logging taken from the join spec's `log` flag.
    pub fn new(system: S, spec: JoinSpec, timeline: Timeline) -> BindingResult<Self> {
        let log = LogMode::from_flag(spec.log);
        Self::with_log(system, spec, timeline, log)
    }

    /// Resolve, seed the mock initial value, then subscribe every address.
    ///
    /// Fails before touching the system if the join spec does not resolve.
    pub fn with_log(
        system: S,
        spec: JoinSpec,
        timeline: Timeline,
        log: LogMode,
    ) -> BindingResult<Self> {
        let addresses = resolve(&spec)?;

        if let Some(initial) = spec.initial_value() {
            for address in &addresses {
                system.register_mock(spec.kind, address, None, Some(initial.clone()))?;
            }
        }

        let shared = Rc::new(Shared {
            values: RefCell::new(vec![spec.kind.default_value(); addresses.len()]),
            system,
            spec,
            addresses,
            log,
            timeline,
            subscribing: Cell::new(true),
            debounce: Cell::new(None),
            resets: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Vec::new()),
        });

        for (index, address) in shared.addresses.iter().enumerate() {
            let weak = Rc::downgrade(&shared);
            let callback: Callback = Rc::new(move |value: &SignalValue| {
                if let Some(shared) = weak.upgrade() {
                    shared.receive(index, value);
                }
            });
            let id = shared
                .system
                .subscribe_state(shared.spec.kind, address, callback);
            shared.subscriptions.borrow_mut().push(id);
        }
        shared.subscribing.set(false);

        Ok(Self { shared })
    }

    pub fn spec(&self) -> &JoinSpec {
        &self.shared.spec
    }

    pub fn addresses(&self) -> &[Address] {
        &self.shared.addresses
    }

    pub fn is_multi(&self) -> bool {
        self.shared.spec.is_multi()
    }

    /// Value of the first (for single bindings, the only) address.
    pub fn value(&self) -> SignalValue {
        self.shared
            .values
            .borrow()
            .first()
            .cloned()
            .unwrap_or_else(|| self.shared.spec.kind.default_value())
    }

    pub fn values(&self) -> Vec<SignalValue> {
        self.shared.values.borrow().clone()
    }

    /// Publish to a single-address binding.
    pub fn publish(&self, value: impl Into<SignalValue>) -> BindingResult<()> {
        self.publish_all(vec![value.into()])
    }

    /// Publish one value per address, in address order.
    ///
    /// The length must match the resolved address count exactly; otherwise
    /// the mismatch is logged and nothing is sent.
    pub fn publish_all(&self, values: Vec<SignalValue>) -> BindingResult<()> {
        self.shared.check(&values)?;
        dispatch(&self.shared, values)
    }

    /// Publish to one address of the binding right away, bypassing effects.
    pub fn publish_index(&self, index: usize, value: impl Into<SignalValue>) -> BindingResult<()> {
        let len = self.shared.addresses.len();
        if index >= len {
            return Err(BindingError::IndexOutOfRange { index, len });
        }
        let value = value.into();
        if value.kind() != self.shared.spec.kind {
            return Err(BindingError::KindMismatch {
                expected: self.shared.spec.kind,
                actual: value.kind(),
            });
        }
        self.shared.send_one(index, value)
    }

    /// Publish `f(current value)`.
    pub fn update<F>(&self, f: F) -> BindingResult<()>
    where
        F: FnOnce(&SignalValue) -> SignalValue,
    {
        let next = f(&self.value());
        self.publish(next)
    }

    /// Publish `f(current values)` to every address.
    pub fn update_all<F>(&self, f: F) -> BindingResult<()>
    where
        F: FnOnce(&[SignalValue]) -> Vec<SignalValue>,
    {
        let next = f(&self.values());
        self.publish_all(next)
    }

    /// A debounced publish is waiting on the timeline.
    pub fn has_pending_publish(&self) -> bool {
        self.shared
            .debounce
            .get()
            .is_some_and(|id| self.shared.timeline.is_pending(id))
    }
}

impl<S: ControlSystem + 'static> Drop for JoinBinding<S> {
    fn drop(&mut self) {
        let shared = &self.shared;
        if let Some(id) = shared.debounce.take() {
            shared.timeline.cancel(id);
        }
        for id in shared.resets.borrow_mut().drain(..) {
            shared.timeline.cancel(id);
        }
        let ids: Vec<SubscriptionId> = shared.subscriptions.borrow_mut().drain(..).collect();
        for (address, id) in shared.addresses.iter().zip(ids) {
            shared.system.unsubscribe_state(shared.spec.kind, address, id);
        }
    }
}

impl<S: ControlSystem + 'static> fmt::Debug for JoinBinding<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinBinding")
            .field("kind", &self.shared.spec.kind)
            .field("addresses", &self.shared.addresses)
            .field("values", &*self.shared.values.borrow())
            .field("log", &self.shared.log)
            .finish()
    }
}

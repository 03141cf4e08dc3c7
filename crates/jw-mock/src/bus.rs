//! The mock bus facade.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use jw_core::{Address, SignalKey, SignalKind, SignalValue, SubscriptionId};

use crate::blocks::LogicBlock;
use crate::error::{BusError, BusResult};
use crate::registry::{Callback, SubscriberRegistry};
use crate::rules::MockRule;
use crate::store::SignalStore;
use crate::transport::ControlSystem;
use crate::wave::{self, LogicWave, WaveContext, WaveEngine, logic_wave};

pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Shown in log output.
    pub name: String,
    /// Deepest allowed publish cascade; `None` disables the check.
    pub max_depth: Option<usize>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

struct BusInner {
    config: BusConfig,
    session: Uuid,
    store: RefCell<SignalStore>,
    registry: RefCell<SubscriberRegistry>,
    engine: RefCell<WaveEngine>,
    depth: Cell<usize>,
}

/// In-process control system.
///
/// Cloning is cheap and every clone shares the same state. The bus is
/// single-threaded; callbacks and waves run synchronously inside
/// [`MockBus::publish`]. No internal borrow is held while user code runs,
/// so callbacks and waves may call back into the bus freely.
#[derive(Clone)]
pub struct MockBus {
    inner: Rc<BusInner>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        let session = Uuid::new_v4();
        debug!(bus = %config.name, %session, "mock bus created");
        Self {
            inner: Rc::new(BusInner {
                config,
                session,
                store: RefCell::new(SignalStore::new()),
                registry: RefCell::new(SubscriberRegistry::new()),
                engine: RefCell::new(WaveEngine::new()),
                depth: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Identifies this bus instance in logs.
    pub fn session(&self) -> Uuid {
        self.inner.session
    }

    pub(crate) fn engine(&self) -> &RefCell<WaveEngine> {
        &self.inner.engine
    }

    /// Current value of a join; the kind's default if never written.
    pub fn state(&self, kind: SignalKind, address: impl Into<Address>) -> SignalValue {
        self.state_of(&SignalKey::new(kind, address))
    }

    pub fn state_of(&self, key: &SignalKey) -> SignalValue {
        self.inner.store.borrow().get(key)
    }

    /// Register a callback and deliver the current value to it immediately.
    pub fn subscribe<F>(
        &self,
        kind: SignalKind,
        address: impl Into<Address>,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(&SignalValue) + 'static,
    {
        self.subscribe_callback(SignalKey::new(kind, address), Rc::new(callback))
    }

    pub fn subscribe_callback(&self, key: SignalKey, callback: Callback) -> SubscriptionId {
        self.inner.store.borrow_mut().touch(&key);
        let id = self
            .inner
            .registry
            .borrow_mut()
            .insert(key.clone(), Rc::clone(&callback));
        trace!(bus = %self.inner.config.name, key = %key, id = %id, "subscribed");

        let current = self.state_of(&key);
        callback(&current);
        id
    }

    /// Remove one subscription. Unknown ids are ignored.
    pub fn unsubscribe(
        &self,
        kind: SignalKind,
        address: impl Into<Address>,
        id: SubscriptionId,
    ) -> bool {
        let key = SignalKey::new(kind, address);
        let removed = self.inner.registry.borrow_mut().remove(&key, id);
        trace!(bus = %self.inner.config.name, key = %key, id = %id, removed, "unsubscribed");
        removed
    }

    pub fn subscriber_count(&self, kind: SignalKind, address: impl Into<Address>) -> usize {
        self.inner
            .registry
            .borrow()
            .count(&SignalKey::new(kind, address))
    }

    /// Run one publish cycle: transform, store, notify.
    ///
    /// Returns after every cascade the publish caused has finished. On error
    /// the addressed join is left unchanged and nobody is notified.
    pub fn publish(
        &self,
        kind: SignalKind,
        address: impl Into<Address>,
        value: impl Into<SignalValue>,
    ) -> BusResult<()> {
        self.publish_key(SignalKey::new(kind, address), value.into())
    }

    pub fn publish_key(&self, key: SignalKey, value: SignalValue) -> BusResult<()> {
        check_kind(&key, &value)?;

        let depth = self.inner.depth.get();
        if let Some(limit) = self.inner.config.max_depth {
            if depth >= limit {
                warn!(bus = %self.inner.config.name, key = %key, limit, "publish cascade too deep");
                return Err(BusError::RecursionLimit { key, limit });
            }
        }

        self.inner.depth.set(depth + 1);
        let result = self.run_cycle(key, value);
        self.inner.depth.set(depth);
        result
    }

    fn run_cycle(&self, key: SignalKey, incoming: SignalValue) -> BusResult<()> {
        let value = wave::apply(self, &key, incoming)?;

        trace!(
            bus = %self.inner.config.name,
            key = %key,
            value = %value,
            depth = self.inner.depth.get(),
            "publish"
        );
        let generation = self.inner.store.borrow_mut().set(key.clone(), value.clone());
        self.notify(&key, &value, generation);
        Ok(())
    }

    /// Deliver `value` to a snapshot of the join's subscribers.
    ///
    /// The round stops as soon as the join is written again, e.g. by a
    /// subscriber publishing to it: the newer cycle has already notified
    /// every subscriber, and the rest of this round would leave them on the
    /// older value.
    fn notify(&self, key: &SignalKey, value: &SignalValue, generation: u64) {
        let callbacks = self.inner.registry.borrow().snapshot(key);
        for (id, callback) in callbacks {
            if self.inner.store.borrow().generation(key) != generation {
                trace!(
                    bus = %self.inner.config.name,
                    key = %key,
                    value = %value,
                    "notify superseded"
                );
                break;
            }
            // Removed by an earlier callback in this round.
            if !self.inner.registry.borrow().contains(key, id) {
                continue;
            }
            callback(value);
        }
    }

    /// Install mock behavior for a join.
    ///
    /// `wave: None` keeps any wave already registered. `initial` seeds the
    /// store without notifying anyone.
    pub fn register_mock(
        &self,
        kind: SignalKind,
        address: impl Into<Address>,
        wave: Option<LogicWave>,
        initial: Option<SignalValue>,
    ) -> BusResult<()> {
        let key = SignalKey::new(kind, address);
        if let Some(value) = &initial {
            check_kind(&key, value)?;
        }

        if let Some(wave) = wave {
            let replaced = self.inner.engine.borrow_mut().register(key.clone(), wave);
            debug!(bus = %self.inner.config.name, key = %key, replaced, "logic wave registered");
        }
        if let Some(value) = initial {
            self.inner
                .engine
                .borrow_mut()
                .set_seed(key.clone(), value.clone());
            self.inner.store.borrow_mut().seed(key, value);
        }
        Ok(())
    }

    /// Shorthand for [`MockBus::register_mock`] with a closure.
    pub fn register_wave<F>(
        &self,
        kind: SignalKind,
        address: impl Into<Address>,
        wave: F,
    ) -> BusResult<()>
    where
        F: Fn(SignalValue, &WaveContext<'_>) -> BusResult<Option<SignalValue>> + 'static,
    {
        self.register_mock(kind, address, Some(logic_wave(wave)), None)
    }

    pub fn register_block(
        &self,
        kind: SignalKind,
        address: impl Into<Address>,
        block: LogicBlock,
    ) -> BusResult<()> {
        let address = address.into();
        debug!(
            bus = %self.inner.config.name,
            block = block.name(),
            %kind,
            %address,
            "installing block"
        );
        let wave = block.into_wave(kind)?;
        self.register_mock(kind, address, Some(wave), None)
    }

    pub fn unregister_wave(&self, kind: SignalKind, address: impl Into<Address>) -> bool {
        self.inner
            .engine
            .borrow_mut()
            .unregister(&SignalKey::new(kind, address))
    }

    pub fn has_wave(&self, kind: SignalKind, address: impl Into<Address>) -> bool {
        self.inner
            .engine
            .borrow()
            .has_wave(&SignalKey::new(kind, address))
    }

    /// Add a rule. Rules on the same trigger accumulate and run after its wave.
    pub fn add_rule(&self, rule: MockRule) -> BusResult<()> {
        let key = rule.trigger.key.clone();
        if let Some(default) = &rule.trigger.default_value {
            check_kind(&key, default)?;
        }
        if let Some(effect) = rule.effects.iter().find(|e| e.key == key) {
            return Err(BusError::InvalidConfig {
                what: format!("rule on {key} has an effect on its own trigger {}", effect.key),
            });
        }

        if let Some(default) = rule.trigger.default_value.clone() {
            self.inner
                .engine
                .borrow_mut()
                .set_seed(key.clone(), default.clone());
            self.inner.store.borrow_mut().seed(key.clone(), default);
        }
        debug!(
            bus = %self.inner.config.name,
            trigger = %key,
            effects = rule.effects.len(),
            "rule added"
        );
        self.inner.engine.borrow_mut().add_rule(rule);
        Ok(())
    }

    pub fn clear_rules(&self, kind: SignalKind, address: impl Into<Address>) -> usize {
        self.inner
            .engine
            .borrow_mut()
            .clear_rules(&SignalKey::new(kind, address))
    }

    pub fn rule_count(&self, kind: SignalKind, address: impl Into<Address>) -> usize {
        self.inner
            .engine
            .borrow()
            .rule_count(&SignalKey::new(kind, address))
    }

    /// Every touched join and its value, sorted by kind then address.
    pub fn snapshot(&self) -> Vec<(SignalKey, SignalValue)> {
        self.inner.store.borrow().snapshot()
    }

    /// Forget all values and subscribers, then restore registered initial
    /// values. Waves and rules stay installed.
    pub fn reset(&self) {
        let seeds: Vec<(SignalKey, SignalValue)> = self
            .inner
            .engine
            .borrow()
            .seeds()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.inner.registry.borrow_mut().clear();
        let mut store = self.inner.store.borrow_mut();
        store.clear();
        for (key, value) in seeds {
            store.seed(key, value);
        }
        debug!(bus = %self.inner.config.name, "mock bus reset");
    }

    /// Remove everything: values, subscribers, waves and rules.
    pub fn dispose(&self) {
        self.inner.registry.borrow_mut().clear();
        self.inner.store.borrow_mut().clear();
        self.inner.engine.borrow_mut().clear();
        debug!(bus = %self.inner.config.name, "mock bus disposed");
    }
}

fn check_kind(key: &SignalKey, value: &SignalValue) -> BusResult<()> {
    if value.kind() == key.kind {
        Ok(())
    } else {
        Err(BusError::KindMismatch {
            key: key.clone(),
            expected: key.kind,
            actual: value.kind(),
        })
    }
}

impl fmt::Debug for MockBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBus")
            .field("name", &self.inner.config.name)
            .field("session", &self.inner.session)
            .field("joins", &self.inner.store.borrow().len())
            .field("registry", &*self.inner.registry.borrow())
            .field("engine", &*self.inner.engine.borrow())
            .finish()
    }
}

impl ControlSystem for MockBus {
    fn subscribe_state(
        &self,
        kind: SignalKind,
        address: &Address,
        callback: Callback,
    ) -> SubscriptionId {
        self.subscribe_callback(SignalKey::new(kind, address), callback)
    }

    fn unsubscribe_state(&self, kind: SignalKind, address: &Address, id: SubscriptionId) -> bool {
        self.unsubscribe(kind, address, id)
    }

    fn publish_event(
        &self,
        kind: SignalKind,
        address: &Address,
        value: SignalValue,
    ) -> BusResult<()> {
        self.publish(kind, address, value)
    }

    fn state(&self, kind: SignalKind, address: &Address) -> SignalValue {
        MockBus::state(self, kind, address)
    }

    fn register_mock(
        &self,
        kind: SignalKind,
        address: &Address,
        wave: Option<LogicWave>,
        initial: Option<SignalValue>,
    ) -> BusResult<bool> {
        MockBus::register_mock(self, kind, address, wave, initial)?;
        Ok(true)
    }
}

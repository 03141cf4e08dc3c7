//! Logic waves: per-join transforms emulating the processor program.
//!
//! A logic wave receives the incoming value and a [`WaveContext`] that can
//! read any join and publish to any join. Its return value decides what is
//! stored for its own join:
//!
//! - `Ok(Some(v))` stores `v`
//! - `Ok(None)` abstains: the join keeps its current stored value
//! - `Err(e)` aborts the publish; nothing is stored or notified
//!
//! Writes made through the context are full publish cycles, so they run
//! the target join's own wave and rules. While a join's wave is running,
//! a nested publish to that same join skips the wave and stores the value
//! as given. That is what lets a toggle write its own output.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use jw_core::{Address, SignalKey, SignalKind, SignalValue};
use tracing::debug;

use crate::bus::MockBus;
use crate::error::{BusError, BusResult};
use crate::rules::MockRule;

/// A registered transform.
pub type LogicWave = Rc<dyn Fn(SignalValue, &WaveContext<'_>) -> BusResult<Option<SignalValue>>>;

/// Wrap a closure as a [`LogicWave`].
pub fn logic_wave<F>(f: F) -> LogicWave
where
    F: Fn(SignalValue, &WaveContext<'_>) -> BusResult<Option<SignalValue>> + 'static,
{
    Rc::new(f)
}

/// Read/write access handed to a running wave or rule.
pub struct WaveContext<'a> {
    bus: &'a MockBus,
    key: &'a SignalKey,
}

impl<'a> WaveContext<'a> {
    pub(crate) fn new(bus: &'a MockBus, key: &'a SignalKey) -> Self {
        Self { bus, key }
    }

    /// The join whose wave is running.
    pub fn key(&self) -> &SignalKey {
        self.key
    }

    /// Stored value of the join whose wave is running.
    pub fn current(&self) -> SignalValue {
        self.bus.state_of(self.key)
    }

    pub fn read(&self, kind: SignalKind, address: impl Into<Address>) -> SignalValue {
        self.bus.state(kind, address)
    }

    pub fn read_bool(&self, address: impl Into<Address>) -> bool {
        self.read(SignalKind::Boolean, address)
            .as_bool()
            .unwrap_or_default()
    }

    pub fn read_number(&self, address: impl Into<Address>) -> f64 {
        self.read(SignalKind::Number, address)
            .as_number()
            .unwrap_or_default()
    }

    pub fn read_string(&self, address: impl Into<Address>) -> String {
        match self.read(SignalKind::String, address) {
            SignalValue::String(s) => s,
            _ => String::new(),
        }
    }

    /// Publish to another join (or, from inside its own wave, store to this one).
    pub fn write(
        &self,
        kind: SignalKind,
        address: impl Into<Address>,
        value: impl Into<SignalValue>,
    ) -> BusResult<()> {
        self.bus.publish(kind, address, value)
    }
}

/// Registered waves, rules and initial values.
#[derive(Default)]
pub struct WaveEngine {
    waves: HashMap<SignalKey, LogicWave>,
    rules: HashMap<SignalKey, Vec<Rc<MockRule>>>,
    seeds: HashMap<SignalKey, SignalValue>,
    active: HashSet<SignalKey>,
}

impl WaveEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wave; returns `true` if it replaced an earlier one.
    pub fn register(&mut self, key: SignalKey, wave: LogicWave) -> bool {
        self.waves.insert(key, wave).is_some()
    }

    pub fn unregister(&mut self, key: &SignalKey) -> bool {
        self.waves.remove(key).is_some()
    }

    pub fn wave(&self, key: &SignalKey) -> Option<LogicWave> {
        self.waves.get(key).cloned()
    }

    pub fn has_wave(&self, key: &SignalKey) -> bool {
        self.waves.contains_key(key)
    }

    pub fn add_rule(&mut self, rule: MockRule) {
        self.rules
            .entry(rule.trigger.key.clone())
            .or_default()
            .push(Rc::new(rule));
    }

    pub fn rules(&self, key: &SignalKey) -> Vec<Rc<MockRule>> {
        self.rules.get(key).cloned().unwrap_or_default()
    }

    pub fn rule_count(&self, key: &SignalKey) -> usize {
        self.rules.get(key).map_or(0, Vec::len)
    }

    /// Remove every rule triggered by `key`; returns how many were removed.
    pub fn clear_rules(&mut self, key: &SignalKey) -> usize {
        self.rules.remove(key).map_or(0, |r| r.len())
    }

    /// Remember an initial value so a reset can restore it.
    pub fn set_seed(&mut self, key: SignalKey, value: SignalValue) {
        self.seeds.insert(key, value);
    }

    pub fn seeds(&self) -> impl Iterator<Item = (&SignalKey, &SignalValue)> {
        self.seeds.iter()
    }

    pub fn is_active(&self, key: &SignalKey) -> bool {
        self.active.contains(key)
    }

    pub fn clear(&mut self) {
        self.waves.clear();
        self.rules.clear();
        self.seeds.clear();
        self.active.clear();
    }
}

impl fmt::Debug for WaveEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveEngine")
            .field("waves", &self.waves.len())
            .field("rules", &self.rules.values().map(Vec::len).sum::<usize>())
            .field("seeds", &self.seeds.len())
            .field("active", &self.active)
            .finish()
    }
}

/// Marks a join's wave as running for the guard's lifetime.
struct ActiveGuard<'a> {
    engine: &'a RefCell<WaveEngine>,
    key: SignalKey,
}

impl<'a> ActiveGuard<'a> {
    fn enter(engine: &'a RefCell<WaveEngine>, key: SignalKey) -> Self {
        engine.borrow_mut().active.insert(key.clone());
        Self { engine, key }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.engine.borrow_mut().active.remove(&self.key);
    }
}

/// Step 1 of the publish cycle: compute the value to store for `key`.
///
/// Without a wave or rules this is the identity.
pub(crate) fn apply(
    bus: &MockBus,
    key: &SignalKey,
    incoming: SignalValue,
) -> BusResult<SignalValue> {
    let (wave, rules) = {
        let engine = bus.engine().borrow();
        if engine.is_active(key) {
            debug!(key = %key, "nested publish to a running wave; storing as given");
            return Ok(incoming);
        }
        (engine.wave(key), engine.rules(key))
    };
    if wave.is_none() && rules.is_empty() {
        return Ok(incoming);
    }

    let _active = ActiveGuard::enter(bus.engine(), key.clone());
    let ctx = WaveContext::new(bus, key);

    let value = match wave {
        Some(wave) => match wave(incoming, &ctx)? {
            Some(value) => value,
            None => bus.state_of(key),
        },
        None => incoming,
    };

    if value.kind() != key.kind {
        return Err(BusError::KindMismatch {
            key: key.clone(),
            expected: key.kind,
            actual: value.kind(),
        });
    }

    for rule in &rules {
        rule.fire(&value, &ctx)?;
    }

    Ok(value)
}

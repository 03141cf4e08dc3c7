//! Current-value table.

use std::collections::HashMap;

use jw_core::{SignalKey, SignalKind, SignalValue};

/// Authoritative current value of every touched join.
///
/// Reads of an untouched join return the kind's default value; entries are
/// never evicted.
///
/// Every write stamps its join with a generation drawn from one counter
/// per store, so a generation is never reused, even across [`SignalStore::clear`].
#[derive(Debug, Clone, Default)]
pub struct SignalStore {
    values: HashMap<SignalKey, SignalValue>,
    generations: HashMap<SignalKey, u64>,
    next_generation: u64,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, or the kind's default if nothing was stored yet.
    pub fn get(&self, key: &SignalKey) -> SignalValue {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.kind.default_value())
    }

    /// Overwrite (or create) an entry; returns the write's generation.
    pub fn set(&mut self, key: SignalKey, value: SignalValue) -> u64 {
        self.next_generation += 1;
        self.generations.insert(key.clone(), self.next_generation);
        self.values.insert(key, value);
        self.next_generation
    }

    /// Seed a non-default initial value from a mock registration.
    ///
    /// Stamped like [`SignalStore::set`], so a notify round still running
    /// for this join stops instead of delivering the value it replaced.
    pub fn seed(&mut self, key: SignalKey, value: SignalValue) {
        self.set(key, value);
    }

    /// Generation of the last write to `key`; `0` if never written.
    pub fn generation(&self, key: &SignalKey) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }

    /// Create the entry with its default value if it does not exist yet.
    pub fn touch(&mut self, key: &SignalKey) {
        if !self.values.contains_key(key) {
            self.values.insert(key.clone(), key.kind.default_value());
        }
    }

    pub fn contains(&self, key: &SignalKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All entries sorted by kind then address.
    pub fn snapshot(&self) -> Vec<(SignalKey, SignalValue)> {
        let mut entries: Vec<(SignalKey, SignalValue)> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Entries of one kind, sorted by address.
    pub fn snapshot_kind(&self, kind: SignalKind) -> Vec<(SignalKey, SignalValue)> {
        self.snapshot()
            .into_iter()
            .filter(|(k, _)| k.kind == kind)
            .collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.generations.clear();
    }
}

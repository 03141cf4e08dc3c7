//! Subscriber bookkeeping.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use jw_core::{SignalKey, SignalValue, SubscriptionId};

/// Value-changed callback.
pub type Callback = Rc<dyn Fn(&SignalValue)>;

/// Callbacks per join, kept in registration order.
///
/// Ids are unique across the whole registry, never reused, and increase
/// with registration order.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: u64,
    subscribers: HashMap<SignalKey, Vec<(SubscriptionId, Callback)>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback and return its handle.
    pub fn insert(&mut self, key: SignalKey, callback: Callback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId::new(self.next_id);
        self.subscribers.entry(key).or_default().push((id, callback));
        id
    }

    /// Remove exactly one callback. Returns `false` if it was not registered.
    pub fn remove(&mut self, key: &SignalKey, id: SubscriptionId) -> bool {
        let Some(list) = self.subscribers.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub_id, _)| *sub_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.subscribers.remove(key);
        }
        removed
    }

    pub fn contains(&self, key: &SignalKey, id: SubscriptionId) -> bool {
        self.subscribers
            .get(key)
            .is_some_and(|list| list.iter().any(|(sub_id, _)| *sub_id == id))
    }

    /// Copy of the current callbacks for `key`, in registration order.
    ///
    /// Notification iterates this copy so callbacks may subscribe or
    /// unsubscribe while it runs.
    pub fn snapshot(&self, key: &SignalKey) -> Vec<(SubscriptionId, Callback)> {
        self.subscribers.get(key).cloned().unwrap_or_default()
    }

    pub fn count(&self, key: &SignalKey) -> usize {
        self.subscribers.get(key).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.subscribers.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("next_id", &self.next_id)
            .field("joins", &self.subscribers.len())
            .field("callbacks", &self.total())
            .finish()
    }
}

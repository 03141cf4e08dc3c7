//! Virtual millisecond clock for deferred publishes.
//!
//! Debounce and reset-after effects never sleep. They schedule tasks on a
//! [`Timeline`], and whoever drives the session (a test, the CLI script
//! runner) advances the clock explicitly.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

/// Handle of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId {
    due: u64,
    seq: u64,
}

impl TimerId {
    /// Virtual time (ms) at which the task runs.
    pub fn due(&self) -> u64 {
        self.due
    }
}

#[derive(Default)]
struct TimelineInner {
    now: u64,
    next_seq: u64,
    queue: BTreeMap<TimerId, Task>,
}

/// Shared virtual clock. Clones refer to the same clock.
#[derive(Clone, Default)]
pub struct Timeline {
    inner: Rc<RefCell<TimelineInner>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.inner.borrow().now
    }

    /// Run `task` once `delay_ms` of virtual time has passed.
    ///
    /// Tasks due at the same time run in scheduling order.
    pub fn schedule<F>(&self, delay_ms: u64, task: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner.next_seq += 1;
        let id = TimerId {
            due: inner.now.saturating_add(delay_ms),
            seq: inner.next_seq,
        };
        inner.queue.insert(id, Box::new(task));
        id
    }

    /// Drop a pending task. Returns `false` if it already ran or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.inner.borrow_mut().queue.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.inner.borrow().queue.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Due time of the earliest pending task.
    pub fn next_due(&self) -> Option<u64> {
        self.inner.borrow().queue.keys().next().map(TimerId::due)
    }

    /// Advance the clock by `ms`; returns how many tasks ran.
    pub fn advance_by(&self, ms: u64) -> usize {
        let target = self.now().saturating_add(ms);
        self.advance_to(target)
    }

    /// Run every task due at or before `time`, in time order, then set the
    /// clock to `time`. Tasks scheduled by running tasks are included when
    /// they fall due in the window. Moving backwards does nothing.
    pub fn advance_to(&self, time: u64) -> usize {
        let mut ran = 0;
        loop {
            let task = {
                let mut inner = self.inner.borrow_mut();
                match inner.queue.first_key_value() {
                    Some((id, _)) if id.due <= time => {
                        let id = *id;
                        inner.now = inner.now.max(id.due);
                        inner.queue.remove(&id)
                    }
                    _ => None,
                }
            };
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        let mut inner = self.inner.borrow_mut();
        inner.now = inner.now.max(time);
        ran
    }

    /// Run everything still queued, however far in the future.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(due) = self.next_due() {
            ran += self.advance_to(due);
        }
        ran
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Timeline")
            .field("now", &inner.now)
            .field("pending", &inner.queue.len())
            .finish()
    }
}

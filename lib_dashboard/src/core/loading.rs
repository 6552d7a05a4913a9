//! # Loading Tracker
//!
//! Counts named operations that are currently busy. Every `start`/`stop`
//! notifies subscribers with a copy of the whole loading set, which is what a
//! spinner or progress indicator needs.
//!
//! A key is active iff it is present and `true`; `stop` removes the key, so
//! the set only ever holds what is running. Plain `start`/`stop` are
//! idempotent. Guards from [`LoadingTracker::track`] are counted per key
//! instead: the key stays active until the last guard holding it is dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::core::observers::{Observers, Subscription};

/// Operation key → active flag.
pub type LoadingSet = BTreeMap<String, bool>;

#[derive(Default)]
struct Inner {
    states: LoadingSet,
    // Live guards per key.
    holders: HashMap<String, usize>,
}

pub struct LoadingTracker {
    inner: Mutex<Inner>,
    observers: Observers<LoadingSet>,
}

impl LoadingTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            observers: Observers::new(),
        }
    }

    /// Marks `key` active. Starting an already active key does not double count.
    pub fn start(&self, key: &str) {
        self.update(key, true);
    }

    /// Marks `key` inactive, whatever guards still hold it.
    pub fn stop(&self, key: &str) {
        self.update(key, false);
    }

    /// Marks `key` active until every guard returned for it has been dropped.
    pub fn track(&self, key: &str) -> LoadingGuard<'_> {
        {
            let mut inner = self.inner.lock().expect("Loading tracker lock poisoned");
            *inner.holders.entry(key.to_string()).or_insert(0) += 1;
        }
        self.start(key);
        LoadingGuard {
            tracker: self,
            key: key.to_string(),
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        let inner = self.inner.lock().expect("Loading tracker lock poisoned");
        inner.states.get(key).copied().unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        let inner = self.inner.lock().expect("Loading tracker lock poisoned");
        inner.states.values().filter(|active| **active).count()
    }

    pub fn snapshot(&self) -> LoadingSet {
        self.inner
            .lock()
            .expect("Loading tracker lock poisoned")
            .states
            .clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LoadingSet) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    fn update(&self, key: &str, active: bool) {
        let snapshot = {
            let mut inner = self.inner.lock().expect("Loading tracker lock poisoned");
            if active {
                inner.states.insert(key.to_string(), true);
            } else {
                inner.states.remove(key);
                inner.holders.remove(key);
            }
            inner.states.clone()
        };
        log::trace!("loading '{}' -> {}", key, active);
        self.observers.notify(&snapshot);
    }

    fn release(&self, key: &str) {
        let last = {
            let mut inner = self.inner.lock().expect("Loading tracker lock poisoned");
            match inner.holders.get_mut(key) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                // Last holder, or the key was already stopped explicitly.
                Some(_) => true,
                None => false,
            }
        };
        if last {
            self.stop(key);
        }
    }
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases its hold on the tracked key when dropped, including when the
/// owning future is abandoned mid-flight.
pub struct LoadingGuard<'a> {
    tracker: &'a LoadingTracker,
    key: String,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.tracker.release(&self.key);
    }
}

//! # Synchronous Subscriber List
//!
//! A small fan-out used by the state store and the loading tracker. Listeners
//! are plain callbacks, invoked synchronously and in subscription order every
//! time the owner calls [`Observers::notify`].
//!
//! The list is cloned out of the lock before any listener runs, so a listener
//! may subscribe, unsubscribe or read the owning store without deadlocking.
//! Each owner keeps its own list; there is no process-wide listener registry.

use std::sync::{Arc, Mutex, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerHandle<T> {
    id: u64,
    callback: Listener<T>,
}

struct ObserverList<T> {
    next_id: u64,
    listeners: Vec<ListenerHandle<T>>,
}

/// Ordered list of listeners receiving `&T` on every notification.
pub struct Observers<T> {
    list: Arc<Mutex<ObserverList<T>>>,
}

impl<T: 'static> Observers<T> {
    pub fn new() -> Self {
        Self {
            list: Arc::new(Mutex::new(ObserverList {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Registers `listener` at the end of the list.
    ///
    /// The returned [`Subscription`] removes it again. Dropping the
    /// subscription without calling `unsubscribe` keeps the listener alive for
    /// the lifetime of the owner.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut list = self.list.lock().expect("Observer list lock poisoned");
        let id = list.next_id;
        list.next_id += 1;
        list.listeners.push(ListenerHandle {
            id,
            callback: Arc::new(listener),
        });

        let weak: Weak<Mutex<ObserverList<T>>> = Arc::downgrade(&self.list);
        Subscription::new(move || {
            if let Some(list) = weak.upgrade() {
                let mut list = list.lock().expect("Observer list lock poisoned");
                list.listeners.retain(|handle| handle.id != id);
            }
        })
    }

    /// Calls every current listener with `value`.
    pub fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = {
            let list = self.list.lock().expect("Observer list lock poisoned");
            list.listeners
                .iter()
                .map(|handle| Arc::clone(&handle.callback))
                .collect()
        };

        for listener in listeners {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.list.lock().expect("Observer list lock poisoned").listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`; call [`Subscription::unsubscribe`] to stop
/// receiving notifications.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_run_in_subscription_order() {
        let observers = Observers::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            let _ = observers.subscribe(move |v: &u32| seen.lock().unwrap().push(format!("{tag}{v}")));
        }

        observers.notify(&1);
        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let observers = Observers::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let seen = Arc::clone(&seen);
            observers.subscribe(move |v: &u32| seen.lock().unwrap().push(("first", *v)))
        };
        let _second = {
            let seen = Arc::clone(&seen);
            observers.subscribe(move |v: &u32| seen.lock().unwrap().push(("second", *v)))
        };

        observers.notify(&1);
        first.unsubscribe();
        observers.notify(&2);

        assert_eq!(observers.len(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 1), ("second", 1), ("second", 2)]
        );
    }

    #[test]
    fn listener_may_subscribe_during_notification() {
        let observers = Arc::new(Observers::<u32>::new());
        let inner = Arc::clone(&observers);

        let _ = observers.subscribe(move |_| {
            let _ = inner.subscribe(|_| {});
        });

        observers.notify(&0);
        assert_eq!(observers.len(), 2);
    }
}

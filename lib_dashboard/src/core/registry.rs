//! # Request Registry
//!
//! Tracks in-flight requests by a caller-chosen id. Starting a request under an
//! id that is still running cancels the older one first (last writer wins), so
//! at most one request per id is ever live.
//!
//! A cancelled request resolves to `Ok(None)` for its caller. Cancellation is
//! not an error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

pub struct RequestRegistry {
    requests: Mutex<HashMap<String, InFlight>>,
    next_generation: AtomicU64,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Runs `request` as the live request for `id`.
    ///
    /// `request` receives the token that cancels it, so it can pass the token
    /// further down (e.g. into [`fetch_with_retry`](crate::retrieve::resilient::fetch_with_retry)).
    /// Whatever the request does with it, the registry stops polling it as soon
    /// as the token fires.
    ///
    /// # Returns
    /// - `Ok(Some(value))` when the request completed.
    /// - `Ok(None)` when it was superseded or cancelled.
    /// - `Err(e)` when it failed on its own.
    pub async fn start<T, E, F, Fut>(&self, id: &str, request: F) -> Result<Option<T>, E>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let token = CancellationToken::new();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        {
            let mut requests = self.requests.lock().expect("Registry lock poisoned");
            let previous = requests.insert(
                id.to_string(),
                InFlight {
                    generation,
                    token: token.clone(),
                },
            );
            if let Some(previous) = previous {
                previous.token.cancel();
                log::debug!("Superseded in-flight request '{}'", id);
            }
        }

        let _release = Release {
            registry: self,
            id,
            generation,
        };

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            res = request(token.clone()) => Some(res),
        };

        match outcome {
            None => Ok(None),
            Some(_) if token.is_cancelled() => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(err)) => Err(err),
        }
    }

    /// Cancels the live request for `id`. Returns whether one existed.
    pub fn cancel(&self, id: &str) -> bool {
        let mut requests = self.requests.lock().expect("Registry lock poisoned");
        match requests.remove(id) {
            Some(entry) => {
                entry.token.cancel();
                log::debug!("Cancelled request '{}'", id);
                true
            }
            None => false,
        }
    }

    /// Cancels every tracked request and empties the registry.
    pub fn cancel_all(&self) {
        let mut requests = self.requests.lock().expect("Registry lock poisoned");
        let count = requests.len();
        for (_, entry) in requests.drain() {
            entry.token.cancel();
        }
        if count > 0 {
            log::info!("Cancelled {} in-flight request(s)", count);
        }
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.requests
            .lock()
            .expect("Registry lock poisoned")
            .contains_key(id)
    }

    /// Ids of all live requests, sorted.
    pub fn in_flight(&self) -> Vec<String> {
        let requests = self.requests.lock().expect("Registry lock poisoned");
        let mut ids: Vec<String> = requests.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.requests.lock().expect("Registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Only removes the entry if it still belongs to `generation`; a superseded
    // request must not evict its successor.
    fn release(&self, id: &str, generation: u64) {
        let mut requests = self.requests.lock().expect("Registry lock poisoned");
        if requests.get(id).map(|e| e.generation) == Some(generation) {
            requests.remove(id);
        }
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct Release<'a> {
    registry: &'a RequestRegistry,
    id: &'a str,
    generation: u64,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.registry.release(self.id, self.generation);
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-flight registry
//!
//! Collapses concurrent requests for the same key into one shared pending
//! operation. `run` is synchronous: the pending future is registered before
//! the caller reaches its first `.await`, so every caller that arrives while
//! the operation is outstanding observes and awaits the same future.
//!
//! The entry is removed by the operation itself when it completes, success
//! or failure, so a failed attempt is never replayed to later callers.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A pending operation that any number of callers can await
pub type SharedResult<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Flight<T, E> {
    id: u64,
    future: SharedResult<T, E>,
}

pub struct SingleFlight<K, T, E> {
    flights: Arc<Mutex<HashMap<K, Flight<T, E>>>>,
    next_id: AtomicU64,
}

impl<K, T, E> SingleFlight<K, T, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the in-flight operation for `key`, or start one with `start`
    ///
    /// `start` is only invoked when no operation is pending and must not call
    /// back into this registry.
    pub fn run<F, Fut>(&self, key: K, start: F) -> SharedResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut flights = self.flights.lock();
        if let Some(flight) = flights.get(&key) {
            return flight.future.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.flights);
        let cleanup_key = key.clone();
        let work = start();

        let future = async move {
            let result = work.await;
            let mut flights = registry.lock();
            // a forget() followed by a new flight must not be evicted by the old one
            if flights.get(&cleanup_key).map(|f| f.id) == Some(id) {
                flights.remove(&cleanup_key);
            }
            result
        }
        .boxed()
        .shared();

        flights.insert(
            key,
            Flight {
                id,
                future: future.clone(),
            },
        );
        future
    }

    /// Drop the pending entry for `key`; current awaiters still complete
    pub fn forget(&self, key: &K) -> bool {
        self.flights.lock().remove(key).is_some()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.flights.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.flights.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T, E> Default for SingleFlight<K, T, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

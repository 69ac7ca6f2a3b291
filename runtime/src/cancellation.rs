//! Registry of in-flight cancellable effects
//!
//! Each [`EffectId`] owns at most one running task. Spawning under an id that
//! is still running aborts the older task first, which is what gives
//! `Effect::Cancellable` its latest-wins behaviour.

use shopfront_core::effect::EffectId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{AbortHandle, JoinHandle};

#[derive(Debug)]
struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

/// Tracks the running task for every cancellation id of a store
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    entries: Arc<Mutex<HashMap<EffectId, InFlight>>>,
    next_generation: Arc<AtomicU64>,
}

impl CancellationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` under `id`, aborting the task previously registered
    /// under the same id
    ///
    /// The entry is removed when the task completes; an entry that was
    /// replaced in the meantime is left alone.
    pub fn spawn<F>(&self, id: EffectId, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let registry = self.clone();

        // Spawn and insert under the lock so a fast task cannot finish
        // before its entry exists.
        let mut entries = self.lock();
        if let Some(previous) = entries.remove(&id) {
            previous.abort.abort();
            tracing::debug!(effect_id = %id, "Superseded in-flight effect");
            metrics::counter!("store.effects.cancelled", "reason" => "superseded").increment(1);
        }

        let handle = tokio::spawn(async move {
            future.await;
            registry.finish(id, generation);
        });
        entries.insert(
            id,
            InFlight {
                generation,
                abort: handle.abort_handle(),
            },
        );

        handle
    }

    /// Abort every registered task, returning how many were running
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        for (id, in_flight) in &drained {
            in_flight.abort.abort();
            tracing::debug!(effect_id = %id, "Cancelled in-flight effect");
        }
        if !drained.is_empty() {
            metrics::counter!("store.effects.cancelled", "reason" => "teardown")
                .increment(drained.len() as u64);
        }
        drained.len()
    }

    /// Whether a task is currently registered under `id`
    #[must_use]
    pub fn is_in_flight(&self, id: EffectId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of registered tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no task is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn finish(&self, id: EffectId, generation: u64) {
        let mut entries = self.lock();
        if entries.get(&id).is_some_and(|entry| entry.generation == generation) {
            entries.remove(&id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EffectId, InFlight>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

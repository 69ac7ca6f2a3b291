//! # Shopfront Runtime
//!
//! Runtime implementation for the Shopfront reducer architecture.
//!
//! This crate provides the [`Store`] that coordinates reducer execution,
//! publishes every new state to subscribers and executes effects.
//!
//! ## Core Components
//!
//! - **Store**: owns state, serializes reducer execution, runs effects
//! - **State stream**: [`Store::subscribe`] hands out a `watch` receiver that
//!   always holds the latest state; new subscribers see the current value
//!   immediately
//! - **Cancellation**: `Effect::Cancellable` tasks are registered by id so a
//!   newer effect aborts a stale one
//! - **Subscriptions**: [`Store::forward`] feeds another stream into a store
//!   and returns a [`Subscription`] that stops forwarding when dropped
//!
//! ## Example
//!
//! ```ignore
//! use shopfront_runtime::Store;
//!
//! let store = Store::new(ShoppingCart::default(), CartReducer::new(), environment);
//!
//! let mut cart = store.subscribe();
//! store.send(CartAction::Empty).await?;
//!
//! let gross_total = cart.borrow().gross_total;
//! ```

use shopfront_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Registry of in-flight cancellable effects
pub mod cancellation;

/// RAII subscription handles
pub mod subscription;

pub use cancellation::CancellationRegistry;
pub use error::StoreError;
pub use store::Store;
pub use subscription::Subscription;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned by `send()` after `shutdown()` was initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for effects or for a state
        #[error("Timed out waiting for the store")]
        Timeout,

        /// The store's state channel closed
        #[error("State channel closed")]
        ChannelClosed,
    }
}

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use shopfront_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default().with_shutdown_timeout(Duration::from_secs(2));
///
/// assert_eq!(config.default_shutdown_timeout, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(default_shutdown_timeout: Duration) -> Self {
        Self {
            default_shutdown_timeout,
        }
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects produced
/// directly by that action. Effects started by feedback actions are not
/// tracked.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(CheckoutAction::Retry).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracker) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracker = EffectTracker {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracker)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracker) = Self::new();
        handle
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all tracked effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires first.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: counts the running effects of one `send()`
#[derive(Clone)]
struct EffectTracker {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracker {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the tracker on drop
///
/// Also runs when the effect task is aborted.
struct TrackerGuard(EffectTracker);

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, CancellationRegistry, Duration, Effect,
        EffectHandle, EffectTracker, Ordering, Reducer, RwLock, StoreConfig, StoreError,
        Subscription, TrackerGuard,
    };
    use shopfront_core::effect::EffectId;
    use std::future::Future;
    use std::pin::Pin;
    use tokio::sync::watch;
    use tokio::task::JoinHandle;

    type BoxedRun = Pin<Box<dyn Future<Output = ()> + Send>>;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, so reducer runs are serialized)
    /// 2. A `watch` channel carrying the latest state to subscribers
    /// 3. Reducer and environment
    /// 4. Effect execution, including the cancellation registry
    ///
    /// Cloning a store is cheap and yields a handle to the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        state_tx: Arc<watch::Sender<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        cancellations: CancellationRegistry,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Clone + Send + 'static,
        S: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        #[must_use]
        pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
            let (state_tx, _) = watch::channel(initial_state.clone());

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                state_tx: Arc::new(state_tx),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellations: CancellationRegistry::new(),
            }
        }

        /// The configuration this store was built with
        #[must_use]
        pub const fn config(&self) -> &StoreConfig {
            &self.config
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Publishes the new state to subscribers while still holding the lock,
        ///    so subscribers observe states in reducer order
        /// 4. Starts the returned effects on spawned tasks
        ///
        /// `send()` returns after the effects were started, not after they
        /// completed; use the returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::debug!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.total").increment(1);

            let mut state = self.state.write().await;

            let start = std::time::Instant::now();
            let effects = self.reducer.reduce(&mut state, action, &self.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());

            self.state_tx.send_replace(state.clone());

            tracing::trace!("Reducer completed, returned {} effects", effects.len());

            // Effects start before the lock is released so cancellable
            // effects are registered in reducer order.
            let (handle, tracker) = EffectHandle::new();
            for effect in effects {
                self.execute_effect(effect, &tracker);
            }
            drop(state);

            Ok(handle)
        }

        /// Subscribe to the state stream
        ///
        /// The receiver holds the current state immediately and is updated
        /// after every reducer run.
        #[must_use]
        pub fn subscribe(&self) -> watch::Receiver<S> {
            self.state_tx.subscribe()
        }

        /// Feed a state stream from elsewhere into this store
        ///
        /// The current value of `source` is sent right away, then one action per
        /// change. Intermediate values that arrive while an action is being
        /// processed are coalesced by the `watch` channel, so the store always
        /// catches up with the most recent value.
        ///
        /// Forwarding stops when the returned [`Subscription`] is dropped or
        /// unsubscribed, when `source` closes, or when this store shuts down.
        pub fn forward<T, F>(
            &self,
            name: &'static str,
            mut source: watch::Receiver<T>,
            into_action: F,
        ) -> Subscription
        where
            T: Clone + Send + Sync + 'static,
            F: Fn(T) -> A + Send + Sync + 'static,
        {
            let store = self.clone();
            let task = tokio::spawn(async move {
                loop {
                    let value = source.borrow_and_update().clone();
                    if let Err(error) = store.send(into_action(value)).await {
                        tracing::debug!(subscription = name, %error, "Stopped forwarding");
                        break;
                    }
                    if source.changed().await.is_err() {
                        tracing::debug!(subscription = name, "Source closed");
                        break;
                    }
                }
            });

            tracing::debug!(subscription = name, "Subscribed");
            Subscription::new(name, task)
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let line_count = store.state(|s| s.lines.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Abort every in-flight cancellable effect
        pub fn cancel_all(&self) -> usize {
            self.cancellations.cancel_all()
        }

        /// Whether a cancellable effect is running under `id`
        #[must_use]
        pub fn is_in_flight(&self, id: EffectId) -> bool {
            self.cancellations.is_in_flight(id)
        }

        /// Number of effects currently running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Whether `shutdown()` has been initiated
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown
        ///
        /// New actions are rejected from now on (effects still running can no
        /// longer feed actions back). Waits for pending effects to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when the timeout expires.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::debug!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::debug!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Start an effect on its own task, tracked by `tracker`
        fn execute_effect(&self, effect: Effect<A>, tracker: &EffectTracker) {
            let run = match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                    return;
                },
                // Registered right away rather than from the spawned task, so a
                // later send cannot be overtaken by an earlier one.
                Effect::Cancellable { id, effect } => {
                    metrics::counter!("store.effects.executed", "type" => "cancellable").increment(1);
                    let task = self.cancellations.spawn(id, self.run_effect(*effect));
                    Box::pin(await_cancellable(id, task)) as BoxedRun
                },
                effect => self.run_effect(effect),
            };

            tracker.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let tracker_guard = TrackerGuard(tracker.clone());
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            tokio::spawn(async move {
                let _tracker_guard = tracker_guard;
                let _pending_guard = pending_guard;
                run.await;
            });
        }

        /// Interpret an effect to completion
        ///
        /// Reducer panics propagate; effect failures are logged and never
        /// halt the store.
        fn run_effect(&self, effect: Effect<A>) -> BoxedRun {
            let store = self.clone();
            Box::pin(async move {
                match effect {
                    Effect::None => {},
                    Effect::Future(fut) => {
                        metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                        if let Some(action) = fut.await {
                            store.feed_back(action).await;
                        }
                    },
                    Effect::Cancellable { id, effect } => {
                        metrics::counter!("store.effects.executed", "type" => "cancellable").increment(1);
                        let task = store.cancellations.spawn(id, store.run_effect(*effect));
                        await_cancellable(id, task).await;
                    },
                }
            })
        }

        /// Send an effect-produced action back into the store
        async fn feed_back(&self, action: A) {
            if let Err(error) = self.send(action).await {
                tracing::debug!(%error, "Dropped action produced by effect");
            }
        }
    }

    async fn await_cancellable(id: EffectId, task: JoinHandle<()>) {
        match task.await {
            Ok(()) => {},
            Err(error) if error.is_cancelled() => {
                tracing::trace!(effect_id = %id, "Cancellable effect aborted");
            },
            Err(error) => {
                tracing::error!(effect_id = %id, %error, "Cancellable effect failed");
            },
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                state_tx: Arc::clone(&self.state_tx),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                config: self.config,
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellations: self.cancellations.clone(),
            }
        }
    }
}

//! # Shopfront Testing
//!
//! Testing utilities and helpers for the Shopfront reducer architecture.
//!
//! This crate provides:
//! - Mock implementations of environment traits ([`FixedClock`])
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Helpers for waiting on store state and driving effects by hand
//!
//! ## Example
//!
//! ```ignore
//! use shopfront_testing::{test_clock, wait_for_state};
//!
//! #[tokio::test]
//! async fn test_checkout_joins_cart() {
//!     let view = CheckoutView::activate(cart.clone(), sources, config).await?;
//!     let mut state = view.subscribe();
//!
//!     cart.add_item(&product, 2).await?;
//!
//!     let state = wait_for_state(&mut state, Duration::from_secs(1), |s| s.lines.len() == 1)
//!         .await
//!         .expect("cart lines should be joined");
//!     assert_eq!(state.item_count, 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use shopfront_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, so `updated_at` stamps are reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use shopfront_testing::mocks::FixedClock;
    /// use shopfront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use futures::future::{BoxFuture, FutureExt};
    use shopfront_core::effect::Effect;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Wait until the published state satisfies `predicate`
    ///
    /// The current value is checked first. Returns `None` on timeout or when
    /// the store is gone.
    pub async fn wait_for_state<S, F>(
        rx: &mut watch::Receiver<S>,
        timeout: Duration,
        predicate: F,
    ) -> Option<S>
    where
        S: Clone,
        F: FnMut(&S) -> bool,
    {
        match tokio::time::timeout(timeout, rx.wait_for(predicate)).await {
            Ok(Ok(state)) => Some(state.clone()),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Run an effect without a store and collect the actions it produces
    ///
    /// Cancellable effects run like plain ones. Meant for reducer unit tests
    /// that want to look at what an effect would feed back.
    pub fn collect_actions<A: Send + 'static>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>> {
        async move {
            match effect {
                Effect::None => Vec::new(),
                Effect::Future(fut) => fut.await.into_iter().collect(),
                Effect::Cancellable { effect, .. } => collect_actions(*effect).await,
            }
        }
        .boxed()
    }
}

pub use helpers::{collect_actions, wait_for_state};
pub use mocks::{FixedClock, test_clock};

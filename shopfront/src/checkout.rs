//! Checkout view: cart aggregation and payment flow
//!
//! Every cart emission bumps the view's revision and starts a fresh catalog
//! fetch as a cancellable effect. A newer emission aborts the fetch still in
//! flight, and a catalog that arrives for an older revision is discarded, so
//! the displayed lines are never computed against a stale cart.
//!
//! The gross total is never recomputed here: it is read from the cart store's
//! own value through a receiver the view keeps for its whole lifetime.

use crate::cart::ShoppingCartStore;
use crate::error::CheckoutResult;
use crate::money::Money;
use crate::payment::{
    ApprovalData, AuthorizationData, CancelData, ClickData, OrderRequest, PaymentCallbacks,
    PaymentConfig, PaymentEvent, PaymentFuture, PaymentStatus, build_order,
};
use crate::sources::{CatalogSource, DeliveryOptionSource};
use crate::types::{CartItem, CartLine, DeliveryOption, Product, ProductId, ShoppingCart};
use crate::view::Loadable;
use shopfront_core::effect::{Effect, EffectId};
use shopfront_core::{SmallVec, cancellable_effect, reducer::Reducer, smallvec};
use shopfront_runtime::{Store, StoreConfig, StoreError, Subscription};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Effect id of the catalog fetch backing the cart join
pub const JOIN_CART_LINES: EffectId = EffectId::new("checkout.join_cart_lines");

/// Effect id of the delivery option fetch
pub const LOAD_DELIVERY_OPTIONS: EffectId = EffectId::new("checkout.load_delivery_options");

// ============================================================================
// Join
// ============================================================================

/// Result of joining cart lines with the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Joined lines, in cart order
    pub lines: Vec<CartLine>,
    /// Product ids of cart lines absent from the catalog, in cart order
    pub missing: Vec<ProductId>,
}

/// Join cart items with catalog products
///
/// Items whose product is not in `products` are left out of `lines` and
/// listed in `missing`.
#[must_use]
pub fn join_cart_lines(items: &[CartItem], products: &[Product]) -> JoinOutcome {
    let catalog: HashMap<&ProductId, &Product> =
        products.iter().map(|product| (&product.id, product)).collect();

    let mut outcome = JoinOutcome::default();
    for item in items {
        match catalog.get(&item.product_id) {
            Some(product) => outcome.lines.push(CartLine {
                item: item.clone(),
                product: (*product).clone(),
                total_cost: product.price.saturating_mul(item.quantity),
            }),
            None => outcome.missing.push(item.product_id.clone()),
        }
    }
    outcome
}

// ============================================================================
// State & actions
// ============================================================================

/// State of the checkout view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutState {
    /// Bumped on every cart emission and retry
    pub revision: u64,
    /// Cart as of the last emission
    pub cart: ShoppingCart,
    /// Sum of quantities of the last emission
    pub item_count: u64,
    /// Display lines, in cart order
    pub lines: Vec<CartLine>,
    /// Revision `lines` were computed for
    pub lines_revision: u64,
    /// Cart products the catalog did not know
    pub missing_products: Vec<ProductId>,
    /// A catalog fetch is in flight
    pub joining: bool,
    /// Catalog failure of the current revision
    pub error: Option<String>,
    /// Delivery options to choose from
    pub delivery_options: Loadable<Vec<DeliveryOption>>,
    /// Current payment attempt
    pub payment: PaymentStatus,
}

impl CheckoutState {
    /// Whether `lines` reflect the latest cart emission
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !self.joining && self.lines_revision == self.revision
    }
}

/// Actions of the checkout view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutAction {
    /// The cart store published a new cart
    CartUpdated {
        /// The new cart
        cart: ShoppingCart,
    },
    /// Catalog fetched for `revision`
    CatalogFetched {
        /// Revision the fetch was started for
        revision: u64,
        /// Every available product
        products: Vec<Product>,
    },
    /// Catalog fetch for `revision` failed
    CatalogFailed {
        /// Revision the fetch was started for
        revision: u64,
        /// Why
        reason: String,
    },
    /// Fetch the delivery options
    LoadDeliveryOptions,
    /// Delivery options arrived
    DeliveryOptionsLoaded {
        /// Every available option
        options: Vec<DeliveryOption>,
    },
    /// Delivery option fetch failed
    DeliveryOptionsFailed {
        /// Why
        reason: String,
    },
    /// Join the current cart again and reload failed delivery options
    Retry,
    /// The payment widget reported an event
    Payment(PaymentEvent),
}

/// Dependencies of the checkout reducer
#[derive(Clone)]
pub struct CheckoutEnvironment {
    /// Catalog source, fetched once per cart emission
    pub catalog: Arc<dyn CatalogSource>,
    /// Delivery option source
    pub delivery_options: Arc<dyn DeliveryOptionSource>,
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer of the checkout view
#[derive(Clone, Debug, Default)]
pub struct CheckoutReducer;

impl CheckoutReducer {
    /// Start a join of `state.cart` under a new revision
    fn start_join(
        state: &mut CheckoutState,
        env: &CheckoutEnvironment,
    ) -> Effect<CheckoutAction> {
        state.revision += 1;
        state.item_count = state.cart.item_count();
        state.joining = true;
        state.error = None;

        let revision = state.revision;
        let catalog = Arc::clone(&env.catalog);
        cancellable_effect! {
            id: JOIN_CART_LINES,
            async {
                Some(match catalog.fetch_all_products().await {
                    Ok(products) => CheckoutAction::CatalogFetched { revision, products },
                    Err(error) => CheckoutAction::CatalogFailed {
                        revision,
                        reason: error.to_string(),
                    },
                })
            }
        }
    }

    fn load_delivery_options(
        state: &mut CheckoutState,
        env: &CheckoutEnvironment,
    ) -> Effect<CheckoutAction> {
        state.delivery_options = Loadable::Loading;
        let source = Arc::clone(&env.delivery_options);
        cancellable_effect! {
            id: LOAD_DELIVERY_OPTIONS,
            async {
                Some(match source.fetch_all_delivery_options().await {
                    Ok(options) => CheckoutAction::DeliveryOptionsLoaded { options },
                    Err(error) => CheckoutAction::DeliveryOptionsFailed {
                        reason: error.to_string(),
                    },
                })
            }
        }
    }
}

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CheckoutAction::CartUpdated { cart } => {
                state.cart = cart;
                let join = Self::start_join(state, env);
                tracing::trace!(revision = state.revision, "Cart updated, joining lines");
                smallvec![join]
            },

            CheckoutAction::CatalogFetched { revision, products } => {
                if revision != state.revision {
                    tracing::trace!(revision, current = state.revision, "Discarded stale catalog");
                    return SmallVec::new();
                }

                let outcome = join_cart_lines(&state.cart.items, &products);
                if !outcome.missing.is_empty() {
                    tracing::warn!(
                        missing = ?outcome.missing,
                        "Cart references products missing from the catalog"
                    );
                }
                state.lines = outcome.lines;
                state.missing_products = outcome.missing;
                state.lines_revision = revision;
                state.joining = false;
                SmallVec::new()
            },

            CheckoutAction::CatalogFailed { revision, reason } => {
                if revision != state.revision {
                    return SmallVec::new();
                }
                tracing::warn!(%reason, "Catalog fetch failed");
                state.lines.clear();
                state.missing_products.clear();
                state.lines_revision = revision;
                state.joining = false;
                state.error = Some(reason);
                SmallVec::new()
            },

            CheckoutAction::LoadDeliveryOptions => {
                smallvec![Self::load_delivery_options(state, env)]
            },

            CheckoutAction::DeliveryOptionsLoaded { options } => {
                tracing::debug!(options = options.len(), "Delivery options loaded");
                state.delivery_options = Loadable::Loaded(options);
                SmallVec::new()
            },

            CheckoutAction::DeliveryOptionsFailed { reason } => {
                tracing::warn!(%reason, "Delivery option fetch failed");
                state.delivery_options = Loadable::Failed(reason);
                SmallVec::new()
            },

            CheckoutAction::Retry => {
                let mut effects: SmallVec<[Effect<Self::Action>; 4]> =
                    smallvec![Self::start_join(state, env)];
                if !matches!(state.delivery_options, Loadable::Loaded(_)) {
                    effects.push(Self::load_delivery_options(state, env));
                }
                effects
            },

            CheckoutAction::Payment(event) => {
                state.payment = state.payment.apply(event);
                SmallVec::new()
            },
        }
    }
}

// ============================================================================
// View
// ============================================================================

type CheckoutStore = Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer>;

/// The checkout view
///
/// Created by [`CheckoutView::activate`], torn down by
/// [`CheckoutView::deactivate`]. Dropping the view also releases the cart
/// subscription.
pub struct CheckoutView {
    store: CheckoutStore,
    cart: ShoppingCartStore,
    cart_state: watch::Receiver<ShoppingCart>,
    cart_subscription: Option<Subscription>,
    payment_config: PaymentConfig,
}

impl CheckoutView {
    /// Activate the view
    ///
    /// Starts loading delivery options and subscribes to the cart; the
    /// current cart is joined right away.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the view's store refuses the first action.
    pub async fn activate(
        cart: ShoppingCartStore,
        catalog: Arc<dyn CatalogSource>,
        delivery_options: Arc<dyn DeliveryOptionSource>,
        payment_config: PaymentConfig,
        store_config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let store = Store::with_config(
            CheckoutState::default(),
            CheckoutReducer,
            CheckoutEnvironment {
                catalog,
                delivery_options,
            },
            store_config,
        );
        store.send(CheckoutAction::LoadDeliveryOptions).await?;

        let cart_subscription = store.forward("checkout.cart", cart.get(), |cart| {
            CheckoutAction::CartUpdated { cart }
        });
        let cart_state = cart.get();

        tracing::debug!("Checkout activated");
        Ok(Self {
            store,
            cart,
            cart_state,
            cart_subscription: Some(cart_subscription),
            payment_config,
        })
    }

    /// Stream of the view state, for display
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.store.subscribe()
    }

    /// Snapshot of the view state
    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.store.subscribe().borrow().clone()
    }

    /// Sum of quantities in the cart, as of the last emission
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.store.subscribe().borrow().item_count
    }

    /// Joined display lines
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.store.subscribe().borrow().lines.clone()
    }

    /// The cart store's current gross total
    #[must_use]
    pub fn gross_total(&self) -> Money {
        self.cart_state.borrow().gross_total
    }

    /// Widget configuration
    #[must_use]
    pub const fn payment_config(&self) -> &PaymentConfig {
        &self.payment_config
    }

    /// Current payment attempt
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        self.store.subscribe().borrow().payment.clone()
    }

    /// Wait until the displayed lines reflect the cart store's current cart
    /// and the delivery options are no longer loading
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the join has not caught up within
    /// `timeout`.
    pub async fn synced(&self, timeout: Duration) -> Result<CheckoutState, StoreError> {
        let mut state = self.store.subscribe();
        let mut cart = self.cart.get();

        let caught_up = async {
            loop {
                let target = cart.borrow_and_update().clone();
                let found = state
                    .wait_for(|s| {
                        s.is_settled() && s.cart == target && !s.delivery_options.is_loading()
                    })
                    .await
                    .map(|s| s.clone());

                // The cart may have moved on while waiting.
                if !cart.has_changed().unwrap_or(false) {
                    return found.map_err(|_| StoreError::ChannelClosed);
                }
            }
        };

        tokio::time::timeout(timeout, caught_up)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Empty the cart
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Store`](crate::error::CheckoutError::Store) if the cart no longer accepts changes.
    pub async fn empty_cart(&self) -> CheckoutResult<()> {
        self.cart.empty().await?;
        Ok(())
    }

    /// Select a delivery option
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Store`](crate::error::CheckoutError::Store) if the cart no longer accepts changes.
    pub async fn set_delivery_option(&self, option: DeliveryOption) -> CheckoutResult<()> {
        self.cart.set_delivery_option(option).await?;
        Ok(())
    }

    /// Recover from a source failure
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Store`](crate::error::CheckoutError::Store) after deactivation.
    pub async fn retry(&self) -> CheckoutResult<()> {
        self.store.send(CheckoutAction::Retry).await?;
        Ok(())
    }

    /// Release the cart subscription, abort in-flight fetches and stop the
    /// view's store
    ///
    /// The subscription is fully stopped before fetches are cancelled, so a
    /// cart emission being delivered concurrently cannot start a join that
    /// outlives the view.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects do not stop within
    /// the configured timeout.
    pub async fn deactivate(mut self) -> Result<(), StoreError> {
        if let Some(subscription) = self.cart_subscription.take() {
            subscription.unsubscribe().await;
        }
        let cancelled = self.store.cancel_all();
        tracing::debug!(cancelled, "Checkout deactivated");
        self.store
            .shutdown(self.store.config().default_shutdown_timeout)
            .await
    }

    async fn record(&self, event: PaymentEvent) -> CheckoutResult<()> {
        self.store.send(CheckoutAction::Payment(event)).await?;
        Ok(())
    }
}

impl PaymentCallbacks for CheckoutView {
    fn create_order(&self) -> PaymentFuture<'_, OrderRequest> {
        Box::pin(async move {
            let lines = self.store.state(|s| s.lines.clone()).await;
            // Read last so the amount is the cart's value at this moment.
            let cart = self.cart_state.borrow().clone();

            let order = build_order(&cart, &lines, &self.payment_config)?;
            tracing::info!(
                value = %cart.gross_total,
                currency = %self.payment_config.currency,
                items = cart.items.len(),
                "Order created"
            );
            self.record(PaymentEvent::OrderCreated {
                value: cart.gross_total,
            })
            .await?;
            Ok(order)
        })
    }

    fn on_approve(&self, data: ApprovalData) -> PaymentFuture<'_, ()> {
        Box::pin(async move {
            tracing::info!(
                order_id = %data.order_id,
                payer_id = ?data.payer_id,
                "Transaction approved, not yet authorized"
            );
            self.record(PaymentEvent::Approved {
                order_id: data.order_id,
            })
            .await
        })
    }

    fn on_client_authorization(&self, data: AuthorizationData) -> PaymentFuture<'_, ()> {
        Box::pin(async move {
            // TODO: notify the order backend once one exists; the success flag
            // is client-side only.
            tracing::info!(
                order_id = %data.order_id,
                status = %data.status,
                "Client authorization completed"
            );
            self.record(PaymentEvent::Authorized {
                order_id: data.order_id,
            })
            .await
        })
    }

    fn on_cancel(&self, data: CancelData) -> PaymentFuture<'_, ()> {
        Box::pin(async move {
            tracing::info!(order_id = ?data.order_id, "Payment cancelled");
            self.record(PaymentEvent::Cancelled).await
        })
    }

    fn on_error(&self, error: String) -> PaymentFuture<'_, ()> {
        Box::pin(async move {
            tracing::error!(%error, "Payment widget error");
            self.record(PaymentEvent::Errored { reason: error }).await
        })
    }

    fn on_click(&self, data: ClickData) -> PaymentFuture<'_, ()> {
        Box::pin(async move {
            tracing::info!(funding_source = ?data.funding_source, "Payment button clicked");
            self.record(PaymentEvent::Clicked).await
        })
    }
}

impl std::fmt::Debug for CheckoutView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutView")
            .field("revision", &self.store.subscribe().borrow().revision)
            .field("gross_total", &self.gross_total())
            .field("subscribed", &self.cart_subscription.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::sources::{InMemoryCatalog, InMemoryDeliveryOptions};
    use proptest::prelude::*;
    use shopfront_testing::{ReducerTest, assertions, collect_actions};

    fn product(id: &str, cents: u64) -> Product {
        Product::new(id, format!("Product {id}"), Money::from_cents(cents))
    }

    fn item(id: &str, quantity: u32, cents: u64) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    fn cart(items: Vec<CartItem>) -> ShoppingCart {
        let mut cart = ShoppingCart {
            items,
            ..ShoppingCart::default()
        };
        cart.recalculate();
        cart
    }

    fn env(catalog: InMemoryCatalog) -> CheckoutEnvironment {
        CheckoutEnvironment {
            catalog: Arc::new(catalog),
            delivery_options: Arc::new(InMemoryDeliveryOptions::new(vec![])),
        }
    }

    #[test]
    fn test_join_known_product() {
        let outcome = join_cart_lines(
            &[item("a", 2, 1000)],
            &[product("a", 1000), product("b", 500)],
        );

        assert_eq!(outcome.lines.len(), 1);
        assert_eq!(outcome.lines[0].total_cost.to_string(), "20.00");
        assert!(outcome.missing.is_empty());
    }

    #[test]
    fn test_join_unknown_product_is_omitted() {
        let outcome = join_cart_lines(&[item("x", 1, 100)], &[product("a", 1000)]);

        assert!(outcome.lines.is_empty());
        assert_eq!(outcome.missing, vec![ProductId::new("x")]);
    }

    #[test]
    fn test_join_uses_catalog_price_and_cart_order() {
        let outcome = join_cart_lines(
            &[item("b", 1, 999), item("a", 3, 999)],
            &[product("a", 200), product("b", 500)],
        );

        let ids: Vec<_> = outcome.lines.iter().map(|l| l.product.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(outcome.lines[1].total_cost, Money::from_cents(600));
    }

    #[test]
    fn test_cart_update_starts_cancellable_join() {
        ReducerTest::new(CheckoutReducer)
            .with_env(env(InMemoryCatalog::new(vec![])))
            .given_state(CheckoutState::default())
            .when_action(CheckoutAction::CartUpdated {
                cart: cart(vec![item("a", 2, 1000), item("b", 1, 500)]),
            })
            .then_state(|state| {
                assert_eq!(state.revision, 1);
                assert_eq!(state.item_count, 3);
                assert!(state.joining);
                assert!(!state.is_settled());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_cancellable_effect(effects, JOIN_CART_LINES);
            })
            .run();
    }

    #[test]
    fn test_stale_catalog_is_discarded() {
        ReducerTest::new(CheckoutReducer)
            .with_env(env(InMemoryCatalog::new(vec![])))
            .given_state(CheckoutState::default())
            .when_actions([
                CheckoutAction::CartUpdated {
                    cart: cart(vec![item("a", 1, 1000)]),
                },
                CheckoutAction::CartUpdated {
                    cart: cart(vec![item("a", 2, 1000)]),
                },
                CheckoutAction::CatalogFetched {
                    revision: 1,
                    products: vec![product("a", 1000)],
                },
            ])
            .then_state(|state| {
                assert!(state.lines.is_empty());
                assert!(state.joining);
                assert_eq!(state.revision, 2);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_current_catalog_is_joined() {
        ReducerTest::new(CheckoutReducer)
            .with_env(env(InMemoryCatalog::new(vec![])))
            .given_state(CheckoutState::default())
            .when_actions([
                CheckoutAction::CartUpdated {
                    cart: cart(vec![item("a", 2, 1000), item("x", 1, 100)]),
                },
                CheckoutAction::CatalogFetched {
                    revision: 1,
                    products: vec![product("a", 1000), product("b", 500)],
                },
            ])
            .then_state(|state| {
                assert!(state.is_settled());
                assert_eq!(state.item_count, 3);
                assert_eq!(state.lines.len(), 1);
                assert_eq!(state.lines[0].total_cost, Money::from_cents(2000));
                assert_eq!(state.missing_products, vec![ProductId::new("x")]);
            })
            .run();
    }

    #[test]
    fn test_catalog_failure_is_recoverable() {
        ReducerTest::new(CheckoutReducer)
            .with_env(env(InMemoryCatalog::new(vec![])))
            .given_state(CheckoutState::default())
            .when_actions([
                CheckoutAction::CartUpdated {
                    cart: cart(vec![item("a", 1, 1000)]),
                },
                CheckoutAction::CatalogFailed {
                    revision: 1,
                    reason: "catalog unavailable: offline".into(),
                },
                CheckoutAction::Retry,
            ])
            .then_state(|state| {
                assert_eq!(state.error, None);
                assert_eq!(state.revision, 2);
                assert!(state.joining);
            })
            .then_effects(|effects| {
                assertions::assert_has_cancellable_effect(effects, JOIN_CART_LINES);
                assertions::assert_has_cancellable_effect(effects, LOAD_DELIVERY_OPTIONS);
            })
            .run();
    }

    #[test]
    fn test_payment_events_update_status() {
        ReducerTest::new(CheckoutReducer)
            .with_env(env(InMemoryCatalog::new(vec![])))
            .given_state(CheckoutState::default())
            .when_actions([
                CheckoutAction::Payment(PaymentEvent::Clicked),
                CheckoutAction::Payment(PaymentEvent::Errored {
                    reason: "window closed".into(),
                }),
            ])
            .then_state(|state| {
                assert!(matches!(state.payment, PaymentStatus::Failed { .. }));
            })
            .run();
    }

    #[tokio::test]
    async fn test_join_effect_fetches_fresh_catalog() {
        let catalog = InMemoryCatalog::new(vec![product("a", 1000)]);
        let env = env(catalog.clone());
        let mut state = CheckoutState::default();

        for _ in 0..2 {
            let effects = CheckoutReducer.reduce(
                &mut state,
                CheckoutAction::CartUpdated {
                    cart: cart(vec![item("a", 1, 1000)]),
                },
                &env,
            );
            for effect in effects {
                for action in collect_actions(effect).await {
                    let _ = CheckoutReducer.reduce(&mut state, action, &env);
                }
            }
        }

        assert_eq!(catalog.fetch_count(), 2);
        assert!(state.is_settled());
        assert_eq!(state.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_superseded_join_never_fetches() {
        let catalog = InMemoryCatalog::new(vec![product("a", 1000)]);
        let env = env(catalog.clone());
        let mut state = CheckoutState::default();
        let mut update = |quantity| {
            CheckoutReducer.reduce(
                &mut state,
                CheckoutAction::CartUpdated {
                    cart: cart(vec![item("a", quantity, 1000)]),
                },
                &env,
            )
        };

        let superseded = update(1);
        let current = update(2);
        drop(superseded);
        assert_eq!(catalog.fetch_count(), 0);

        let mut actions = Vec::new();
        for effect in current {
            actions.extend(collect_actions(effect).await);
        }
        assert_eq!(catalog.fetch_count(), 1);
        assert!(matches!(
            actions.as_slice(),
            [CheckoutAction::CatalogFetched { revision: 2, .. }]
        ));
    }

    fn arb_cart_and_catalog() -> impl Strategy<Value = (Vec<CartItem>, Vec<Product>)> {
        prop::collection::btree_map(0_u8..40, (1_u32..100, 0_u64..100_000, any::<bool>()), 0..15)
            .prop_map(|entries| {
                let mut items = Vec::new();
                let mut products = Vec::new();
                for (id, (quantity, cents, in_catalog)) in entries {
                    let id = format!("p{id}");
                    items.push(item(&id, quantity, cents));
                    if in_catalog {
                        products.push(product(&id, cents));
                    }
                }
                (items, products)
            })
    }

    proptest! {
        #[test]
        fn prop_line_totals_are_quantity_times_price((items, products) in arb_cart_and_catalog()) {
            let outcome = join_cart_lines(&items, &products);

            for line in &outcome.lines {
                prop_assert_eq!(
                    line.total_cost.cents(),
                    line.product.price.cents() * u64::from(line.item.quantity)
                );
            }
        }

        #[test]
        fn prop_omitted_lines_equal_unmatched_ids((items, products) in arb_cart_and_catalog()) {
            let outcome = join_cart_lines(&items, &products);

            prop_assert!(outcome.lines.len() <= items.len());
            prop_assert_eq!(items.len() - outcome.lines.len(), outcome.missing.len());
            for id in &outcome.missing {
                prop_assert!(!products.iter().any(|p| &p.id == id));
            }
        }

        #[test]
        fn prop_item_count_is_sum_of_quantities((items, _products) in arb_cart_and_catalog()) {
            let expected: u64 = items.iter().map(|i| u64::from(i.quantity)).sum();
            prop_assert_eq!(cart(items).item_count(), expected);
        }
    }
}

//! Shopping cart store
//!
//! The cart is process-wide state owned by one [`ShoppingCartStore`]. Views
//! mutate it through `add_item`, `set_delivery_option` and `empty`, and
//! observe it through [`ShoppingCartStore::get`], a `watch` receiver that
//! always holds the current cart.
//!
//! Totals are recalculated by the reducer after every mutation, so
//! `ShoppingCart::gross_total` is the single authoritative value.

use crate::types::{CartItem, DeliveryOption, MAX_QUANTITY_PER_LINE, Product, ShoppingCart};
use shopfront_core::environment::Clock;
use shopfront_core::{SmallVec, effect::Effect, reducer::Reducer};
use shopfront_runtime::{Store, StoreConfig, StoreError};
use std::sync::Arc;
use tokio::sync::watch;

// ============================================================================
// Actions
// ============================================================================

/// Mutations of the shopping cart
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartAction {
    /// Change the quantity of `product` by `delta` (may be negative)
    AddItem {
        /// Product to add or remove
        product: Product,
        /// Quantity change
        delta: i32,
    },
    /// Select a delivery option
    SetDeliveryOption {
        /// The new option
        option: DeliveryOption,
    },
    /// Remove every line and the delivery option
    Empty,
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the cart reducer
#[derive(Clone)]
pub struct CartEnvironment {
    /// Clock for `updated_at`
    pub clock: Arc<dyn Clock>,
}

impl CartEnvironment {
    /// Creates a new `CartEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer applying [`CartAction`]s to a [`ShoppingCart`]
///
/// Quantity rules:
/// - a line whose quantity drops to zero or below is removed
/// - removing a product that is not in the cart changes nothing
/// - quantities are capped at [`MAX_QUANTITY_PER_LINE`]
/// - removing the last line also clears the delivery option
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Creates a new `CartReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns whether the cart changed
    fn apply_delta(cart: &mut ShoppingCart, product: &Product, delta: i32) -> bool {
        let position = cart
            .items
            .iter()
            .position(|item| item.product_id == product.id);

        match position {
            Some(index) => {
                let current = i64::from(cart.items[index].quantity);
                let next = current + i64::from(delta);
                if next <= 0 {
                    cart.items.remove(index);
                    if cart.items.is_empty() {
                        cart.delivery_option = None;
                    }
                } else {
                    cart.items[index].quantity = clamp_quantity(next);
                }
                true
            },
            None if delta > 0 => {
                cart.items.push(CartItem {
                    product_id: product.id.clone(),
                    quantity: clamp_quantity(i64::from(delta)),
                    unit_price: product.price,
                });
                true
            },
            None => false,
        }
    }
}

fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.clamp(0, i64::from(MAX_QUANTITY_PER_LINE))).unwrap_or(MAX_QUANTITY_PER_LINE)
}

impl Reducer for CartReducer {
    type State = ShoppingCart;
    type Action = CartAction;
    type Environment = CartEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let changed = match action {
            CartAction::AddItem { product, delta } => {
                let changed = Self::apply_delta(state, &product, delta);
                tracing::debug!(
                    product_id = %product.id,
                    delta,
                    quantity = state.quantity_of(&product.id),
                    "Cart line updated"
                );
                changed
            },
            CartAction::SetDeliveryOption { option } => {
                tracing::debug!(delivery_option = %option.id, "Delivery option selected");
                state.delivery_option = Some(option);
                true
            },
            CartAction::Empty => {
                tracing::debug!(lines = state.items.len(), "Cart emptied");
                *state = ShoppingCart::default();
                true
            },
        };

        if changed {
            state.recalculate();
            state.updated_at = Some(env.clock.now());
        }

        SmallVec::new()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Runtime store holding the cart
pub type CartStore = Store<ShoppingCart, CartAction, CartEnvironment, CartReducer>;

/// The process-wide shopping cart
///
/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct ShoppingCartStore {
    store: CartStore,
}

impl ShoppingCartStore {
    /// Create an empty cart
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, StoreConfig::default())
    }

    /// Create an empty cart with a custom store configuration
    #[must_use]
    pub fn with_config(clock: Arc<dyn Clock>, config: StoreConfig) -> Self {
        Self {
            store: Store::with_config(
                ShoppingCart::default(),
                CartReducer::new(),
                CartEnvironment::new(clock),
                config,
            ),
        }
    }

    /// Change the quantity of `product` by `delta`
    ///
    /// The new cart is published before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn add_item(&self, product: &Product, delta: i32) -> Result<(), StoreError> {
        self.store
            .send(CartAction::AddItem {
                product: product.clone(),
                delta,
            })
            .await
            .map(drop)
    }

    /// Replace the selected delivery option
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn set_delivery_option(&self, option: DeliveryOption) -> Result<(), StoreError> {
        self.store
            .send(CartAction::SetDeliveryOption { option })
            .await
            .map(drop)
    }

    /// Remove every line and the delivery option
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn empty(&self) -> Result<(), StoreError> {
        self.store.send(CartAction::Empty).await.map(drop)
    }

    /// Stream of the cart; the receiver holds the current cart right away
    #[must_use]
    pub fn get(&self) -> watch::Receiver<ShoppingCart> {
        self.store.subscribe()
    }

    /// Snapshot of the current cart
    #[must_use]
    pub fn current(&self) -> ShoppingCart {
        self.store.subscribe().borrow().clone()
    }

    /// Stop accepting mutations
    ///
    /// # Errors
    ///
    /// The cart reducer starts no effects, so this only fails if `timeout` is
    /// zero and an effect is somehow pending.
    pub async fn shutdown(&self, timeout: std::time::Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

impl std::fmt::Debug for ShoppingCartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cart = self.current();
        f.debug_struct("ShoppingCartStore")
            .field("lines", &cart.items.len())
            .field("gross_total", &cart.gross_total)
            .finish()
    }
}

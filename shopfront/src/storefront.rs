//! Storefront view: product listing with add/remove actions
//!
//! On activation the view fetches the catalog once and keeps a subscription
//! to the cart, so [`StorefrontView::product_in_cart`] answers synchronously
//! from the latest cart.

use crate::cart::ShoppingCartStore;
use crate::sources::CatalogSource;
use crate::types::{Product, ShoppingCart};
use crate::view::Loadable;
use shopfront_core::effect::{Effect, EffectId};
use shopfront_core::{SmallVec, cancellable_effect, reducer::Reducer, smallvec};
use shopfront_runtime::{Store, StoreConfig, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Effect id of the catalog fetch; a reload supersedes a pending fetch
pub const LOAD_PRODUCTS: EffectId = EffectId::new("storefront.load_products");

/// State of the storefront view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorefrontState {
    /// Catalog as displayed
    pub products: Loadable<Vec<Product>>,
}

/// Actions of the storefront view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorefrontAction {
    /// Fetch the catalog
    LoadProducts,
    /// Catalog arrived
    ProductsLoaded {
        /// Every available product
        products: Vec<Product>,
    },
    /// Catalog fetch failed
    ProductsFailed {
        /// Why
        reason: String,
    },
}

/// Dependencies of the storefront reducer
#[derive(Clone)]
pub struct StorefrontEnvironment {
    /// Catalog source
    pub catalog: Arc<dyn CatalogSource>,
}

/// Reducer of the storefront view
#[derive(Clone, Debug, Default)]
pub struct StorefrontReducer;

impl Reducer for StorefrontReducer {
    type State = StorefrontState;
    type Action = StorefrontAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            StorefrontAction::LoadProducts => {
                state.products = Loadable::Loading;
                let catalog = Arc::clone(&env.catalog);
                smallvec![cancellable_effect! {
                    id: LOAD_PRODUCTS,
                    async {
                        Some(match catalog.fetch_all_products().await {
                            Ok(products) => StorefrontAction::ProductsLoaded { products },
                            Err(error) => StorefrontAction::ProductsFailed {
                                reason: error.to_string(),
                            },
                        })
                    }
                }]
            },
            StorefrontAction::ProductsLoaded { products } => {
                tracing::debug!(products = products.len(), "Catalog loaded");
                state.products = Loadable::Loaded(products);
                SmallVec::new()
            },
            StorefrontAction::ProductsFailed { reason } => {
                tracing::warn!(%reason, "Catalog fetch failed");
                state.products = Loadable::Failed(reason);
                SmallVec::new()
            },
        }
    }
}

type StorefrontStore =
    Store<StorefrontState, StorefrontAction, StorefrontEnvironment, StorefrontReducer>;

/// The product listing view
pub struct StorefrontView {
    store: StorefrontStore,
    cart: ShoppingCartStore,
    cart_state: watch::Receiver<ShoppingCart>,
}

impl StorefrontView {
    /// Activate the view: subscribe to the cart and start fetching the catalog
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the initial fetch cannot be started.
    pub async fn activate(
        catalog: Arc<dyn CatalogSource>,
        cart: ShoppingCartStore,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let store = Store::with_config(
            StorefrontState::default(),
            StorefrontReducer,
            StorefrontEnvironment { catalog },
            config,
        );
        store.send(StorefrontAction::LoadProducts).await?;

        let cart_state = cart.get();
        tracing::debug!("Storefront activated");
        Ok(Self {
            store,
            cart,
            cart_state,
        })
    }

    /// Fetch the catalog again, e.g. after a failure
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] after deactivation.
    pub async fn reload(&self) -> Result<(), StoreError> {
        self.store.send(StorefrontAction::LoadProducts).await.map(drop)
    }

    /// Stream of the view state, for display
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StorefrontState> {
        self.store.subscribe()
    }

    /// The catalog as currently displayed
    #[must_use]
    pub fn products(&self) -> Loadable<Vec<Product>> {
        self.store.subscribe().borrow().products.clone()
    }

    /// Wait until the catalog fetch has settled
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the fetch is still pending after
    /// `timeout`.
    pub async fn wait_until_loaded(
        &self,
        timeout: Duration,
    ) -> Result<Loadable<Vec<Product>>, StoreError> {
        let mut state = self.store.subscribe();
        let settled = tokio::time::timeout(timeout, state.wait_for(|s| s.products.is_settled()))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(|_| StoreError::ChannelClosed)?;
        Ok(settled.products.clone())
    }

    /// Add one unit of `product` to the cart
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the cart no longer accepts changes.
    pub async fn add_product_to_cart(&self, product: &Product) -> Result<(), StoreError> {
        self.cart.add_item(product, 1).await
    }

    /// Remove one unit of `product` from the cart
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the cart no longer accepts changes.
    pub async fn remove_product_from_cart(&self, product: &Product) -> Result<(), StoreError> {
        self.cart.add_item(product, -1).await
    }

    /// Whether the cart has a line for `product`, as of now
    #[must_use]
    pub fn product_in_cart(&self, product: &Product) -> bool {
        self.cart_state.borrow().contains(&product.id)
    }

    /// Quantity of `product` in the cart, as of now
    #[must_use]
    pub fn quantity_in_cart(&self, product: &Product) -> u32 {
        self.cart_state.borrow().quantity_of(&product.id)
    }

    /// Release the cart subscription and stop any pending fetch
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the view's effects do not
    /// stop within the configured timeout.
    pub async fn deactivate(self) -> Result<(), StoreError> {
        let cancelled = self.store.cancel_all();
        tracing::debug!(cancelled, "Storefront deactivated");
        self.store
            .shutdown(self.store.config().default_shutdown_timeout)
            .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::money::Money;
    use crate::sources::InMemoryCatalog;
    use shopfront_testing::{ReducerTest, assertions, collect_actions};

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new(vec![Product::new("a", "Alpha", Money::from_cents(1000))])
    }

    #[test]
    fn test_load_marks_loading_and_fetches_cancellably() {
        ReducerTest::new(StorefrontReducer)
            .with_env(StorefrontEnvironment {
                catalog: Arc::new(catalog()),
            })
            .given_state(StorefrontState::default())
            .when_action(StorefrontAction::LoadProducts)
            .then_state(|state| assert!(state.products.is_loading()))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_cancellable_effect(effects, LOAD_PRODUCTS);
            })
            .run();
    }

    #[tokio::test]
    async fn test_load_effect_reports_failure() {
        let catalog = catalog();
        catalog.fail_with("offline");
        let env = StorefrontEnvironment {
            catalog: Arc::new(catalog),
        };

        let mut state = StorefrontState::default();
        let effects = StorefrontReducer.reduce(&mut state, StorefrontAction::LoadProducts, &env);
        let mut actions = Vec::new();
        for effect in effects {
            actions.extend(collect_actions(effect).await);
        }

        assert_eq!(
            actions,
            vec![StorefrontAction::ProductsFailed {
                reason: "catalog unavailable: offline".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_fetch_starts_when_effect_runs() {
        let catalog = catalog();
        let env = StorefrontEnvironment {
            catalog: Arc::new(catalog.clone()),
        };
        let mut state = StorefrontState::default();

        let effects = StorefrontReducer.reduce(&mut state, StorefrontAction::LoadProducts, &env);
        assert_eq!(catalog.fetch_count(), 0);

        for effect in effects {
            let _ = collect_actions(effect).await;
        }
        assert_eq!(catalog.fetch_count(), 1);
    }

    #[test]
    fn test_failure_is_recoverable_state() {
        ReducerTest::new(StorefrontReducer)
            .with_env(StorefrontEnvironment {
                catalog: Arc::new(catalog()),
            })
            .given_state(StorefrontState {
                products: Loadable::Loading,
            })
            .when_action(StorefrontAction::ProductsFailed {
                reason: "catalog unavailable: offline".into(),
            })
            .then_state(|state| {
                assert_eq!(state.products.error(), Some("catalog unavailable: offline"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}

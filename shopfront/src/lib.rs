//! # Shopfront
//!
//! Storefront core built on the Shopfront reducer architecture.
//!
//! - [`cart::ShoppingCartStore`]: process-wide cart with authoritative totals
//! - [`storefront::StorefrontView`]: product listing with add/remove
//! - [`checkout::CheckoutView`]: joins every cart emission with a fresh
//!   catalog fetch (latest wins) and bridges the payment widget
//! - [`sources`]: catalog and delivery option sources (in-memory and JSON
//!   file backed)
//!
//! ## Example
//!
//! ```ignore
//! let cart = ShoppingCartStore::new(Arc::new(SystemClock));
//! let catalog = Arc::new(InMemoryCatalog::new(products));
//!
//! let storefront = StorefrontView::activate(catalog.clone(), cart.clone(), StoreConfig::default()).await?;
//! storefront.add_product_to_cart(&products[0]).await?;
//!
//! let checkout = CheckoutView::activate(cart, catalog, delivery, PaymentConfig::default(), StoreConfig::default()).await?;
//! let order = checkout.create_order().await?;
//! ```

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod money;
pub mod payment;
pub mod sources;
pub mod storefront;
pub mod types;
pub mod view;

pub use cart::ShoppingCartStore;
pub use checkout::{CheckoutState, CheckoutView, JoinOutcome, join_cart_lines};
pub use config::ShopfrontConfig;
pub use error::{CheckoutError, SourceError};
pub use money::Money;
pub use payment::{PaymentCallbacks, PaymentConfig, PaymentStatus};
pub use storefront::StorefrontView;
pub use types::{CartItem, CartLine, DeliveryOption, Product, ProductId, ShoppingCart};
pub use view::Loadable;

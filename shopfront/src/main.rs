//! Storefront demo.
//!
//! Loads the catalog and delivery options from the bundled JSON files, fills
//! a cart through the storefront view, lets the checkout view join it and
//! prints the order that would be handed to the payment widget.

use anyhow::Context;
use shopfront::config::ShopfrontConfig;
use shopfront::payment::{ApprovalData, AuthorizationData, ClickData, PaymentCallbacks};
use shopfront::sources::{JsonFileCatalog, JsonFileDeliveryOptions};
use shopfront::{CheckoutView, Loadable, ShoppingCartStore, StorefrontView};
use shopfront_core::environment::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = ShopfrontConfig::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("shopfront={0},shopfront_runtime={0}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        products = %config.data.products_path.display(),
        delivery_options = %config.data.delivery_options_path.display(),
        currency = %config.payment.currency,
        "Configuration loaded"
    );

    let store_config = config.runtime.store_config();
    let catalog = Arc::new(JsonFileCatalog::new(&config.data.products_path));
    let delivery = Arc::new(JsonFileDeliveryOptions::new(&config.data.delivery_options_path));
    let cart = ShoppingCartStore::with_config(Arc::new(SystemClock), store_config);

    // Storefront: list products and fill the cart
    let storefront = StorefrontView::activate(catalog.clone(), cart.clone(), store_config).await?;
    let products = match storefront.wait_until_loaded(SETTLE_TIMEOUT).await? {
        Loadable::Loaded(products) => products,
        Loadable::Failed(reason) => anyhow::bail!("catalog unavailable: {reason}"),
        Loadable::NotLoaded | Loadable::Loading => anyhow::bail!("catalog did not load"),
    };
    let first = products.first().context("catalog is empty")?;

    storefront.add_product_to_cart(first).await?;
    storefront.add_product_to_cart(first).await?;
    if let Some(second) = products.get(1) {
        storefront.add_product_to_cart(second).await?;
    }
    for product in &products {
        info!(
            product = %product.name,
            price = %product.price,
            in_cart = storefront.product_in_cart(product),
            quantity = storefront.quantity_in_cart(product),
            "Listed"
        );
    }
    storefront.deactivate().await?;

    // Checkout: join the cart and pay
    let checkout = CheckoutView::activate(
        cart.clone(),
        catalog,
        delivery,
        config.payment.clone(),
        store_config,
    )
    .await?;

    let mut state = checkout.synced(SETTLE_TIMEOUT).await?;
    if let Some(option) = state.delivery_options.value().and_then(|options| options.last()) {
        checkout.set_delivery_option(option.clone()).await?;
        state = checkout.synced(SETTLE_TIMEOUT).await?;
    }

    for line in &state.lines {
        info!(
            product = %line.product.name,
            quantity = line.item.quantity,
            total = %line.total_cost,
            "Cart line"
        );
    }
    info!(item_count = state.item_count, gross_total = %checkout.gross_total(), "Checkout ready");

    checkout.on_click(ClickData::default()).await?;
    let order = checkout.create_order().await?;
    println!("{}", serde_json::to_string_pretty(&order)?);

    checkout
        .on_approve(ApprovalData {
            order_id: "DEMO-ORDER".to_string(),
            payer_id: None,
        })
        .await?;
    checkout
        .on_client_authorization(AuthorizationData {
            order_id: "DEMO-ORDER".to_string(),
            status: "COMPLETED".to_string(),
        })
        .await?;
    info!(status = ?checkout.payment_status(), "Payment finished");

    checkout.empty_cart().await?;
    let emptied = checkout.synced(SETTLE_TIMEOUT).await?;
    info!(
        item_count = emptied.item_count,
        gross_total = %checkout.gross_total(),
        "Cart emptied"
    );

    checkout.deactivate().await?;
    cart.shutdown(store_config.default_shutdown_timeout).await?;
    Ok(())
}

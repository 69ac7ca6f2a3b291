//! Bridge to the external payment widget
//!
//! The widget is configured with a [`PaymentConfig`] and drives the checkout
//! through [`PaymentCallbacks`]. The only value the storefront supplies is
//! the order description built by [`build_order`] from the cart's
//! authoritative totals; settlement and server-side verification are the
//! widget's and the backend's concern.

use crate::error::{CheckoutError, CheckoutResult};
use crate::money::Money;
use crate::types::{CartLine, ShoppingCart};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

// ============================================================================
// Widget configuration
// ============================================================================

/// What the widget does with the order once approved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderIntent {
    /// Capture the payment immediately
    Capture,
    /// Authorize now, capture later
    Authorize,
}

/// Advanced widget options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedOptions {
    /// `"true"` shows "Pay Now" instead of "Continue"
    pub commit: String,
}

/// Button look
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonStyle {
    /// Button label
    pub label: String,
    /// Button stacking
    pub layout: String,
}

/// Options handed to the payment widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfig {
    /// Merchant client id (`"sb"` is the sandbox)
    pub client_id: String,
    /// ISO 4217 currency of every amount
    pub currency: String,
    /// Order intent
    pub intent: OrderIntent,
    /// Advanced options
    pub advanced: AdvancedOptions,
    /// Button style
    pub style: ButtonStyle,
}

impl PaymentConfig {
    /// Configuration for `client_id` charging in `currency`
    pub fn new(client_id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            currency: currency.into(),
            ..Self::default()
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            client_id: "sb".to_string(),
            currency: "USD".to_string(),
            intent: OrderIntent::Capture,
            advanced: AdvancedOptions {
                commit: "true".to_string(),
            },
            style: ButtonStyle {
                label: "paypal".to_string(),
                layout: "vertical".to_string(),
            },
        }
    }
}

// ============================================================================
// Order description
// ============================================================================

/// Monetary amount in the widget's format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// ISO 4217 currency code
    pub currency_code: String,
    /// Fixed-point decimal string, e.g. `"20.00"`
    pub value: String,
}

impl Amount {
    fn new(currency: &str, money: Money) -> Self {
        Self {
            currency_code: currency.to_string(),
            value: money.to_decimal_string(),
        }
    }
}

/// Split of the order amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountBreakdown {
    /// Sum of all items
    pub item_total: Amount,
    /// Delivery cost, present when a delivery option is selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<Amount>,
}

/// Order amount with its breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountWithBreakdown {
    /// ISO 4217 currency code
    pub currency_code: String,
    /// Total to charge; always the cart's gross total
    pub value: String,
    /// How `value` is made up
    pub breakdown: AmountBreakdown,
}

/// Kind of goods sold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    /// Shipped goods
    PhysicalGoods,
    /// Downloads
    DigitalGoods,
}

/// One item of the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Display name
    pub name: String,
    /// Quantity as a decimal string
    pub quantity: String,
    /// Kind of goods
    pub category: ItemCategory,
    /// Price of one unit
    pub unit_amount: Amount,
}

/// A purchase unit of the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseUnit {
    /// Amount to charge
    pub amount: AmountWithBreakdown,
    /// Items bought
    pub items: Vec<OrderItem>,
}

/// Order description returned to the widget on order creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Order intent
    pub intent: OrderIntent,
    /// Always exactly one unit
    pub purchase_units: Vec<PurchaseUnit>,
}

impl OrderRequest {
    /// The declared total of the order
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.purchase_units
            .first()
            .map(|unit| unit.amount.value.as_str())
    }
}

/// Describe `cart` as an order
///
/// The amount is the cart's own `gross_total`. Item names come from the joined
/// `lines`; an item whose line is not (yet) joined is named by its product id.
/// Unit amounts use the prices captured by the cart, so items always add up
/// to the declared item total.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`] if the cart has no lines.
pub fn build_order(
    cart: &ShoppingCart,
    lines: &[CartLine],
    config: &PaymentConfig,
) -> CheckoutResult<OrderRequest> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let currency = config.currency.as_str();
    let items = cart
        .items
        .iter()
        .map(|item| {
            let name = lines
                .iter()
                .find(|line| line.item.product_id == item.product_id)
                .map_or_else(|| item.product_id.to_string(), |line| line.product.name.clone());
            OrderItem {
                name,
                quantity: item.quantity.to_string(),
                category: ItemCategory::PhysicalGoods,
                unit_amount: Amount::new(currency, item.unit_price),
            }
        })
        .collect();

    let shipping = cart
        .delivery_option
        .as_ref()
        .map(|_| Amount::new(currency, cart.delivery_total));

    Ok(OrderRequest {
        intent: config.intent,
        purchase_units: vec![PurchaseUnit {
            amount: AmountWithBreakdown {
                currency_code: currency.to_string(),
                value: cart.gross_total.to_decimal_string(),
                breakdown: AmountBreakdown {
                    item_total: Amount::new(currency, cart.items_total),
                    shipping,
                },
            },
            items,
        }],
    })
}

// ============================================================================
// Callback payloads
// ============================================================================

/// Payload of the approval callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalData {
    /// Widget order id
    pub order_id: String,
    /// Buyer id
    #[serde(default)]
    pub payer_id: Option<String>,
}

/// Payload of the client-authorization callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationData {
    /// Widget order id
    pub order_id: String,
    /// Widget's transaction status, e.g. `"COMPLETED"`
    pub status: String,
}

/// Payload of the cancel callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelData {
    /// Widget order id, if an order had been created
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Payload of the click callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickData {
    /// Funding source the buyer clicked, e.g. `"paypal"`
    #[serde(default)]
    pub funding_source: Option<String>,
}

// ============================================================================
// Payment status
// ============================================================================

/// Events reported by the widget, as recorded by the checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// Buyer clicked a payment button
    Clicked,
    /// An order was handed to the widget
    OrderCreated {
        /// Declared total
        value: Money,
    },
    /// Buyer approved the order
    Approved {
        /// Widget order id
        order_id: String,
    },
    /// Transaction finalized on the client
    Authorized {
        /// Widget order id
        order_id: String,
    },
    /// Buyer closed the widget
    Cancelled,
    /// Widget reported an error
    Errored {
        /// Widget's message
        reason: String,
    },
}

/// Where the current checkout attempt stands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PaymentStatus {
    /// No attempt yet
    #[default]
    Idle,
    /// Buyer clicked a payment button
    Started,
    /// Order handed to the widget
    OrderCreated {
        /// Declared total
        value: Money,
    },
    /// Buyer approved, not yet authorized
    Approved {
        /// Widget order id
        order_id: String,
    },
    /// Client-side success; no server verification has happened
    Authorized {
        /// Widget order id
        order_id: String,
    },
    /// Buyer cancelled
    Cancelled,
    /// Widget error; terminal for this attempt
    Failed {
        /// Widget's message
        reason: String,
    },
}

impl PaymentStatus {
    /// Status after `event`
    ///
    /// A click always starts a new attempt. Otherwise `Failed`, `Cancelled`
    /// and `Authorized` are terminal.
    #[must_use]
    pub fn apply(&self, event: PaymentEvent) -> Self {
        if event == PaymentEvent::Clicked {
            return Self::Started;
        }
        if self.is_terminal() {
            return self.clone();
        }

        match event {
            PaymentEvent::Clicked => Self::Started,
            PaymentEvent::OrderCreated { value } => Self::OrderCreated { value },
            PaymentEvent::Approved { order_id } => Self::Approved { order_id },
            PaymentEvent::Authorized { order_id } => Self::Authorized { order_id },
            PaymentEvent::Cancelled => Self::Cancelled,
            PaymentEvent::Errored { reason } => Self::Failed { reason },
        }
    }

    /// Whether the attempt is over
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Authorized { .. } | Self::Cancelled | Self::Failed { .. }
        )
    }

    /// Whether the client reported a finalized transaction
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }
}

// ============================================================================
// Callbacks
// ============================================================================

/// Boxed future returned by payment callbacks
pub type PaymentFuture<'a, T> = Pin<Box<dyn Future<Output = CheckoutResult<T>> + Send + 'a>>;

/// Callbacks invoked by the payment widget
pub trait PaymentCallbacks: Send + Sync {
    /// Describe the order to pay for
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] for an empty cart.
    fn create_order(&self) -> PaymentFuture<'_, OrderRequest>;

    /// Buyer approved the order
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Store`] if the checkout is no longer active.
    fn on_approve(&self, data: ApprovalData) -> PaymentFuture<'_, ()>;

    /// Transaction finalized on the client
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Store`] if the checkout is no longer active.
    fn on_client_authorization(&self, data: AuthorizationData) -> PaymentFuture<'_, ()>;

    /// Buyer cancelled
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Store`] if the checkout is no longer active.
    fn on_cancel(&self, data: CancelData) -> PaymentFuture<'_, ()>;

    /// Widget reported an error
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Store`] if the checkout is no longer active.
    fn on_error(&self, error: String) -> PaymentFuture<'_, ()>;

    /// Buyer clicked a payment button
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Store`] if the checkout is no longer active.
    fn on_click(&self, data: ClickData) -> PaymentFuture<'_, ()>;
}

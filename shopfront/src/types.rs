//! Domain types shared by the cart store and the views.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an id from a string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

define_id!(
    /// Unique identifier of a catalog product
    ProductId
);
define_id!(
    /// Unique identifier of a delivery option
    DeliveryOptionId
);

// ============================================================================
// Catalog data
// ============================================================================

/// A product as supplied by the catalog source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product id
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Optional long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit price
    pub price: Money,
}

impl Product {
    /// Create a product without description
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            price,
        }
    }
}

/// A delivery option as supplied by the delivery option source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOption {
    /// Delivery option id
    pub id: DeliveryOptionId,
    /// Label shown to the buyer
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Delivery cost
    pub price: Money,
}

impl DeliveryOption {
    /// Create a delivery option without description
    pub fn new(id: impl Into<DeliveryOptionId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            price,
        }
    }
}

// ============================================================================
// Cart
// ============================================================================

/// Maximum quantity held by a single cart line
pub const MAX_QUANTITY_PER_LINE: u32 = 9999;

/// One line of the shopping cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product this line refers to
    pub product_id: ProductId,
    /// Always between 1 and [`MAX_QUANTITY_PER_LINE`]
    pub quantity: u32,
    /// Price captured when the product was first added
    pub unit_price: Money,
}

impl CartItem {
    /// `unit_price × quantity`
    #[must_use]
    pub const fn total(&self) -> Money {
        self.unit_price.saturating_mul(self.quantity)
    }
}

/// The shopping cart held by the cart store
///
/// The totals are derived fields, recalculated by the store after every
/// mutation; readers should treat them as authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingCart {
    /// Lines in insertion order, one per product id
    pub items: Vec<CartItem>,
    /// Selected delivery option
    pub delivery_option: Option<DeliveryOption>,
    /// Sum of all line totals
    pub items_total: Money,
    /// Cost of the selected delivery option, zero if none
    pub delivery_total: Money,
    /// `items_total + delivery_total`
    pub gross_total: Money,
    /// Time of the last mutation
    pub updated_at: Option<DateTime<Utc>>,
}

impl ShoppingCart {
    /// Sum of quantities over all lines
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Whether the cart has a line for `product_id`
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.product_id == product_id)
    }

    /// Quantity held for `product_id`, zero when absent
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| &item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recompute the derived totals from lines and delivery option
    pub fn recalculate(&mut self) {
        self.items_total = self.items.iter().map(CartItem::total).sum();
        self.delivery_total = self
            .delivery_option
            .as_ref()
            .map_or(Money::ZERO, |option| option.price);
        self.gross_total = self.items_total.saturating_add(self.delivery_total);
    }
}

/// A cart line joined with its catalog product, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    /// The cart line
    pub item: CartItem,
    /// The catalog product it refers to
    pub product: Product,
    /// `product.price × item.quantity`
    pub total_cost: Money,
}

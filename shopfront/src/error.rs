//! Error types for the storefront.

use shopfront_runtime::StoreError;
use thiserror::Error;

/// Failure of an external data source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source could not deliver its data
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        /// Which source failed (for display and logs)
        source_name: &'static str,
        /// Human readable cause
        reason: String,
    },

    /// Reading the backing file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing data was malformed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SourceError {
    /// Shorthand for [`SourceError::Unavailable`]
    pub fn unavailable(source_name: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            source_name,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the checkout view and its payment bridge
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// An order was requested for an empty cart
    #[error("Cannot create an order for an empty cart")]
    EmptyCart,

    /// The underlying store rejected the action
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias used by the checkout view
pub type CheckoutResult<T> = Result<T, CheckoutError>;

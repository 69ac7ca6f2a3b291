//! Configuration management for the storefront.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::payment::PaymentConfig;
use serde::{Deserialize, Serialize};
use shopfront_runtime::StoreConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopfrontConfig {
    /// Payment widget configuration
    pub payment: PaymentConfig,
    /// Data file configuration
    pub data: DataConfig,
    /// Store runtime configuration
    pub runtime: RuntimeConfig,
    /// Default log filter (overridden by `RUST_LOG`)
    pub log_level: String,
}

/// Location of the JSON files backing the sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Product catalog file
    pub products_path: PathBuf,
    /// Delivery options file
    pub delivery_options_path: PathBuf,
}

/// Settings applied to every view store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Graceful shutdown timeout in milliseconds
    pub shutdown_timeout_ms: u64,
}

impl RuntimeConfig {
    /// As a store configuration
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(Duration::from_millis(self.shutdown_timeout_ms))
    }
}

impl ShopfrontConfig {
    /// Load configuration from environment variables
    ///
    /// | variable | default |
    /// |---|---|
    /// | `SHOPFRONT_PAYMENT_CLIENT_ID` | `sb` |
    /// | `SHOPFRONT_CURRENCY` | `USD` |
    /// | `SHOPFRONT_PRODUCTS_PATH` | `shopfront/assets/products.json` |
    /// | `SHOPFRONT_DELIVERY_OPTIONS_PATH` | `shopfront/assets/delivery-options.json` |
    /// | `SHOPFRONT_SHUTDOWN_TIMEOUT_MS` | `5000` |
    /// | `SHOPFRONT_LOG_LEVEL` | `info` |
    ///
    /// Unparseable numbers fall back to their default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let parsed = |key: &str, default| parse_or(lookup(key), default);

        let payment = PaymentConfig::new(
            string("SHOPFRONT_PAYMENT_CLIENT_ID", "sb"),
            string("SHOPFRONT_CURRENCY", "USD"),
        );

        Self {
            payment,
            data: DataConfig {
                products_path: string(
                    "SHOPFRONT_PRODUCTS_PATH",
                    "shopfront/assets/products.json",
                )
                .into(),
                delivery_options_path: string(
                    "SHOPFRONT_DELIVERY_OPTIONS_PATH",
                    "shopfront/assets/delivery-options.json",
                )
                .into(),
            },
            runtime: RuntimeConfig {
                shutdown_timeout_ms: parsed("SHOPFRONT_SHUTDOWN_TIMEOUT_MS", 5000),
            },
            log_level: string("SHOPFRONT_LOG_LEVEL", "info"),
        }
    }
}

impl Default for ShopfrontConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ShopfrontConfig::default();

        assert_eq!(config.payment, PaymentConfig::default());
        assert_eq!(
            config.data.products_path,
            PathBuf::from("shopfront/assets/products.json")
        );
        assert_eq!(
            config.runtime.store_config().default_shutdown_timeout,
            Duration::from_secs(5)
        );
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SHOPFRONT_PAYMENT_CLIENT_ID", "live-client"),
            ("SHOPFRONT_CURRENCY", "EUR"),
            ("SHOPFRONT_SHUTDOWN_TIMEOUT_MS", " 250 "),
            ("SHOPFRONT_DELIVERY_OPTIONS_PATH", "/srv/delivery.json"),
        ]
        .into_iter()
        .collect();

        let config = ShopfrontConfig::from_lookup(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.payment.client_id, "live-client");
        assert_eq!(config.payment.currency, "EUR");
        assert_eq!(config.payment.intent, crate::payment::OrderIntent::Capture);
        assert_eq!(config.runtime.shutdown_timeout_ms, 250);
        assert_eq!(
            config.data.delivery_options_path,
            PathBuf::from("/srv/delivery.json")
        );
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = ShopfrontConfig::from_lookup(|key| {
            (key == "SHOPFRONT_SHUTDOWN_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert_eq!(config.runtime.shutdown_timeout_ms, 5000);
    }
}

//! External data sources: product catalog and delivery options
//!
//! Both sources are traits so the views can be wired to a remote service, a
//! JSON file or an in-memory fixture. Every call is a fresh fetch; nothing is
//! cached here.

use crate::error::SourceError;
use crate::types::{DeliveryOption, Product};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Boxed future returned by source fetches
pub type SourceFuture<T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send>>;

/// Supplies the full product catalog
pub trait CatalogSource: Send + Sync {
    /// Fetch every available product
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the catalog cannot be delivered.
    fn fetch_all_products(&self) -> SourceFuture<Vec<Product>>;
}

/// Supplies the available delivery options
pub trait DeliveryOptionSource: Send + Sync {
    /// Fetch every available delivery option
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the options cannot be delivered.
    fn fetch_all_delivery_options(&self) -> SourceFuture<Vec<DeliveryOption>>;
}

// ============================================================================
// In-memory sources
// ============================================================================

#[derive(Debug)]
struct Fixture<T> {
    records: Vec<T>,
    latency: Duration,
    scheduled_latencies: VecDeque<Duration>,
    failure: Option<String>,
}

/// In-memory source for development and tests
///
/// Clones share the same records, so a test can keep a handle and change the
/// data, inject latency or make the next fetches fail while a view is using
/// the source.
#[derive(Debug, Clone)]
pub struct InMemorySource<T> {
    name: &'static str,
    fixture: Arc<Mutex<Fixture<T>>>,
    fetches: Arc<AtomicUsize>,
}

/// In-memory product catalog
pub type InMemoryCatalog = InMemorySource<Product>;

/// In-memory delivery options
pub type InMemoryDeliveryOptions = InMemorySource<DeliveryOption>;

impl<T: Clone + Send + 'static> InMemorySource<T> {
    fn with_name(name: &'static str, records: Vec<T>) -> Self {
        Self {
            name,
            fixture: Arc::new(Mutex::new(Fixture {
                records,
                latency: Duration::ZERO,
                scheduled_latencies: VecDeque::new(),
                failure: None,
            })),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay every fetch by `latency`
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Replace the records returned by later fetches
    pub fn set_records(&self, records: Vec<T>) {
        self.lock().records = records;
    }

    /// Use `latency` for the next fetch only
    ///
    /// Scheduled latencies are consumed in order, one per fetch.
    pub fn schedule_latency(&self, latency: Duration) {
        self.lock().scheduled_latencies.push_back(latency);
    }

    /// Make every later fetch fail with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.lock().failure = Some(reason.into());
    }

    /// Stop failing
    pub fn recover(&self) {
        self.lock().failure = None;
    }

    /// Number of fetches started so far
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn fetch(&self) -> SourceFuture<Vec<T>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        // Snapshot at call time; the returned future owns its data.
        let (outcome, latency) = {
            let mut fixture = self.lock();
            let latency = fixture
                .scheduled_latencies
                .pop_front()
                .unwrap_or(fixture.latency);
            let outcome = match &fixture.failure {
                Some(reason) => Err(SourceError::unavailable(self.name, reason.clone())),
                None => Ok(fixture.records.clone()),
            };
            (outcome, latency)
        };

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            outcome
        })
    }

    fn lock(&self) -> MutexGuard<'_, Fixture<T>> {
        self.fixture.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InMemorySource<Product> {
    /// Catalog serving `products`
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self::with_name("catalog", products)
    }
}

impl InMemorySource<DeliveryOption> {
    /// Delivery options serving `options`
    #[must_use]
    pub fn new(options: Vec<DeliveryOption>) -> Self {
        Self::with_name("delivery options", options)
    }
}

impl CatalogSource for InMemorySource<Product> {
    fn fetch_all_products(&self) -> SourceFuture<Vec<Product>> {
        self.fetch()
    }
}

impl DeliveryOptionSource for InMemorySource<DeliveryOption> {
    fn fetch_all_delivery_options(&self) -> SourceFuture<Vec<DeliveryOption>> {
        self.fetch()
    }
}

// ============================================================================
// JSON file sources
// ============================================================================

/// Source reading a JSON array from a file on every fetch
#[derive(Debug, Clone)]
pub struct JsonFileSource<T> {
    path: PathBuf,
    _records: PhantomData<fn() -> T>,
}

/// Product catalog backed by a JSON file
pub type JsonFileCatalog = JsonFileSource<Product>;

/// Delivery options backed by a JSON file
pub type JsonFileDeliveryOptions = JsonFileSource<DeliveryOption>;

impl<T: DeserializeOwned + Send + 'static> JsonFileSource<T> {
    /// Source reading `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _records: PhantomData,
        }
    }

    /// The backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fetch(&self) -> SourceFuture<Vec<T>> {
        let path = self.path.clone();
        Box::pin(async move {
            let raw = tokio::fs::read_to_string(&path).await?;
            let records = serde_json::from_str(&raw)?;
            tracing::debug!(path = %path.display(), "Loaded records from file");
            Ok(records)
        })
    }
}

impl CatalogSource for JsonFileSource<Product> {
    fn fetch_all_products(&self) -> SourceFuture<Vec<Product>> {
        self.fetch()
    }
}

impl DeliveryOptionSource for JsonFileSource<DeliveryOption> {
    fn fetch_all_delivery_options(&self) -> SourceFuture<Vec<DeliveryOption>> {
        self.fetch()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::money::Money;

    fn products() -> Vec<Product> {
        vec![
            Product::new("a", "Alpha", Money::from_cents(1000)),
            Product::new("b", "Beta", Money::from_cents(500)),
        ]
    }

    #[tokio::test]
    async fn test_in_memory_catalog_fetches_fresh_snapshot() {
        let catalog = InMemoryCatalog::new(products());

        assert_eq!(catalog.fetch_all_products().await.unwrap().len(), 2);

        catalog.set_records(vec![Product::new("c", "Gamma", Money::ZERO)]);
        let fetched = catalog.fetch_all_products().await.unwrap();
        assert_eq!(fetched[0].id.as_str(), "c");
        assert_eq!(catalog.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_failure_and_recovery() {
        let options = InMemoryDeliveryOptions::new(vec![]);
        options.fail_with("timeout");

        let err = options.fetch_all_delivery_options().await.unwrap_err();
        assert_eq!(err.to_string(), "delivery options unavailable: timeout");

        options.recover();
        assert!(options.fetch_all_delivery_options().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scheduled_latency_applies_once() {
        let catalog = InMemoryCatalog::new(products()).with_latency(Duration::from_millis(1));
        catalog.schedule_latency(Duration::from_millis(300));

        let slow = catalog.fetch_all_products();
        let fast = catalog.fetch_all_products();

        let start = std::time::Instant::now();
        fast.await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(300));
        slow.await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_json_file_catalog_reads_bundled_assets() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/products.json");
        let catalog = JsonFileCatalog::new(path);

        let products = catalog.fetch_all_products().await.unwrap();
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| !p.name.is_empty()));
    }

    #[tokio::test]
    async fn test_json_file_missing_is_io_error() {
        let options = JsonFileDeliveryOptions::new("/nonexistent/delivery-options.json");

        let err = options.fetch_all_delivery_options().await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}

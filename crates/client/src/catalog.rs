//! Car catalog store and display projection.
//!
//! The store fronts the public car endpoints with a `moka` cache (5-minute
//! TTL by default) and an observable fetch status. Collection fetches never
//! fail outward: a failed load reports through the status channel and
//! resolves to an empty list so views degrade instead of crash.
//!
//! [`project`] is the pure half: filtering and sorting for display, with no
//! I/O and no mutation of its input.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument};

use rent_wheels_core::{CarCategory, CarId, CarStatus};

use crate::api::{BackendClient, Car};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};

const CACHE_KEY_ALL: &str = "cars:all";

fn car_key(id: &CarId) -> String {
    format!("car:{id}")
}

/// Cached values, keyed by `cars:all` or `car:{id}`.
#[derive(Clone)]
enum CacheValue {
    All(Vec<Car>),
    One(Box<Car>),
}

/// Why a catalog fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The backend never answered.
    #[error("catalog unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with a non-success status.
    #[error("catalog request rejected with status {status}")]
    Rejected { status: u16 },

    /// The payload was not the JSON we expected.
    #[error("malformed catalog payload: {0}")]
    Malformed(String),
}

impl CatalogError {
    fn classify(err: &ApiError) -> Self {
        match err {
            ApiError::Network(e) => Self::Unreachable(e.to_string()),
            ApiError::Decode(e) => Self::Malformed(e.to_string()),
            ApiError::Unauthorized { status } | ApiError::Backend { status, .. } => {
                Self::Rejected {
                    status: status.as_u16(),
                }
            }
            ApiError::NotFound(_) => Self::Rejected { status: 404 },
            ApiError::Conflict(_) => Self::Rejected { status: 409 },
        }
    }
}

/// Observable fetch lifecycle, for skeleton and error rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatalogStatus {
    /// No fetch has happened yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch succeeded.
    Ready { count: usize },
    /// The last fetch failed; the catalog presented as empty.
    Failed(CatalogError),
}

/// Cached, observable access to the car catalog.
///
/// Cheaply cloneable; clones share the cache and the status channel.
#[derive(Clone)]
pub struct CarCatalogStore {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    api: BackendClient,
    cache: Cache<String, CacheValue>,
    status: watch::Sender<CatalogStatus>,
}

impl CarCatalogStore {
    /// Create a store over `api`, tuned by `config`.
    #[must_use]
    pub fn new(api: BackendClient, config: &ClientConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.catalog_capacity)
            .time_to_live(config.catalog_ttl)
            .build();
        let (status, _) = watch::channel(CatalogStatus::Idle);

        Self {
            inner: Arc::new(CatalogInner { api, cache, status }),
        }
    }

    /// The fetch status as of now.
    #[must_use]
    pub fn status(&self) -> CatalogStatus {
        self.inner.status.borrow().clone()
    }

    /// Subscribe to fetch status changes.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<CatalogStatus> {
        self.inner.status.subscribe()
    }

    /// Fetch the whole catalog.
    ///
    /// Serves from cache while fresh. A failed fetch resolves to an empty
    /// list and reports the classified error through the status channel.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> Vec<Car> {
        if let Some(CacheValue::All(cars)) = self.inner.cache.get(CACHE_KEY_ALL).await {
            debug!("Cache hit for catalog");
            self.set_status(CatalogStatus::Ready { count: cars.len() });
            return cars;
        }

        self.set_status(CatalogStatus::Loading);

        match self.inner.api.cars().await {
            Ok(cars) => {
                self.inner
                    .cache
                    .insert(CACHE_KEY_ALL.to_string(), CacheValue::All(cars.clone()))
                    .await;
                self.set_status(CatalogStatus::Ready { count: cars.len() });
                cars
            }
            Err(e) => {
                tracing::error!("Failed to fetch the car catalog: {e}");
                self.set_status(CatalogStatus::Failed(CatalogError::classify(&e)));
                Vec::new()
            }
        }
    }

    /// Fetch one car, for the detail view.
    ///
    /// Unlike [`fetch_all`](Self::fetch_all) this propagates errors; a
    /// missing car is `NotFound`, not an empty screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the car does not exist or the request fails.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn fetch_car(&self, id: &CarId) -> ApiResult<Car> {
        let cache_key = car_key(id);

        if let Some(CacheValue::One(car)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for car");
            return Ok(*car);
        }

        let car = self.inner.api.car(id).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::One(Box::new(car.clone())))
            .await;

        Ok(car)
    }

    /// Record a confirmed status change without refetching.
    ///
    /// Updates both cached copies of the car so the next read agrees with
    /// what the backend just confirmed.
    pub async fn mark_status(&self, id: &CarId, status: CarStatus) {
        let cache_key = car_key(id);

        if let Some(CacheValue::One(mut car)) = self.inner.cache.get(&cache_key).await {
            car.status = status;
            self.inner
                .cache
                .insert(cache_key, CacheValue::One(car))
                .await;
        }

        if let Some(CacheValue::All(mut cars)) = self.inner.cache.get(CACHE_KEY_ALL).await {
            if let Some(car) = cars.iter_mut().find(|car| car.id == *id) {
                car.status = status;
            }
            self.inner
                .cache
                .insert(CACHE_KEY_ALL.to_string(), CacheValue::All(cars))
                .await;
        }
    }

    /// Drop cached copies of one car, and the collection that contains it.
    ///
    /// The next read refetches from the backend; used when only the backend
    /// knows the car's real state, e.g. after a cancellation.
    pub async fn invalidate_car(&self, id: &CarId) {
        self.inner.cache.invalidate(&car_key(id)).await;
        self.inner.cache.invalidate(CACHE_KEY_ALL).await;
    }

    /// Drop everything cached.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    fn set_status(&self, next: CatalogStatus) {
        self.inner.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

// =============================================================================
// Display Projection
// =============================================================================

/// Price buckets offered by the catalog filter controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceRange {
    #[serde(rename = "0-50")]
    UpTo50,
    #[serde(rename = "51-100")]
    To100,
    #[serde(rename = "101-200")]
    To200,
    #[serde(rename = "200+")]
    Above200,
}

impl PriceRange {
    /// Whether `price` falls in this bucket. Buckets tile the whole axis, so
    /// every non-negative price lands in exactly one.
    #[must_use]
    pub fn contains(self, price: Decimal) -> bool {
        match self {
            Self::UpTo50 => price >= Decimal::ZERO && price <= Decimal::from(50),
            Self::To100 => price > Decimal::from(50) && price <= Decimal::from(100),
            Self::To200 => price > Decimal::from(100) && price <= Decimal::from(200),
            Self::Above200 => price > Decimal::from(200),
        }
    }

    /// The label shown in filter controls.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UpTo50 => "0-50",
            Self::To100 => "51-100",
            Self::To200 => "101-200",
            Self::Above200 => "200+",
        }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PriceRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0-50" => Ok(Self::UpTo50),
            "51-100" => Ok(Self::To100),
            "101-200" => Ok(Self::To200),
            "200+" => Ok(Self::Above200),
            other => Err(format!("unknown price range: {other}")),
        }
    }
}

/// Catalog view request. Every field is optional; set fields are conjunctive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    /// Case-insensitive free text over name, category, provider name, and
    /// description.
    pub text: Option<String>,
    /// Exact category match.
    pub category: Option<CarCategory>,
    /// Price bucket match.
    pub price_range: Option<PriceRange>,
}

impl CatalogFilter {
    fn matches(&self, car: &Car) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = car.name.to_lowercase().contains(&needle)
                || car.category.to_lowercase().contains(&needle)
                || car.provider_name.to_lowercase().contains(&needle)
                || car.description.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(category) = self.category
            && car.category != category.as_str()
        {
            return false;
        }

        if let Some(range) = self.price_range
            && !range.contains(car.price_per_day)
        {
            return false;
        }

        true
    }
}

/// Sort orders for the projected catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogSort {
    /// Name A to Z, case-insensitive.
    #[default]
    NameAsc,
    /// Cheapest first.
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
}

/// Project the catalog for display.
///
/// Pure: filters conjunctively, sorts stably, touches nothing. Projecting an
/// already projected list with the same arguments returns it unchanged.
#[must_use]
pub fn project(cars: &[Car], filter: &CatalogFilter, sort: CatalogSort) -> Vec<Car> {
    let mut projected: Vec<Car> = cars.iter().filter(|car| filter.matches(car)).cloned().collect();

    match sort {
        CatalogSort::NameAsc => projected.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        }),
        CatalogSort::PriceAsc => projected.sort_by(|a, b| a.price_per_day.cmp(&b.price_per_day)),
        CatalogSort::PriceDesc => projected.sort_by(|a, b| b.price_per_day.cmp(&a.price_per_day)),
    }

    projected
}

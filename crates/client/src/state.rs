//! Client state shared across views.

use std::sync::Arc;

use crate::api::{self, BackendClient};
use crate::booking::BookingWorkflow;
use crate::catalog::CarCatalogStore;
use crate::config::{ClientConfig, ConfigError};
use crate::dashboard::DashboardAggregator;
use crate::error::ApiError;
use crate::session::{IdentityProvider, IdentitySession};
use crate::token::AccessTokenBroker;

/// Error building the shared client state.
#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] ApiError),
}

/// Client state shared across all views.
///
/// This struct is cheaply cloneable via `Arc`; clones share the HTTP
/// connection pool, the token slot, and the catalog cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    broker: AccessTokenBroker,
    api: BackendClient,
    catalog: CarCatalogStore,
}

impl AppState {
    /// Create the shared client state.
    ///
    /// One HTTP client backs both the token broker and the backend client,
    /// so they share a connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, AppStateError> {
        let http = api::build_http(&config)?;
        let broker = AccessTokenBroker::new(http.clone(), config.api_base_url.as_str());
        let api = BackendClient::with_http(http, &config, broker.clone());
        let catalog = CarCatalogStore::new(api.clone(), &config);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                broker,
                api,
                catalog,
            }),
        })
    }

    /// Create the shared client state from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid, or
    /// if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, AppStateError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the access token broker.
    #[must_use]
    pub fn broker(&self) -> &AccessTokenBroker {
        &self.inner.broker
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn api(&self) -> &BackendClient {
        &self.inner.api
    }

    /// Get a reference to the car catalog store.
    #[must_use]
    pub fn catalog(&self) -> &CarCatalogStore {
        &self.inner.catalog
    }

    /// Build an identity session on top of `provider`.
    ///
    /// The session shares this state's token broker, so a sign-in here is
    /// visible to every API call made through [`AppState::api`].
    pub fn session<P: IdentityProvider>(&self, provider: P) -> IdentitySession<P> {
        IdentitySession::new(provider, self.inner.broker.clone())
    }

    /// Build a booking workflow for one car detail view.
    #[must_use]
    pub fn booking(&self) -> BookingWorkflow {
        BookingWorkflow::new(
            self.inner.api.clone(),
            self.inner.broker.clone(),
            self.inner.catalog.clone(),
        )
    }

    /// Build the dashboard aggregator.
    #[must_use]
    pub fn dashboard(&self) -> DashboardAggregator {
        DashboardAggregator::new(self.inner.api.clone())
    }
}

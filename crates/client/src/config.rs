//! Configuration management for the RentWheels client.
//!
//! Loads settings from environment variables, with `.env` file support via
//! `dotenvy`. The backend URL is required; timeouts and cache tuning have
//! defaults.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Environment variable naming the backend base URL.
pub const API_URL_VAR: &str = "RENT_WHEELS_API_URL";

const CONNECT_TIMEOUT_VAR: &str = "RENT_WHEELS_CONNECT_TIMEOUT_SECS";
const REQUEST_TIMEOUT_VAR: &str = "RENT_WHEELS_REQUEST_TIMEOUT_SECS";
const CATALOG_TTL_VAR: &str = "RENT_WHEELS_CATALOG_TTL_SECS";
const CATALOG_CAPACITY_VAR: &str = "RENT_WHEELS_CATALOG_CAPACITY";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_TTL_SECS: u64 = 300; // 5 minutes
const DEFAULT_CATALOG_CAPACITY: u64 = 1000;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidEnvVar { key: String, message: String },
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the RentWheels backend, e.g. `https://api.rentwheels.app`.
    pub api_base_url: Url,
    /// TCP connect timeout for every backend call.
    pub connect_timeout: Duration,
    /// Whole-request timeout for every backend call.
    pub request_timeout: Duration,
    /// How long catalog entries stay fresh.
    pub catalog_ttl: Duration,
    /// Maximum number of cached catalog entries.
    pub catalog_capacity: u64,
}

impl ClientConfig {
    /// Create a configuration for `api_base_url` with default timeouts and
    /// cache tuning.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            catalog_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
            catalog_capacity: DEFAULT_CATALOG_CAPACITY,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if `RENT_WHEELS_API_URL` is missing or any variable
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if it doesn't exist)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key-value lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests supply maps.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is missing or any value fails to
    /// parse.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(&require(&lookup, API_URL_VAR)?)?;

        Ok(Self {
            api_base_url,
            connect_timeout: duration_or_default(
                &lookup,
                CONNECT_TIMEOUT_VAR,
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
            request_timeout: duration_or_default(
                &lookup,
                REQUEST_TIMEOUT_VAR,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            catalog_ttl: duration_or_default(&lookup, CATALOG_TTL_VAR, DEFAULT_CATALOG_TTL_SECS)?,
            catalog_capacity: u64_or_default(
                &lookup,
                CATALOG_CAPACITY_VAR,
                DEFAULT_CATALOG_CAPACITY,
            )?,
        })
    }
}

/// Get a required variable from the lookup.
fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse and validate the backend base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar {
        key: API_URL_VAR.to_string(),
        message: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEnvVar {
            key: API_URL_VAR.to_string(),
            message: format!("unsupported scheme: {}", url.scheme()),
        });
    }

    Ok(url)
}

/// Get an optional duration (in whole seconds) with a default.
fn duration_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(u64_or_default(lookup, key, default_secs)?))
}

/// Get an optional `u64` variable with a default.
fn u64_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidEnvVar {
            key: key.to_string(),
            message: format!("expected an integer, got {raw:?}"),
        }),
        None => Ok(default),
    }
}

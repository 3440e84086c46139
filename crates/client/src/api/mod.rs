//! RentWheels backend API client.
//!
//! A thin REST client over `reqwest` 0.13. Endpoints that require
//! authorization go through the [`AccessTokenBroker`]; any 401/403 response
//! revokes the held token before the error reaches the caller, so every part
//! of the client observes session expiry at the same moment.

pub mod types;

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{error, instrument, warn};

use rent_wheels_core::{BookingId, CarId, Email};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::token::AccessTokenBroker;

pub use types::{Booking, BookingDraft, Car, CarDraft, CarPatch, DeleteOutcome};

/// Build the HTTP client used for every backend call.
pub(crate) fn build_http(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()?)
}

/// Client for the RentWheels backend.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: String,
    broker: AccessTokenBroker,
}

impl BackendClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, broker: AccessTokenBroker) -> Result<Self, ApiError> {
        let http = build_http(config)?;
        Ok(Self::with_http(http, config, broker))
    }

    /// Create a client reusing an already built HTTP client.
    #[must_use]
    pub fn with_http(
        http: reqwest::Client,
        config: &ClientConfig,
        broker: AccessTokenBroker,
    ) -> Self {
        Self {
            inner: Arc::new(BackendClientInner {
                http,
                base_url: config
                    .api_base_url
                    .as_str()
                    .trim_end_matches('/')
                    .to_string(),
                broker,
            }),
        }
    }

    // =========================================================================
    // Car Endpoints
    // =========================================================================

    /// All car listings. Public, no token required.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn cars(&self) -> ApiResult<Vec<Car>> {
        let url = self.url("cars");
        self.execute(self.inner.http.get(url), "cars").await
    }

    /// One car by id. Public, no token required.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the car does not exist.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn car(&self, id: &CarId) -> ApiResult<Car> {
        let url = self.url(&format!("cars/{id}"));
        self.execute(self.inner.http.get(url), &format!("car {id}"))
            .await
    }

    /// List a new car. Requires a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is unauthorized.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_car(&self, draft: &CarDraft) -> ApiResult<Car> {
        let url = self.url("cars");
        let request = self
            .inner
            .broker
            .attach(self.inner.http.post(url).json(draft));
        self.execute(request, "cars").await
    }

    /// Update fields of an existing car. Requires a token. Returns the
    /// record as the backend now holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if the car is missing or the caller is unauthorized.
    #[instrument(skip(self, patch), fields(id = %id))]
    pub async fn update_car(&self, id: &CarId, patch: &CarPatch) -> ApiResult<Car> {
        let url = self.url(&format!("cars/{id}"));
        let request = self
            .inner
            .broker
            .attach(self.inner.http.put(url).json(patch));
        self.execute(request, &format!("car {id}")).await
    }

    /// Remove a listing. Requires a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is unauthorized.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_car(&self, id: &CarId) -> ApiResult<DeleteOutcome> {
        let url = self.url(&format!("cars/{id}"));
        let request = self.inner.broker.attach(self.inner.http.delete(url));
        self.execute(request, &format!("car {id}")).await
    }

    /// The provider's own listings. Requires a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is unauthorized.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn my_listings(&self, email: &Email) -> ApiResult<Vec<Car>> {
        let url = self.url("my-listings");
        let request = self.inner.broker.attach(
            self.inner
                .http
                .get(url)
                .query(&[("email", email.as_str())]),
        );
        self.execute(request, "my-listings").await
    }

    // =========================================================================
    // Booking Endpoints
    // =========================================================================

    /// The caller's bookings. Requires a token; the backend scopes the list
    /// to the email behind it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is unauthorized.
    #[instrument(skip(self))]
    pub async fn bookings(&self) -> ApiResult<Vec<Booking>> {
        let url = self.url("bookings");
        let request = self.inner.broker.attach(self.inner.http.get(url));
        self.execute(request, "bookings").await
    }

    /// Submit a booking. Requires a token.
    ///
    /// The backend is the arbiter of contention: a car someone else booked
    /// first comes back as `Conflict` no matter what our cached copy said.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the caller is unauthorized, or
    /// the car is already booked.
    #[instrument(skip(self, draft), fields(car_id = %draft.car_id))]
    pub async fn create_booking(&self, draft: &BookingDraft) -> ApiResult<Booking> {
        let url = self.url("bookings");
        let request = self
            .inner
            .broker
            .attach(self.inner.http.post(url).json(draft));
        self.execute(request, "bookings").await
    }

    /// Cancel a booking. Requires a token. A zero `deletedCount` in the
    /// outcome means the booking was already gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is unauthorized.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_booking(&self, id: &BookingId) -> ApiResult<DeleteOutcome> {
        let url = self.url(&format!("bookings/{id}"));
        let request = self.inner.broker.attach(self.inner.http.delete(url));
        self.execute(request, &format!("booking {id}")).await
    }

    // =========================================================================
    // Request Plumbing
    // =========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    /// Send `request` and decode the JSON response.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, resource, "unauthorized response, revoking session token");
            self.inner.broker.revoke();
            return Err(ApiError::Unauthorized { status });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(resource.to_owned()));
        }

        if status == StatusCode::CONFLICT {
            return Err(ApiError::Conflict(error_message(&body)));
        }

        if !status.is_success() {
            error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "backend returned non-success status"
            );
            return Err(ApiError::Backend {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "failed to parse backend response"
                );
                Err(ApiError::Decode(e))
            }
        }
    }
}

/// Pull the human-readable message out of an error body, if there is one.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| body.chars().take(200).collect(), |parsed| parsed.message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    fn client(base: &str) -> BackendClient {
        let config = ClientConfig::new(Url::parse(base).unwrap());
        let broker = AccessTokenBroker::new(reqwest::Client::new(), base);
        BackendClient::new(&config, broker).unwrap()
    }

    #[test]
    fn test_urls_join_without_doubled_slashes() {
        let client = client("http://localhost:4100/");

        assert_eq!(client.url("cars"), "http://localhost:4100/cars");
        assert_eq!(
            client.url("bookings/b-1"),
            "http://localhost:4100/bookings/b-1"
        );
    }

    #[test]
    fn test_error_message_prefers_structured_body() {
        assert_eq!(
            error_message(r#"{"message": "car already booked"}"#),
            "car already booked"
        );
        assert_eq!(error_message("plain text"), "plain text");
    }
}

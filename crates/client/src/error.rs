//! Transport-level error type shared by every backend call.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the RentWheels backend client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed: DNS, connect, TLS, or timeout.
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend refused the bearer token (401) or the caller's claim on
    /// the resource (403). Either way the session is over.
    #[error("Unauthorized ({status})")]
    Unauthorized { status: StatusCode },

    /// The resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The backend rejected the mutation as contended, e.g. booking a car
    /// someone else just booked.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success response.
    #[error("Backend returned {status}: {body}")]
    Backend { status: StatusCode, body: String },
}

impl ApiError {
    /// True for the 401/403 responses that force global session expiry.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// True when the request never reached the backend.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Convenience alias for backend call results.
pub type ApiResult<T> = Result<T, ApiError>;

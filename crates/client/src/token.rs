//! Access-token brokerage.
//!
//! One broker owns the single mutable token slot for the whole client.
//! `acquire` and invalidation are the only writers; everything else takes
//! snapshots. The token itself is opaque, the backend alone decides when it
//! stops being honored.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use rent_wheels_core::Email;

use crate::guard::LoginRedirect;

/// Request body for the token endpoint.
#[derive(Serialize)]
struct TokenRequest<'a> {
    email: &'a str,
}

/// Response body from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// An issued access token.
///
/// Carries the email it was issued for and when we obtained it. There is no
/// expiry field; a token is good until the backend says otherwise.
#[derive(Clone)]
pub struct AccessToken {
    value: SecretString,
    issued_for: Email,
    obtained_at: DateTime<Utc>,
}

impl AccessToken {
    fn new(value: String, issued_for: Email) -> Self {
        Self {
            value: SecretString::from(value),
            issued_for,
            obtained_at: Utc::now(),
        }
    }

    /// The email this token was issued for.
    #[must_use]
    pub fn issued_for(&self) -> &Email {
        &self.issued_for
    }

    /// When the broker obtained this token.
    #[must_use]
    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }

    fn bearer_value(&self) -> &str {
        self.value.expose_secret()
    }
}

// Manual Debug to keep the token value out of logs.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("issued_for", &self.issued_for)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Errors acquiring a token.
#[derive(Debug, Error)]
pub enum TokenAcquisitionError {
    /// The token endpoint never answered.
    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint refused ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    /// The response was not the JSON we expected.
    #[error("malformed token response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Broker for the backend access token.
///
/// Cheaply cloneable; all clones share the same token slot.
#[derive(Clone)]
pub struct AccessTokenBroker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    http: reqwest::Client,
    token_url: String,
    slot: RwLock<Option<AccessToken>>,
}

impl AccessTokenBroker {
    /// Create a broker for the backend at `base_url`.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                http,
                token_url: format!("{}/token", base_url.trim_end_matches('/')),
                slot: RwLock::new(None),
            }),
        }
    }

    /// Exchange a verified email for a backend token and store it.
    ///
    /// Exactly one attempt is made; token issuance is not retried. On failure
    /// the slot keeps whatever it held before.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable, refuses the request,
    /// or answers with something other than a token.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn acquire(&self, email: &Email) -> Result<AccessToken, TokenAcquisitionError> {
        let response = self
            .inner
            .http
            .post(&self.inner.token_url)
            .json(&TokenRequest {
                email: email.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TokenAcquisitionError::Rejected {
                status,
                message: body.chars().take(200).collect(),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        let token = AccessToken::new(parsed.token, email.clone());

        *self.write_slot() = Some(token.clone());
        debug!("access token stored");

        Ok(token)
    }

    /// Attach the held token to `request` as a bearer header.
    ///
    /// With no token the request goes out unauthenticated and the backend
    /// rejects it; absence is not an error here.
    #[must_use]
    pub fn attach(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.snapshot() {
            Some(token) => request.bearer_auth(token.bearer_value()),
            None => request,
        }
    }

    /// The token currently held, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<AccessToken> {
        self.read_slot().clone()
    }

    /// Drop the held token, e.g. on sign-out.
    pub fn revoke(&self) {
        *self.write_slot() = None;
    }

    /// Treat `status` as fatal to the session when it is 401 or 403.
    ///
    /// The token is revoked regardless of which operation produced the
    /// response, and the returned redirect carries `origin` so sign-in can
    /// resume there. Any other status changes nothing.
    pub fn invalidate_on_auth_failure(
        &self,
        status: StatusCode,
        origin: &str,
    ) -> Option<LoginRedirect> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, origin, "authorization failed, expiring session token");
            self.revoke();
            Some(LoginRedirect {
                return_to: origin.to_owned(),
            })
        } else {
            None
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Option<AccessToken>> {
        self.inner.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<AccessToken>> {
        self.inner
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

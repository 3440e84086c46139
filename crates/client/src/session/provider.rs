//! External identity authority.
//!
//! The marketplace never sees credentials. An [`IdentityProvider`]
//! implementation wraps whatever interactive flow the platform offers
//! (OAuth popup, system browser, native sheet) and reports back verified
//! identities; the session only needs these three primitives.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rent_wheels_core::{Email, ProviderUserId};

/// Which interactive sign-in surface to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Facebook,
    Github,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::Github => "github",
        };
        f.write_str(name)
    }
}

/// Failures reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The sign-in method is not enabled for this application.
    #[error("sign-in method not available: {0}")]
    Unavailable(String),

    /// The user dismissed the interactive flow. Not a fault.
    #[error("sign-in cancelled")]
    UserCancelled,

    /// Anything else the provider reports.
    #[error("identity provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Map a provider error code to our taxonomy.
    ///
    /// Providers report `auth/...` codes; only a few change what the caller
    /// should do about it.
    #[must_use]
    pub fn from_code(code: &str, message: &str) -> Self {
        match code {
            "auth/operation-not-allowed" => Self::Unavailable(message.to_owned()),
            "auth/popup-closed-by-user" | "auth/cancelled-popup-request" => Self::UserCancelled,
            _ => Self::Other(format!("{code}: {message}")),
        }
    }
}

/// A verified identity as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: ProviderUserId,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(
        rename = "photoURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
}

impl UserIdentity {
    /// Display name, or the placeholder used for providers that withhold it.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Anonymous")
    }
}

/// The external identity authority the session delegates to.
///
/// `restore` answers whether a previous session survived a restart; the other
/// two are commands issued by the session on the user's behalf.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Resolve a previously persisted session, if the provider still has one.
    fn restore(&self) -> impl Future<Output = Option<UserIdentity>> + Send;

    /// Run the interactive sign-in flow for `kind`.
    fn sign_in(&self, kind: ProviderKind)
    -> impl Future<Output = Result<UserIdentity, ProviderError>> + Send;

    /// Terminate the provider-side session.
    fn sign_out(&self) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_display_and_serde() {
        assert_eq!(ProviderKind::Google.to_string(), "google");
        assert_eq!(ProviderKind::Github.to_string(), "github");
        assert_eq!(
            serde_json::to_string(&ProviderKind::Facebook).unwrap(),
            "\"facebook\""
        );
    }

    #[test]
    fn test_error_code_classification() {
        let unavailable =
            ProviderError::from_code("auth/operation-not-allowed", "Google sign-in is disabled");
        assert!(matches!(unavailable, ProviderError::Unavailable(_)));

        let cancelled = ProviderError::from_code("auth/popup-closed-by-user", "");
        assert_eq!(cancelled, ProviderError::UserCancelled);

        let other = ProviderError::from_code("auth/network-request-failed", "offline");
        assert!(matches!(other, ProviderError::Other(_)));
    }

    #[test]
    fn test_display_label_fallback() {
        let mut identity = UserIdentity {
            id: ProviderUserId::new("uid-1"),
            email: "renter@example.com".parse().unwrap(),
            display_name: Some("Robin Vale".to_string()),
            photo_url: None,
        };

        assert_eq!(identity.display_label(), "Robin Vale");

        identity.display_name = None;
        assert_eq!(identity.display_label(), "Anonymous");
    }

    #[test]
    fn test_identity_serde_shape() {
        let identity = UserIdentity {
            id: ProviderUserId::new("uid-1"),
            email: "renter@example.com".parse().unwrap(),
            display_name: None,
            photo_url: Some("https://img.example.com/avatar.png".to_string()),
        };

        let value = serde_json::to_value(&identity).unwrap();

        assert_eq!(value["photoURL"], "https://img.example.com/avatar.png");
        assert!(value.get("displayName").is_none());
    }
}

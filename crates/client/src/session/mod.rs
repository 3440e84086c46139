//! Identity session state machine.
//!
//! Wraps an [`IdentityProvider`] in an observable state machine:
//! `Uninitialized` until `initialize` runs, `Resolving` while the provider
//! is consulted, then `Authenticated` or `Anonymous`. Subscribers hear about
//! every transition through a `tokio::sync::watch` channel; dropping the
//! subscription is unsubscription.

pub mod provider;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::token::{AccessTokenBroker, TokenAcquisitionError};

pub use provider::{IdentityProvider, ProviderError, ProviderKind, UserIdentity};

/// Where identity resolution currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// `initialize` has not run yet.
    #[default]
    Uninitialized,
    /// Waiting on the provider to confirm or deny a persisted session.
    Resolving,
    /// The provider vouched for this identity.
    Authenticated(UserIdentity),
    /// Resolution finished with no identity.
    Anonymous,
}

impl SessionState {
    /// Whether resolution is still pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Resolving)
    }

    /// The signed-in identity, if there is one.
    #[must_use]
    pub const fn identity(&self) -> Option<&UserIdentity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Resolving => "resolving",
            Self::Authenticated(_) => "authenticated",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Errors from the interactive sign-in flow.
#[derive(Debug, Error)]
pub enum SignInError {
    /// The provider refused or the user backed out; nothing changed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider vouched for the user but the backend issued no token.
    /// The session is `Authenticated`; protected calls will be rejected
    /// until a token is acquired.
    #[error("signed in, but token issuance failed: {0}")]
    Token(#[from] TokenAcquisitionError),
}

/// Handle for identity-change notifications.
///
/// Dropping it unsubscribes; there is no registration to leak.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: watch::Receiver<SessionState>,
}

impl SessionSubscription {
    /// The state as of now.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next transition and return the new state.
    ///
    /// Returns `None` once the session itself has been dropped.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Explicit unsubscription; identical to dropping the handle.
    pub fn unsubscribe(self) {}
}

/// The identity session.
///
/// Generic over the provider so platforms can plug in their own interactive
/// flow. All observers share one watch channel.
pub struct IdentitySession<P> {
    provider: P,
    broker: AccessTokenBroker,
    state: watch::Sender<SessionState>,
}

impl<P: IdentityProvider> IdentitySession<P> {
    /// Create a session in `Uninitialized`.
    #[must_use]
    pub fn new(provider: P, broker: AccessTokenBroker) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            provider,
            broker,
            state,
        }
    }

    /// The state as of now.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.state.subscribe(),
        }
    }

    /// Resolve any persisted provider session.
    ///
    /// Emits `Resolving`, then ends in `Authenticated` or `Anonymous`; a
    /// silent provider means `Anonymous`, never an error. Route guards hold
    /// their decisions for the `Resolving` window.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionState {
        self.transition(SessionState::Resolving);

        let resolved = match self.provider.restore().await {
            Some(identity) => SessionState::Authenticated(identity),
            None => SessionState::Anonymous,
        };

        self.transition(resolved.clone());
        resolved
    }

    /// Run the interactive sign-in flow for `kind`.
    ///
    /// On provider success the identity is announced immediately, then a
    /// backend token is acquired for its email. Token failure does not undo
    /// the sign-in; the provider has vouched for the user even when the
    /// token endpoint is down.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider refuses or token issuance fails.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn sign_in_with_provider(
        &self,
        kind: ProviderKind,
    ) -> Result<UserIdentity, SignInError> {
        let identity = self.provider.sign_in(kind).await?;

        self.transition(SessionState::Authenticated(identity.clone()));
        self.broker.acquire(&identity.email).await?;

        Ok(identity)
    }

    /// Sign out of the provider, revoke the backend token, and announce
    /// `Anonymous`.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        self.provider.sign_out().await;
        self.broker.revoke();
        self.transition(SessionState::Anonymous);
    }

    fn transition(&self, next: SessionState) {
        debug!(state = next.label(), "session state changed");
        self.state.send_replace(next);
    }
}

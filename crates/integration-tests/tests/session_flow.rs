//! Session lifecycle, token issuance, and route guarding together.

use rent_wheels_client::guard::{GuardDecision, RouteTable};
use rent_wheels_client::session::{ProviderError, ProviderKind, SessionState, SignInError};

use rent_wheels_integration_tests::{MockBackend, StubProvider, identity, init_tracing};

// =============================================================================
// Sign-in
// =============================================================================

#[tokio::test]
async fn test_interactive_sign_in_authenticates_and_issues_a_token() {
    init_tracing();
    let backend = MockBackend::start().await;
    let state = backend.app_state();
    let session = state.session(StubProvider::signing_in_as(identity(
        "renter@example.com",
    )));

    assert_eq!(session.initialize().await, SessionState::Anonymous);

    let routes = RouteTable::standard();
    match routes.guard("/my-bookings", &session.state()) {
        Some(GuardDecision::RedirectToLogin(redirect)) => {
            assert_eq!(redirect.return_to, "/my-bookings");
        }
        other => panic!("expected a login redirect, got {other:?}"),
    }

    let renter = session
        .sign_in_with_provider(ProviderKind::Google)
        .await
        .expect("sign in");

    assert_eq!(renter.email.as_str(), "renter@example.com");
    assert!(matches!(session.state(), SessionState::Authenticated(_)));
    let token = state.broker().snapshot().expect("token issued");
    assert_eq!(token.issued_for().as_str(), "renter@example.com");
    assert!(matches!(
        routes.guard("/my-bookings", &session.state()),
        Some(GuardDecision::Render)
    ));
}

#[tokio::test]
async fn test_restore_resolves_a_persisted_session() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();
    let session = state.session(StubProvider::restoring(identity("renter@example.com")));

    let resolved = session.initialize().await;

    assert!(matches!(resolved, SessionState::Authenticated(_)));
    assert!(matches!(
        RouteTable::standard().guard("/dashboard", &session.state()),
        Some(GuardDecision::Render)
    ));
}

#[tokio::test]
async fn test_cancelled_sign_in_stays_anonymous() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();
    let session = state.session(StubProvider::failing_with(ProviderError::UserCancelled));
    session.initialize().await;

    let result = session.sign_in_with_provider(ProviderKind::Facebook).await;

    assert!(matches!(
        result,
        Err(SignInError::Provider(ProviderError::UserCancelled))
    ));
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(state.broker().snapshot().is_none());
}

#[tokio::test]
async fn test_disabled_method_is_reported_as_unavailable() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();
    let session = state.session(StubProvider::failing_with(ProviderError::Unavailable(
        "Github sign-in is disabled".to_string(),
    )));

    let result = session.sign_in_with_provider(ProviderKind::Github).await;

    assert!(matches!(
        result,
        Err(SignInError::Provider(ProviderError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn test_token_mint_outage_leaves_identity_but_no_token() {
    let backend = MockBackend::start().await;
    backend.set_fail_token(true);

    let state = backend.app_state();
    let session = state.session(StubProvider::signing_in_as(identity(
        "renter@example.com",
    )));

    let result = session.sign_in_with_provider(ProviderKind::Google).await;

    // The provider vouched for the identity; only the token step failed.
    assert!(matches!(result, Err(SignInError::Token(_))));
    assert!(matches!(session.state(), SessionState::Authenticated(_)));
    assert!(state.broker().snapshot().is_none());
}

// =============================================================================
// Sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_out_revokes_the_token_and_notifies() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();
    let session = state.session(StubProvider::signing_in_as(identity(
        "renter@example.com",
    )));
    session
        .sign_in_with_provider(ProviderKind::Google)
        .await
        .expect("sign in");
    let subscription = session.subscribe();

    session.sign_out().await;

    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(subscription.current(), SessionState::Anonymous);
    assert!(state.broker().snapshot().is_none());
    assert!(matches!(
        RouteTable::standard().guard("/dashboard", &session.state()),
        Some(GuardDecision::RedirectToLogin(_))
    ));
}

// =============================================================================
// Pending resolution
// =============================================================================

#[tokio::test]
async fn test_guard_stays_silent_until_the_session_resolves() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();
    let session = state.session(StubProvider::signing_in_as(identity(
        "renter@example.com",
    )));

    // Uninitialized: no decision yet, in either direction.
    assert!(
        RouteTable::standard()
            .guard("/dashboard", &session.state())
            .is_none()
    );

    session.initialize().await;
    assert!(
        RouteTable::standard()
            .guard("/dashboard", &session.state())
            .is_some()
    );
}

//! Token acquisition, attachment, and global invalidation.

use reqwest::StatusCode;

use rent_wheels_client::error::ApiError;
use rent_wheels_client::token::{AccessTokenBroker, TokenAcquisitionError};
use rent_wheels_core::Email;

use rent_wheels_integration_tests::{MockBackend, dead_endpoint};

fn email(addr: &str) -> Email {
    addr.parse().expect("test email")
}

// =============================================================================
// Acquisition
// =============================================================================

#[tokio::test]
async fn test_acquired_token_authorizes_protected_calls() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();

    let token = state
        .broker()
        .acquire(&email("renter@example.com"))
        .await
        .expect("acquire token");
    assert_eq!(token.issued_for().as_str(), "renter@example.com");

    // The same broker backs the API client, so the call is now authorized.
    let bookings = state.api().bookings().await.expect("list bookings");
    assert!(bookings.is_empty());
}

#[tokio::test]
async fn test_rejected_acquisition_keeps_the_previous_token() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();

    state
        .broker()
        .acquire(&email("first@example.com"))
        .await
        .expect("first acquisition");

    backend.set_fail_token(true);
    let result = state.broker().acquire(&email("second@example.com")).await;

    assert!(matches!(
        result,
        Err(TokenAcquisitionError::Rejected { status, .. }) if status == StatusCode::SERVICE_UNAVAILABLE
    ));
    let held = state.broker().snapshot().expect("previous token retained");
    assert_eq!(held.issued_for().as_str(), "first@example.com");
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_a_transport_error() {
    let broker = AccessTokenBroker::new(reqwest::Client::new(), &dead_endpoint().await);

    let result = broker.acquire(&email("renter@example.com")).await;

    assert!(matches!(result, Err(TokenAcquisitionError::Transport(_))));
    assert!(broker.snapshot().is_none());
}

// =============================================================================
// Enforcement
// =============================================================================

#[tokio::test]
async fn test_protected_call_without_token_is_unauthorized() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();

    let result = state.api().bookings().await;

    match result {
        Err(ApiError::Unauthorized { status }) => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        other => panic!("expected unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_backend_revocation_clears_the_token_globally() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();

    state
        .broker()
        .acquire(&email("renter@example.com"))
        .await
        .expect("acquire token");
    backend.revoke_all_tokens();

    let result = state.api().bookings().await;

    match result {
        Err(ApiError::Unauthorized { status }) => {
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
        other => panic!("expected forbidden, got {other:?}"),
    }
    // One refusal voids the slot for every holder of this broker.
    assert!(state.broker().snapshot().is_none());
}

// =============================================================================
// Invalidation
// =============================================================================

#[tokio::test]
async fn test_auth_failure_invalidation_preserves_the_destination() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();
    state
        .broker()
        .acquire(&email("renter@example.com"))
        .await
        .expect("acquire token");

    let redirect = state
        .broker()
        .invalidate_on_auth_failure(StatusCode::UNAUTHORIZED, "/cars/c-9")
        .expect("auth failure invalidates");

    assert_eq!(redirect.return_to, "/cars/c-9");
    assert!(state.broker().snapshot().is_none());
}

#[tokio::test]
async fn test_non_auth_statuses_do_not_invalidate() {
    let backend = MockBackend::start().await;
    let state = backend.app_state();
    state
        .broker()
        .acquire(&email("renter@example.com"))
        .await
        .expect("acquire token");

    let redirect = state
        .broker()
        .invalidate_on_auth_failure(StatusCode::INTERNAL_SERVER_ERROR, "/dashboard");

    assert!(redirect.is_none());
    assert!(state.broker().snapshot().is_some());
}

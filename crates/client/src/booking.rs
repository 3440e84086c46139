//! The booking state machine.
//!
//! One workflow instance tracks one car–renter interaction through
//! `NoBooking → PendingCreate → Confirmed → {Cancelled, Completed}`. Nothing
//! is flipped optimistically: the local car status changes only after the
//! backend confirms, and cancellation requires an explicit confirm step
//! before anything is sent.

use std::fmt;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument};

use rent_wheels_core::{BookingId, BookingStatus, CarStatus};

use crate::api::{BackendClient, Booking, BookingDraft, Car};
use crate::catalog::CarCatalogStore;
use crate::error::ApiError;
use crate::guard::{LoginRedirect, paths};
use crate::session::UserIdentity;
use crate::token::AccessTokenBroker;

/// Lifecycle of one car–renter booking interaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BookingState {
    /// Nothing submitted yet.
    #[default]
    NoBooking,
    /// Submission in flight; no local state has been touched.
    PendingCreate,
    /// The backend confirmed the booking.
    Confirmed(Booking),
    /// The booking was cancelled.
    Cancelled,
    /// The rental ran to completion.
    Completed,
}

impl BookingState {
    const fn label(&self) -> &'static str {
        match self {
            Self::NoBooking => "no_booking",
            Self::PendingCreate => "pending_create",
            Self::Confirmed(_) => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

/// Why the backend refused a booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Another renter got there first. A normal outcome, not a fault.
    AlreadyBooked,
    /// Any other refusal, with whatever detail the backend gave.
    Other(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyBooked => f.write_str("car is already booked"),
            Self::Other(detail) => f.write_str(detail),
        }
    }
}

/// Errors surfaced by the booking workflow.
///
/// The variants are deliberately user-actionable: "already booked" is not
/// the same conversation as "network down" or "session expired".
#[derive(Debug, Error)]
pub enum BookingError {
    /// No valid access token for this renter; sign in first.
    #[error("not authenticated")]
    Unauthenticated,

    /// The backend voided the session mid-flow. Carries where to resume
    /// after signing in again.
    #[error("session expired, sign in again")]
    SessionExpired(LoginRedirect),

    /// The backend refused the booking as a business outcome.
    #[error("booking rejected: {0}")]
    Rejected(RejectReason),

    /// The booking or its car no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport or backend fault. Never retried automatically; submission
    /// is not idempotent and a blind retry could double-book.
    #[error("request failed: {0}")]
    Network(#[source] ApiError),
}

/// Successful submission outcome.
#[derive(Debug, Clone)]
pub struct BookingConfirmation {
    /// The booking as the backend recorded it.
    pub booking: Booking,
    /// Where the embedding shell should take the renter next.
    pub destination: &'static str,
}

/// Booking workflow for one car–renter pair.
pub struct BookingWorkflow {
    api: BackendClient,
    broker: AccessTokenBroker,
    catalog: CarCatalogStore,
    state: watch::Sender<BookingState>,
}

impl BookingWorkflow {
    /// Create a workflow in `NoBooking`.
    #[must_use]
    pub fn new(api: BackendClient, broker: AccessTokenBroker, catalog: CarCatalogStore) -> Self {
        let (state, _) = watch::channel(BookingState::NoBooking);
        Self {
            api,
            broker,
            catalog,
            state,
        }
    }

    /// The state as of now.
    #[must_use]
    pub fn state(&self) -> BookingState {
        self.state.borrow().clone()
    }

    /// Subscribe to state transitions. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<BookingState> {
        self.state.subscribe()
    }

    /// Submit a booking for `car` on behalf of `renter`.
    ///
    /// Preconditions: a token issued for `renter` must be held, and the
    /// cached car must read `Available`. The availability check is advisory;
    /// the backend stays the arbiter of races, and its refusal comes back as
    /// `Rejected(AlreadyBooked)`. The local car status flips to `Booked`
    /// only after confirmation.
    ///
    /// # Errors
    ///
    /// Returns an error if the renter is unauthenticated, the car is taken,
    /// the session expired mid-flight, or the request failed.
    #[instrument(skip(self, car, renter), fields(car_id = %car.id, renter = %renter.email))]
    pub async fn create_booking(
        &self,
        car: &Car,
        renter: &UserIdentity,
    ) -> Result<BookingConfirmation, BookingError> {
        let held_for_renter = self
            .broker
            .snapshot()
            .is_some_and(|token| token.issued_for() == &renter.email);
        if !held_for_renter {
            return Err(BookingError::Unauthenticated);
        }

        if !matches!(self.state(), BookingState::NoBooking) {
            return Err(BookingError::Rejected(RejectReason::Other(
                "a booking already exists for this car".to_string(),
            )));
        }

        // Advisory precheck on the cached copy; saves a round trip, decides
        // nothing.
        if !car.status.is_bookable() {
            return Err(BookingError::Rejected(RejectReason::AlreadyBooked));
        }

        self.transition(BookingState::PendingCreate);

        let draft = BookingDraft::for_car(car);
        match self.api.create_booking(&draft).await {
            Ok(booking) => {
                self.catalog.mark_status(&car.id, CarStatus::Booked).await;
                self.transition(BookingState::Confirmed(booking.clone()));
                Ok(BookingConfirmation {
                    booking,
                    destination: paths::MY_BOOKINGS,
                })
            }
            Err(e) => {
                self.transition(BookingState::NoBooking);
                Err(self.classify(e, &paths::car_details(&car.id)))
            }
        }
    }

    /// Start cancelling `booking_id`.
    ///
    /// Nothing is sent yet: the returned intent must be confirmed first, and
    /// dismissing or dropping it leaves every piece of state untouched.
    #[must_use = "a cancel intent does nothing until confirmed"]
    pub fn cancel_booking(&self, booking_id: BookingId) -> CancelIntent<'_> {
        CancelIntent {
            workflow: self,
            booking_id,
        }
    }

    /// Align this workflow with a booking record fetched from the backend.
    ///
    /// Lets a restored view pick up a booking that reached `Active` or
    /// `Completed` while the client was away.
    pub fn reconcile(&self, booking: &Booking) {
        let next = match booking.status {
            BookingStatus::Booked | BookingStatus::Active => {
                BookingState::Confirmed(booking.clone())
            }
            BookingStatus::Cancelled => BookingState::Cancelled,
            BookingStatus::Completed => BookingState::Completed,
        };
        self.transition(next);
    }

    fn classify(&self, err: ApiError, origin: &str) -> BookingError {
        match err {
            ApiError::Unauthorized { status } => {
                let redirect = self
                    .broker
                    .invalidate_on_auth_failure(status, origin)
                    .unwrap_or(LoginRedirect {
                        return_to: origin.to_owned(),
                    });
                BookingError::SessionExpired(redirect)
            }
            ApiError::Conflict(_) => BookingError::Rejected(RejectReason::AlreadyBooked),
            ApiError::NotFound(what) => BookingError::NotFound(what),
            other => BookingError::Network(other),
        }
    }

    fn transition(&self, next: BookingState) {
        debug!(state = next.label(), "booking state changed");
        self.state.send_replace(next);
    }
}

/// First half of the two-step cancellation.
#[must_use = "a cancel intent does nothing until confirmed"]
pub struct CancelIntent<'a> {
    workflow: &'a BookingWorkflow,
    booking_id: BookingId,
}

impl CancelIntent<'_> {
    /// The booking this intent would cancel.
    #[must_use]
    pub fn booking_id(&self) -> &BookingId {
        &self.booking_id
    }

    /// Keep the booking. Identical to dropping the intent.
    pub fn dismiss(self) {}

    /// Submit the cancellation.
    ///
    /// On success the workflow moves to `Cancelled` and cached copies of the
    /// car are dropped: whether the car went back to `Available` depends on
    /// other renters' bookings, so only a refetch can answer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the booking was already gone, or a classified
    /// error if the request failed. The booking state is left as it was.
    #[instrument(skip(self), fields(booking_id = %self.booking_id))]
    pub async fn confirm(self) -> Result<(), BookingError> {
        let Self {
            workflow,
            booking_id,
        } = self;

        let outcome = match workflow.api.delete_booking(&booking_id).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(workflow.classify(e, paths::MY_BOOKINGS)),
        };

        if !outcome.deleted_any() {
            return Err(BookingError::NotFound(format!("booking {booking_id}")));
        }

        match workflow.state() {
            BookingState::Confirmed(booking) if booking.id == booking_id => {
                workflow.catalog.invalidate_car(&booking.car_id).await;
                workflow.transition(BookingState::Cancelled);
            }
            // Cancelled something this workflow never tracked, e.g. a row in
            // the bookings list. Drop all cached cars rather than guess
            // which one changed.
            _ => workflow.catalog.invalidate_all().await,
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use url::Url;

    use rent_wheels_core::{CarId, ProviderUserId};

    use crate::config::ClientConfig;

    use super::*;

    fn workflow() -> BookingWorkflow {
        let config = ClientConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
        let broker = AccessTokenBroker::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let api = BackendClient::new(&config, broker.clone()).unwrap();
        let catalog = CarCatalogStore::new(api.clone(), &config);
        BookingWorkflow::new(api, broker, catalog)
    }

    fn car(status: CarStatus) -> Car {
        Car {
            id: CarId::new("c-1"),
            name: "Toyota Corolla".to_string(),
            description: String::new(),
            category: "Sedan".to_string(),
            price_per_day: Decimal::from(50),
            location: None,
            status,
            image_url: None,
            provider_name: "Dana Byers".to_string(),
            provider_email: "provider@example.com".parse().unwrap(),
        }
    }

    fn renter() -> UserIdentity {
        UserIdentity {
            id: ProviderUserId::new("uid-1"),
            email: "renter@example.com".parse().unwrap(),
            display_name: None,
            photo_url: None,
        }
    }

    fn booking(id: &str, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(id),
            car_id: CarId::new("c-1"),
            car_name: "Toyota Corolla".to_string(),
            category: None,
            image_url: None,
            rent_price: Decimal::from(50),
            renter_email: "renter@example.com".parse().unwrap(),
            provider_name: None,
            provider_email: "provider@example.com".parse().unwrap(),
            status,
            created_at: Some(Utc::now()),
            amount: None,
            total_price: None,
        }
    }

    #[tokio::test]
    async fn test_create_without_token_is_unauthenticated() {
        let workflow = workflow();

        let result = workflow.create_booking(&car(CarStatus::Available), &renter()).await;

        assert!(matches!(result, Err(BookingError::Unauthenticated)));
        assert_eq!(workflow.state(), BookingState::NoBooking);
    }

    #[tokio::test]
    async fn test_dismissing_cancel_intent_changes_nothing() {
        let workflow = workflow();
        workflow.reconcile(&booking("b-1", BookingStatus::Booked));

        workflow.cancel_booking(BookingId::new("b-1")).dismiss();

        assert!(matches!(workflow.state(), BookingState::Confirmed(_)));
    }

    #[test]
    fn test_reconcile_maps_backend_statuses() {
        let workflow = workflow();

        workflow.reconcile(&booking("b-1", BookingStatus::Active));
        assert!(matches!(workflow.state(), BookingState::Confirmed(_)));

        workflow.reconcile(&booking("b-1", BookingStatus::Completed));
        assert_eq!(workflow.state(), BookingState::Completed);

        workflow.reconcile(&booking("b-1", BookingStatus::Cancelled));
        assert_eq!(workflow.state(), BookingState::Cancelled);
    }

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(RejectReason::AlreadyBooked.to_string(), "car is already booked");
        assert_eq!(
            RejectReason::Other("weekend lockout".to_string()).to_string(),
            "weekend lockout"
        );
    }

    #[tokio::test]
    async fn test_watchers_hear_reconciliation() {
        let workflow = workflow();
        let mut rx = workflow.watch_state();

        workflow.reconcile(&booking("b-1", BookingStatus::Completed));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), BookingState::Completed);
    }
}

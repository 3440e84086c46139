//! Provider dashboard aggregation.
//!
//! The dashboard shows a provider's listings next to the booking ledger,
//! with a stats strip derived from both. Aggregation is split in two: a
//! pure [`compute`] over already-fetched slices, and a [`DashboardAggregator`]
//! that fetches both sides concurrently and degrades per side instead of
//! failing the whole view.

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::join;
use tracing::{error, instrument};

use rent_wheels_core::Email;

use crate::api::{BackendClient, Booking, Car};
use crate::error::ApiError;

/// Derived figures for the stats strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Cars this provider has listed.
    pub total_cars: usize,
    /// All bookings in the ledger slice.
    pub total_bookings: usize,
    /// Bookings currently `Booked` or `Active`.
    pub active_rentals: usize,
    /// Sum over bookings of `amount`, falling back to `totalPrice`, then 0.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
}

/// Everything one dashboard render needs.
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub listings: Vec<Car>,
    pub bookings: Vec<Booking>,
    pub stats: DashboardStats,
    /// Set when the listings fetch failed and that side shows empty.
    pub listings_error: Option<ApiError>,
    /// Set when the bookings fetch failed and that side shows empty.
    pub bookings_error: Option<ApiError>,
}

impl DashboardSnapshot {
    /// True when at least one side is showing empty because of a fetch
    /// failure rather than genuinely having no rows.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.listings_error.is_some() || self.bookings_error.is_some()
    }
}

/// Derive stats from fetched slices.
///
/// Records missing both `amount` and `totalPrice` count zero toward
/// revenue; older ledger rows predate the amount field.
#[must_use]
pub fn compute(cars: &[Car], bookings: &[Booking]) -> DashboardStats {
    let total_revenue = bookings
        .iter()
        .map(|b| b.amount.or(b.total_price).unwrap_or_default())
        .sum();
    let active_rentals = bookings.iter().filter(|b| b.status.is_active()).count();

    DashboardStats {
        total_cars: cars.len(),
        total_bookings: bookings.len(),
        active_rentals,
        total_revenue,
    }
}

/// Render a price the way the listing pages do.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    format!("${amount:.2}")
}

/// Fetches both dashboard sides and assembles a [`DashboardSnapshot`].
#[derive(Clone)]
pub struct DashboardAggregator {
    api: BackendClient,
}

impl DashboardAggregator {
    #[must_use]
    pub const fn new(api: BackendClient) -> Self {
        Self { api }
    }

    /// Fetch the provider's listings and the booking ledger concurrently.
    ///
    /// A failed side is logged, presented as empty, and flagged on the
    /// snapshot; the other side still renders. This never fails as a whole.
    #[instrument(skip(self), fields(provider = %email))]
    pub async fn refresh(&self, email: &Email) -> DashboardSnapshot {
        let (listings, bookings) = join!(self.api.my_listings(email), self.api.bookings());

        let (listings, listings_error) = match listings {
            Ok(cars) => (cars, None),
            Err(e) => {
                error!("Failed to fetch listings: {e}");
                (Vec::new(), Some(e))
            }
        };
        let (bookings, bookings_error) = match bookings {
            Ok(rows) => (rows, None),
            Err(e) => {
                error!("Failed to fetch bookings: {e}");
                (Vec::new(), Some(e))
            }
        };

        let stats = compute(&listings, &bookings);
        DashboardSnapshot {
            listings,
            bookings,
            stats,
            listings_error,
            bookings_error,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rent_wheels_core::{BookingId, BookingStatus, CarId, CarStatus};

    use super::*;

    fn car(id: &str) -> Car {
        Car {
            id: CarId::new(id),
            name: format!("Car {id}"),
            description: String::new(),
            category: "Sedan".to_string(),
            price_per_day: Decimal::from(40),
            location: None,
            status: CarStatus::Available,
            image_url: None,
            provider_name: "Dana Byers".to_string(),
            provider_email: "provider@example.com".parse().unwrap(),
        }
    }

    fn booking(
        id: &str,
        status: BookingStatus,
        amount: Option<Decimal>,
        total_price: Option<Decimal>,
    ) -> Booking {
        Booking {
            id: BookingId::new(id),
            car_id: CarId::new("c-1"),
            car_name: "Toyota Corolla".to_string(),
            category: None,
            image_url: None,
            rent_price: Decimal::from(40),
            renter_email: "renter@example.com".parse().unwrap(),
            provider_name: None,
            provider_email: "provider@example.com".parse().unwrap(),
            status,
            created_at: Some(Utc::now()),
            amount,
            total_price,
        }
    }

    #[test]
    fn test_compute_revenue_falls_back_through_amount_then_total_price() {
        let cars = vec![car("c-1"), car("c-2")];
        let bookings = vec![
            booking(
                "b-1",
                BookingStatus::Booked,
                Some(Decimal::new(12050, 2)),
                Some(Decimal::from(999)),
            ),
            booking("b-2", BookingStatus::Completed, None, Some(Decimal::from(80))),
            booking("b-3", BookingStatus::Active, None, None),
        ];

        let stats = compute(&cars, &bookings);

        assert_eq!(stats.total_cars, 2);
        assert_eq!(stats.total_bookings, 3);
        assert_eq!(stats.active_rentals, 2);
        assert_eq!(stats.total_revenue, Decimal::new(20050, 2));
    }

    #[test]
    fn test_compute_over_empty_slices() {
        let stats = compute(&[], &[]);

        assert_eq!(stats.total_cars, 0);
        assert_eq!(stats.total_bookings, 0);
        assert_eq!(stats.active_rentals, 0);
        assert_eq!(stats.total_revenue, Decimal::ZERO);
    }

    #[test]
    fn test_cancelled_bookings_still_count_toward_revenue() {
        let bookings = vec![booking(
            "b-1",
            BookingStatus::Cancelled,
            Some(Decimal::from(60)),
            None,
        )];

        let stats = compute(&[], &bookings);

        assert_eq!(stats.active_rentals, 0);
        assert_eq!(stats.total_revenue, Decimal::from(60));
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = DashboardStats {
            total_cars: 2,
            total_bookings: 3,
            active_rentals: 1,
            total_revenue: Decimal::new(2005, 1),
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalCars": 2,
                "totalBookings": 3,
                "activeRentals": 1,
                "totalRevenue": 200.5,
            })
        );
    }

    #[test]
    fn test_format_price_pads_to_cents() {
        assert_eq!(format_price(Decimal::new(995, 1)), "$99.50");
        assert_eq!(format_price(Decimal::from(1234)), "$1234.00");
    }

    #[test]
    fn test_degraded_flag() {
        let healthy = DashboardSnapshot {
            listings: vec![],
            bookings: vec![],
            stats: compute(&[], &[]),
            listings_error: None,
            bookings_error: None,
        };
        assert!(!healthy.is_degraded());

        let degraded = DashboardSnapshot {
            bookings_error: Some(ApiError::NotFound("bookings".to_string())),
            ..healthy
        };
        assert!(degraded.is_degraded());
    }
}

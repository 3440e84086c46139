//! Wire types for the RentWheels backend.
//!
//! The backend speaks camelCase JSON with decimal prices as numbers. Older
//! records drift on a few names (`_id` for `id`, `rentPrice` for
//! `pricePerDay`, `date` for `createdAt`, `image` for `imageURL`); readers
//! accept both spellings, writers emit the canonical one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rent_wheels_core::{BookingId, BookingStatus, CarCategory, CarId, CarStatus, Email};

use crate::session::UserIdentity;

// =============================================================================
// Car Types
// =============================================================================

/// A car listing as the backend serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    #[serde(alias = "_id")]
    pub id: CarId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Open string rather than [`CarCategory`]: the backend does not enforce
    /// the vocabulary on records that already exist.
    pub category: String,
    /// Daily rental price in dollars.
    #[serde(alias = "rentPrice", with = "rust_decimal::serde::float")]
    pub price_per_day: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub status: CarStatus,
    #[serde(
        rename = "imageURL",
        alias = "image",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    pub provider_name: String,
    pub provider_email: Email,
}

/// Payload for listing a new car.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarDraft {
    pub name: String,
    pub description: String,
    pub category: CarCategory,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_day: Decimal,
    pub location: String,
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub provider_name: String,
    pub provider_email: Email,
    pub status: CarStatus,
}

impl CarDraft {
    /// A new listing offered by `provider`. Listings are born `Available`.
    #[must_use]
    pub fn new(
        name: String,
        description: String,
        category: CarCategory,
        price_per_day: Decimal,
        location: String,
        image_url: Option<String>,
        provider: &UserIdentity,
    ) -> Self {
        Self {
            name,
            description,
            category,
            price_per_day,
            location,
            image_url,
            provider_name: provider.display_label().to_owned(),
            provider_email: provider.email.clone(),
            status: CarStatus::Available,
        }
    }
}

/// Partial update for an existing car. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CarCategory>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price_per_day: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CarStatus>,
}

// =============================================================================
// Booking Types
// =============================================================================

/// A booking record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(alias = "_id")]
    pub id: BookingId,
    pub car_id: CarId,
    pub car_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        rename = "imageURL",
        alias = "image",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub rent_price: Decimal,
    pub renter_email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    pub provider_email: Email,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(alias = "date", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Settled revenue, once the backend has recorded it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub amount: Option<Decimal>,
    /// Legacy revenue field some records carry instead of `amount`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub total_price: Option<Decimal>,
}

/// Payload for submitting a booking.
///
/// The renter is never named here; the backend derives it from the bearer
/// token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub car_id: CarId,
    pub car_name: String,
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub rent_price: Decimal,
    pub provider_name: String,
    pub provider_email: Email,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl BookingDraft {
    /// Assemble the submission payload for `car`, stamped with the current
    /// time and status `Booked`.
    #[must_use]
    pub fn for_car(car: &Car) -> Self {
        Self {
            car_id: car.id.clone(),
            car_name: car.name.clone(),
            image_url: car.image_url.clone(),
            rent_price: car.price_per_day,
            provider_name: car.provider_name.clone(),
            provider_email: car.provider_email.clone(),
            status: BookingStatus::Booked,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Mutation Acknowledgements
// =============================================================================

/// Response body for the DELETE endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeleteOutcome {
    #[serde(rename = "deletedCount", default)]
    pub deleted_count: u64,
}

impl DeleteOutcome {
    /// Whether the delete actually removed something. A zero count means the
    /// record was already gone.
    #[must_use]
    pub const fn deleted_any(self) -> bool {
        self.deleted_count > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rent_wheels_core::ProviderUserId;
    use serde_json::json;

    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            id: ProviderUserId::new("uid-1"),
            email: "provider@example.com".parse().unwrap(),
            display_name: Some("Dana Byers".to_string()),
            photo_url: None,
        }
    }

    #[test]
    fn test_car_deserializes_canonical_shape() {
        let car: Car = serde_json::from_value(json!({
            "id": "68a1f09e2c",
            "name": "Toyota Corolla",
            "description": "Reliable commuter",
            "category": "Sedan",
            "pricePerDay": 45.5,
            "location": "Dhaka",
            "status": "Available",
            "imageURL": "https://img.example.com/corolla.jpg",
            "providerName": "Dana Byers",
            "providerEmail": "provider@example.com"
        }))
        .unwrap();

        assert_eq!(car.id.as_str(), "68a1f09e2c");
        assert_eq!(car.price_per_day, Decimal::new(455, 1));
        assert_eq!(car.category, "Sedan");
        assert_eq!(car.status, CarStatus::Available);
    }

    #[test]
    fn test_car_deserializes_legacy_shape() {
        // Older records use _id, rentPrice, and image.
        let car: Car = serde_json::from_value(json!({
            "_id": "507f191e81",
            "name": "Tesla Model 3",
            "category": "Electric",
            "rentPrice": 120,
            "status": "Booked",
            "image": "https://img.example.com/model3.jpg",
            "providerName": "Sam Field",
            "providerEmail": "sam@example.com"
        }))
        .unwrap();

        assert_eq!(car.id.as_str(), "507f191e81");
        assert_eq!(car.price_per_day, Decimal::from(120));
        assert_eq!(car.image_url.as_deref(), Some("https://img.example.com/model3.jpg"));
        assert_eq!(car.description, "");
        assert_eq!(car.location, None);
    }

    #[test]
    fn test_car_serializes_canonical_names() {
        let car = Car {
            id: CarId::new("68a1f09e2c"),
            name: "Toyota Corolla".to_string(),
            description: String::new(),
            category: "Sedan".to_string(),
            price_per_day: Decimal::from(45),
            location: None,
            status: CarStatus::Available,
            image_url: None,
            provider_name: "Dana Byers".to_string(),
            provider_email: "provider@example.com".parse().unwrap(),
        };

        let value = serde_json::to_value(&car).unwrap();

        assert_eq!(value["pricePerDay"], json!(45.0));
        assert_eq!(value["providerEmail"], json!("provider@example.com"));
        assert!(value.get("rentPrice").is_none());
        assert!(value.get("location").is_none());
    }

    #[test]
    fn test_booking_accepts_date_alias_and_missing_revenue() {
        let booking: Booking = serde_json::from_value(json!({
            "_id": "b-1",
            "carId": "68a1f09e2c",
            "carName": "Toyota Corolla",
            "rentPrice": 45.5,
            "renterEmail": "renter@example.com",
            "providerEmail": "provider@example.com",
            "status": "Booked",
            "date": "2026-08-20T10:15:00Z"
        }))
        .unwrap();

        assert!(booking.created_at.is_some());
        assert_eq!(booking.amount, None);
        assert_eq!(booking.total_price, None);
        assert_eq!(booking.status, BookingStatus::Booked);
    }

    #[test]
    fn test_booking_reads_revenue_fields() {
        let booking: Booking = serde_json::from_value(json!({
            "id": "b-2",
            "carId": "c-2",
            "carName": "BMW X5",
            "rentPrice": 200,
            "renterEmail": "renter@example.com",
            "providerEmail": "provider@example.com",
            "status": "Completed",
            "amount": 600.0,
            "totalPrice": 550.0
        }))
        .unwrap();

        assert_eq!(booking.amount, Some(Decimal::from(600)));
        assert_eq!(booking.total_price, Some(Decimal::from(550)));
    }

    #[test]
    fn test_booking_draft_wire_shape() {
        let car = Car {
            id: CarId::new("68a1f09e2c"),
            name: "Toyota Corolla".to_string(),
            description: "Reliable commuter".to_string(),
            category: "Sedan".to_string(),
            price_per_day: Decimal::new(455, 1),
            location: Some("Dhaka".to_string()),
            status: CarStatus::Available,
            image_url: Some("https://img.example.com/corolla.jpg".to_string()),
            provider_name: "Dana Byers".to_string(),
            provider_email: "provider@example.com".parse().unwrap(),
        };

        let value = serde_json::to_value(BookingDraft::for_car(&car)).unwrap();

        assert_eq!(value["carId"], json!("68a1f09e2c"));
        assert_eq!(value["carName"], json!("Toyota Corolla"));
        assert_eq!(value["imageURL"], json!("https://img.example.com/corolla.jpg"));
        assert_eq!(value["rentPrice"], json!(45.5));
        assert_eq!(value["status"], json!("Booked"));
        assert!(value.get("createdAt").is_some());
        assert!(value.get("renterEmail").is_none());
    }

    #[test]
    fn test_car_draft_is_born_available() {
        let draft = CarDraft::new(
            "Honda Civic".to_string(),
            "Compact sedan".to_string(),
            CarCategory::Sedan,
            Decimal::from(55),
            "Chittagong".to_string(),
            None,
            &identity(),
        );

        let value = serde_json::to_value(&draft).unwrap();

        assert_eq!(value["status"], json!("Available"));
        assert_eq!(value["providerName"], json!("Dana Byers"));
        assert_eq!(value["providerEmail"], json!("provider@example.com"));
    }

    #[test]
    fn test_car_draft_falls_back_to_anonymous_provider() {
        let mut provider = identity();
        provider.display_name = None;

        let draft = CarDraft::new(
            "Honda Civic".to_string(),
            String::new(),
            CarCategory::Sedan,
            Decimal::from(55),
            "Chittagong".to_string(),
            None,
            &provider,
        );

        assert_eq!(draft.provider_name, "Anonymous");
    }

    #[test]
    fn test_car_patch_serializes_only_set_fields() {
        let patch = CarPatch {
            price_per_day: Some(Decimal::from(60)),
            status: Some(CarStatus::Available),
            ..CarPatch::default()
        };

        let value = serde_json::to_value(&patch).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert_eq!(value["pricePerDay"], json!(60.0));
        assert_eq!(value["status"], json!("Available"));
    }

    #[test]
    fn test_delete_outcome_counts() {
        let removed: DeleteOutcome = serde_json::from_value(json!({"deletedCount": 1})).unwrap();
        let missing: DeleteOutcome = serde_json::from_value(json!({"deletedCount": 0})).unwrap();

        assert!(removed.deleted_any());
        assert!(!missing.deleted_any());
    }
}

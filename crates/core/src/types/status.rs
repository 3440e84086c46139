//! Status enums for cars and bookings.

use serde::{Deserialize, Serialize};

/// Availability of a car listing.
///
/// The backend is the authority for this value; the client only flips its
/// cached copy after a booking mutation is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CarStatus {
    /// The car can be booked.
    #[default]
    Available,
    /// An active booking references the car.
    Booked,
}

impl CarStatus {
    /// Whether a booking request against this car would pass the client-side
    /// advisory check.
    #[must_use]
    pub const fn is_bookable(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Lifecycle state of a booking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BookingStatus {
    /// Created and confirmed by the backend; the rental has not started.
    #[default]
    Booked,
    /// The rental period is underway.
    Active,
    /// The rental period ended normally.
    Completed,
    /// The renter cancelled before completion.
    Cancelled,
}

impl BookingStatus {
    /// Whether the booking still occupies the car.
    ///
    /// Both `Booked` and `Active` count as active rentals for dashboard
    /// purposes.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Booked | Self::Active)
    }
}

impl std::fmt::Display for CarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Booked => write!(f, "Booked"),
        }
    }
}

impl std::str::FromStr for CarStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(Self::Available),
            "Booked" => Ok(Self::Booked),
            _ => Err(format!("invalid car status: {s}")),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Booked => write!(f, "Booked"),
            Self::Active => write!(f, "Active"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Booked" => Ok(Self::Booked),
            "Active" => Ok(Self::Active),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid booking status: {s}")),
        }
    }
}

//! Car category vocabulary.

use serde::{Deserialize, Serialize};

/// The categories the marketplace offers when listing a car.
///
/// `Car::category` itself stays an open string because the backend does not
/// enforce this set on existing records; the enum exists for listing drafts
/// and filter controls, which do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarCategory {
    Sedan,
    #[serde(rename = "SUV")]
    Suv,
    Hatchback,
    Luxury,
    Electric,
}

impl CarCategory {
    /// All known categories, in the order the marketplace presents them.
    pub const ALL: [Self; 5] = [
        Self::Sedan,
        Self::Suv,
        Self::Hatchback,
        Self::Luxury,
        Self::Electric,
    ];

    /// The wire/display spelling of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sedan => "Sedan",
            Self::Suv => "SUV",
            Self::Hatchback => "Hatchback",
            Self::Luxury => "Luxury",
            Self::Electric => "Electric",
        }
    }
}

impl std::fmt::Display for CarCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CarCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sedan" => Ok(Self::Sedan),
            "SUV" => Ok(Self::Suv),
            "Hatchback" => Ok(Self::Hatchback),
            "Luxury" => Ok(Self::Luxury),
            "Electric" => Ok(Self::Electric),
            _ => Err(format!("unknown car category: {s}")),
        }
    }
}

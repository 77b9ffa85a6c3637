//! Unique identifiers for Travelometer entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a Trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripId(Ulid);

impl TripId {
    /// Generate a new TripId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TripId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TripId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TripId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

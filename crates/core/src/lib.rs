//! Travelometer core data models.
//!
//! This crate defines the observation records, route definition and error
//! taxonomy shared by the estimator, the trip tracker and persistence.

#![warn(missing_docs)]

// Identities
mod id;

// Route and travel records
mod direction;
mod observation;
mod route;

// Errors
mod error;

// Re-exports
pub use id::TripId;

pub use direction::Direction;
pub use observation::{
    format_log, format_trip_log, parse_log, Milestone, Observation, SegmentIndex,
};
pub use route::Route;

pub use error::{CoreError, Result};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

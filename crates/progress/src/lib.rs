//! Travel-time estimation and trip tracking.
//!
//! Per-segment median estimates, refined from overlapping observations, and
//! arrival projections for a trip in progress.

#![warn(missing_docs)]

pub mod clock;
pub mod estimator;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use estimator::{median, Convergence, EstimatorConfig, SegmentEstimator};
pub use tracker::{minutes_to_duration, StepResult, TripState, TripTracker};

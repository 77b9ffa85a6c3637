//! Error taxonomy for estimation and trip tracking.

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the estimator, the trip tracker and the record codec.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// Unrecognised input token (e.g. a direction); carries the token
    #[error("invalid input: {0:?}")]
    InvalidInput(String),

    /// Malformed observation record
    #[error("invalid observation {value:?}: {reason}")]
    InvalidObservation {
        /// The offending text or triple
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// An estimator needs at least one observation to size the route
    #[error("no observations to build an estimator from")]
    EmptyObservations,

    /// Observation touches a segment the route does not have
    #[error("segment {segment} out of range for a route of {num_segments} segments")]
    SegmentOutOfRange {
        /// Offending segment index
        segment: usize,
        /// Number of segments in the route
        num_segments: usize,
    },

    /// Milestone is behind the traveller or past the end of the route
    #[error("milestone {milestone} not reachable from milestone {last} (route has {num_segments} segments)")]
    MilestoneOutOfRange {
        /// Requested milestone
        milestone: usize,
        /// Last milestone passed
        last: usize,
        /// Number of segments in the route
        num_segments: usize,
    },

    /// No evidence has reached this segment yet
    #[error("segment {0} has no estimate yet")]
    UnestimatedSegment(usize),

    /// Projected arrival falls outside the representable time range
    #[error("projection of {minutes} minutes is out of range")]
    ProjectionOutOfRange {
        /// Minutes of travel that could not be projected
        minutes: f64,
    },

    /// The trip already reached its far end
    #[error("trip already finished")]
    TripFinished,

    /// Route definition is inconsistent
    #[error("invalid route: {0}")]
    InvalidRoute(String),
}

//! Observation model - timed travel over a contiguous span of segments.
//!
//! The text form of an observation is the record shape of the observation
//! log: `start_segment end_segment duration_minutes`, whitespace separated,
//! one record per line. Lines starting with `#` are comments; a trip's
//! records are preceded by a `# trip <id>` header.

use serde::{Deserialize, Serialize};
use crate::error::{CoreError, Result};
use crate::id::TripId;

/// Index of one atomic route segment, in `[0, N-1]`.
pub type SegmentIndex = usize;

/// Boundary between segments, in `[0, N]`. Milestone `s` is the start of
/// segment `s`; milestone `N` is the end of segment `N-1`.
pub type Milestone = usize;

/// Travelling from the start of `start` to the end of `end` took `minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// First segment covered
    pub start: SegmentIndex,

    /// Last segment covered (inclusive)
    pub end: SegmentIndex,

    /// Travel time in minutes
    pub minutes: f64,
}

impl Observation {
    /// Create a validated observation.
    pub fn new(start: SegmentIndex, end: SegmentIndex, minutes: f64) -> Result<Self> {
        let obs = Self { start, end, minutes };
        obs.validate()?;
        Ok(obs)
    }

    /// Direct observation of a single segment.
    pub fn single(segment: SegmentIndex, minutes: f64) -> Result<Self> {
        Self::new(segment, segment, minutes)
    }

    /// Check ordering and duration.
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(self.invalid("start segment after end segment"));
        }
        if !self.minutes.is_finite() || self.minutes < 0.0 {
            return Err(self.invalid("duration must be a finite, non-negative number of minutes"));
        }
        Ok(())
    }

    /// True for single-segment (direct) evidence.
    pub fn is_direct(&self) -> bool {
        self.start == self.end
    }

    /// Number of segments covered.
    pub fn span(&self) -> usize {
        self.end - self.start + 1
    }

    /// Segment indices covered, in ascending order.
    pub fn segments(&self) -> std::ops::RangeInclusive<SegmentIndex> {
        self.start..=self.end
    }

    fn invalid(&self, reason: &str) -> CoreError {
        CoreError::InvalidObservation {
            value: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.start, self.end, self.minutes)
    }
}

impl std::str::FromStr for Observation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| CoreError::InvalidObservation {
            value: s.to_string(),
            reason,
        };

        let fields: Vec<&str> = s.split_whitespace().collect();
        let [start, end, minutes] = fields.as_slice() else {
            return Err(invalid(format!("expected 3 fields, found {}", fields.len())));
        };

        let start = start
            .parse::<SegmentIndex>()
            .map_err(|e| invalid(format!("start segment: {}", e)))?;
        let end = end
            .parse::<SegmentIndex>()
            .map_err(|e| invalid(format!("end segment: {}", e)))?;
        let minutes = minutes
            .parse::<f64>()
            .map_err(|e| invalid(format!("duration: {}", e)))?;

        Observation::new(start, end, minutes)
    }
}

/// Parse an observation log. Blank lines and `#` comments are ignored.
///
/// Errors name the 1-based line of the first bad record.
pub fn parse_log(text: &str) -> Result<Vec<Observation>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            line.parse::<Observation>().map_err(|e| match e {
                CoreError::InvalidObservation { value, reason } => CoreError::InvalidObservation {
                    value,
                    reason: format!("line {}: {}", i + 1, reason),
                },
                other => other,
            })
        })
        .collect()
}

/// Render observations in log form, one newline-terminated record each.
pub fn format_log<'a>(observations: impl IntoIterator<Item = &'a Observation>) -> String {
    observations
        .into_iter()
        .map(|obs| format!("{}\n", obs))
        .collect()
}

/// Render one trip's observations in log form under a `# trip <id>` header.
pub fn format_trip_log(trip: TripId, observations: &[Observation]) -> String {
    format!("# trip {}\n{}", trip, format_log(observations))
}

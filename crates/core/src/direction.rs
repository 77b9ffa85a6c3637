//! Direction of travel along a route.

use serde::{Deserialize, Serialize};
use crate::error::CoreError;
use crate::observation::Milestone;

/// Direction of travel along the ordered segments of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending segment order, from milestone 0 to milestone N
    Forward,
    /// Descending segment order, from milestone N to milestone 0
    Backward,
}

impl Direction {
    /// Signed milestone step: +1 or -1.
    pub fn step(self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    /// Milestone a trip starts from on a route of `num_segments` segments.
    pub fn start_milestone(self, num_segments: usize) -> Milestone {
        match self {
            Direction::Forward => 0,
            Direction::Backward => num_segments,
        }
    }

    /// Milestone a trip ends at on a route of `num_segments` segments.
    pub fn end_milestone(self, num_segments: usize) -> Milestone {
        self.reverse().start_milestone(num_segments)
    }

    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Advance `milestone` by one step.
    ///
    /// Returns `None` once the step would leave `[0, num_segments]`.
    pub fn advance(self, milestone: Milestone, num_segments: usize) -> Option<Milestone> {
        let next = milestone.checked_add_signed(self.step())?;
        (next <= num_segments).then_some(next)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" | "e" => Ok(Direction::Forward),
            "backward" | "w" => Ok(Direction::Backward),
            _ => Err(CoreError::InvalidInput(s.to_string())),
        }
    }
}

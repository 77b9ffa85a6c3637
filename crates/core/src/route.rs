//! Route model - named milestones and canonical segment times.

use serde::{Deserialize, Serialize};
use crate::error::{CoreError, Result};
use crate::observation::{Milestone, Observation};

/// A route of N ordered segments bounded by N+1 named milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Route name
    pub name: String,

    /// Short label for milestone 0
    pub begin_label: String,

    /// Short label for milestone N
    pub end_label: String,

    /// Milestone names, N+1 of them
    pub milestones: Vec<String>,

    /// Reference travel time of each segment in minutes, N of them
    pub reference_minutes: Vec<f64>,
}

impl Route {
    /// Number of segments.
    pub fn num_segments(&self) -> usize {
        self.reference_minutes.len()
    }

    /// Check that names and times agree.
    pub fn validate(&self) -> Result<()> {
        if self.reference_minutes.is_empty() {
            return Err(CoreError::InvalidRoute("route has no segments".into()));
        }
        if self.milestones.len() != self.reference_minutes.len() + 1 {
            return Err(CoreError::InvalidRoute(format!(
                "{} milestones for {} segments, expected {}",
                self.milestones.len(),
                self.reference_minutes.len(),
                self.reference_minutes.len() + 1,
            )));
        }
        if let Some(bad) = self
            .reference_minutes
            .iter()
            .position(|m| !m.is_finite() || *m < 0.0)
        {
            return Err(CoreError::InvalidRoute(format!(
                "segment {} has an invalid reference time",
                bad
            )));
        }
        Ok(())
    }

    /// Name of a milestone, if it exists.
    pub fn milestone_name(&self, milestone: Milestone) -> Option<&str> {
        self.milestones.get(milestone).map(String::as_str)
    }

    /// Reference times as direct observations, one per segment.
    pub fn seed_observations(&self) -> Result<Vec<Observation>> {
        self.validate()?;
        self.reference_minutes
            .iter()
            .enumerate()
            .map(|(segment, &minutes)| Observation::single(segment, minutes))
            .collect()
    }
}

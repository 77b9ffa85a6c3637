//! Trip tracking.
//!
//! A trip walks the route's milestones in one direction. Every timed
//! checkpoint becomes an observation that is fed back into the shared
//! estimator, so each trip sharpens the estimates for the next.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use travelometer_core::{
    CoreError, Direction, Milestone, Observation, Result, Time, TripId,
};

use crate::clock::{Clock, SystemClock};
use crate::estimator::SegmentEstimator;

/// Outcome of advancing a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepResult {
    /// More milestones ahead
    Continued,
    /// The far end of the route was reached; the trip is over
    Finished,
}

/// Lifecycle of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripState {
    /// Checkpoints and skips accepted
    InProgress,
    /// Terminal
    Finished,
}

/// Convert minutes of travel to a clock offset, rounded to the millisecond.
///
/// `None` when the offset does not fit a `Duration`.
pub fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    let millis = (minutes * 60_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Tracks one trip over a route, feeding checkpoints back into the estimator.
///
/// The estimator is borrowed exclusively for the life of the trip: it stays a
/// single shared instance, with one writer at a time.
pub struct TripTracker<'a, C: Clock = SystemClock> {
    id: TripId,
    estimator: &'a mut SegmentEstimator,
    clock: C,
    direction: Direction,
    last_milestone: Milestone,
    next_milestone: Milestone,
    last_clock: Time,
    recorded: Vec<Observation>,
    state: TripState,
}

impl<'a> TripTracker<'a, SystemClock> {
    /// Start a trip now, on the wall clock.
    pub fn new(estimator: &'a mut SegmentEstimator, direction: Direction) -> Self {
        Self::with_clock(estimator, direction, SystemClock)
    }

    /// Start a trip from a direction token (`forward`/`backward`, `E`/`W`).
    pub fn from_token(estimator: &'a mut SegmentEstimator, token: &str) -> Result<Self> {
        Ok(Self::new(estimator, token.parse()?))
    }
}

impl<'a, C: Clock> TripTracker<'a, C> {
    /// Start a trip now, on the given clock.
    pub fn with_clock(estimator: &'a mut SegmentEstimator, direction: Direction, clock: C) -> Self {
        let num_segments = estimator.num_segments();
        let last_milestone = direction.start_milestone(num_segments);
        // a route always has at least one segment, so the first step exists
        let next_milestone = last_milestone
            .checked_add_signed(direction.step())
            .unwrap_or(last_milestone);
        let last_clock = clock.now();
        let id = TripId::new();

        info!(
            "Trip {} started {} at milestone {} ({} segments)",
            id, direction, last_milestone, num_segments
        );

        Self {
            id,
            estimator,
            clock,
            direction,
            last_milestone,
            next_milestone,
            last_clock,
            recorded: Vec::new(),
            state: TripState::InProgress,
        }
    }

    /// Trip identifier.
    pub fn id(&self) -> TripId {
        self.id
    }

    /// Direction of travel.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Lifecycle state.
    pub fn state(&self) -> TripState {
        self.state
    }

    /// Read access to the shared estimator.
    pub fn estimator(&self) -> &SegmentEstimator {
        &*self.estimator
    }

    /// Last milestone passed and when.
    pub fn last_checkpoint(&self) -> (Milestone, Time) {
        (self.last_milestone, self.last_clock)
    }

    /// Milestone the traveller is heading for; `None` once finished.
    pub fn next_milestone(&self) -> Option<Milestone> {
        match self.state {
            TripState::InProgress => Some(self.next_milestone),
            TripState::Finished => None,
        }
    }

    /// Observations recorded by this trip's checkpoints, in order.
    pub fn recorded_segments(&self) -> &[Observation] {
        &self.recorded
    }

    /// Give up the recorded observations, ending the borrow of the estimator.
    pub fn into_recorded(self) -> Vec<Observation> {
        self.recorded
    }

    /// The traveller just reached the next milestone.
    ///
    /// Records the elapsed time as an observation over the segments passed
    /// since the last checkpoint and re-runs the estimator.
    pub fn checkpoint(&mut self) -> Result<StepResult> {
        self.ensure_in_progress()?;

        let now = self.clock.now();
        let elapsed_ms = (now - self.last_clock).num_milliseconds().max(0);
        let minutes = elapsed_ms as f64 / 60_000.0;

        let (start, end) = match self.direction {
            Direction::Forward => (self.last_milestone, self.next_milestone - 1),
            Direction::Backward => (self.next_milestone, self.last_milestone - 1),
        };
        let obs = Observation::new(start, end, minutes)?;

        self.estimator.add_observation(obs)?;
        self.recorded.push(obs);
        let convergence = self.estimator.run_to_convergence()?;
        debug!(
            "Re-estimated after checkpoint: converged={} iterations={}",
            convergence.converged, convergence.iterations
        );

        info!(
            "Trip {} reached milestone {} ({:.1} min over segments {}..={})",
            self.id, self.next_milestone, minutes, start, end
        );

        self.last_milestone = self.next_milestone;
        self.last_clock = now;
        Ok(self.step_from(self.last_milestone))
    }

    /// The next milestone was passed without a timed checkpoint.
    ///
    /// The following checkpoint will cover the skipped segments as one
    /// aggregate observation.
    pub fn skip_milestone(&mut self) -> Result<StepResult> {
        self.ensure_in_progress()?;

        info!("Trip {} skipped milestone {}", self.id, self.next_milestone);
        Ok(self.step_from(self.next_milestone))
    }

    /// Minutes of travel from the last checkpoint to `milestone`.
    pub fn remaining_minutes(&self, milestone: Milestone) -> Result<f64> {
        self.ensure_in_progress()?;

        let num_segments = self.estimator.num_segments();
        let segments = match self.direction {
            Direction::Forward if milestone >= self.last_milestone && milestone <= num_segments => {
                self.last_milestone..milestone
            }
            Direction::Backward if milestone <= self.last_milestone => {
                milestone..self.last_milestone
            }
            _ => {
                return Err(CoreError::MilestoneOutOfRange {
                    milestone,
                    last: self.last_milestone,
                    num_segments,
                })
            }
        };

        segments
            .map(|segment| {
                self.estimator
                    .estimate(segment)
                    .ok_or(CoreError::UnestimatedSegment(segment))
            })
            .sum()
    }

    /// Projected arrival time at `milestone`.
    pub fn estimated_time_to(&self, milestone: Milestone) -> Result<Time> {
        let minutes = self.remaining_minutes(milestone)?;
        minutes_to_duration(minutes)
            .and_then(|offset| self.last_clock.checked_add_signed(offset))
            .ok_or(CoreError::ProjectionOutOfRange { minutes })
    }

    /// Projected arrival time at the next milestone.
    pub fn estimated_next(&self) -> Result<Time> {
        self.estimated_time_to(self.next_milestone)
    }

    /// Projected arrival time at the far end of the route.
    pub fn estimated_finish(&self) -> Result<Time> {
        self.estimated_time_to(self.end_milestone())
    }

    /// Milestone at the far end in the direction of travel.
    pub fn end_milestone(&self) -> Milestone {
        self.direction.end_milestone(self.estimator.num_segments())
    }

    fn step_from(&mut self, from: Milestone) -> StepResult {
        match self.direction.advance(from, self.estimator.num_segments()) {
            Some(next) => {
                self.next_milestone = next;
                StepResult::Continued
            }
            None => {
                self.state = TripState::Finished;
                info!(
                    "Trip {} finished with {} recorded segments",
                    self.id,
                    self.recorded.len()
                );
                StepResult::Finished
            }
        }
    }

    fn ensure_in_progress(&self) -> Result<()> {
        match self.state {
            TripState::InProgress => Ok(()),
            TripState::Finished => Err(CoreError::TripFinished),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn start_time() -> Time {
        Utc.with_ymd_and_hms(2024, 7, 4, 6, 30, 0).unwrap()
    }

    fn estimator(minutes: &[f64]) -> SegmentEstimator {
        let seeds = minutes
            .iter()
            .enumerate()
            .map(|(s, &m)| Observation::single(s, m).unwrap());
        let mut est = SegmentEstimator::new(seeds).unwrap();
        est.run_to_convergence().unwrap();
        est
    }

    #[test]
    fn test_forward_trip_runs_to_the_end() {
        let mut est = estimator(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let clock = ManualClock::new(start_time());
        let mut trip = TripTracker::with_clock(&mut est, Direction::Forward, clock.clone());

        assert_eq!(trip.last_checkpoint(), (0, start_time()));
        assert_eq!(trip.next_milestone(), Some(1));

        for expected_next in 2..=5 {
            clock.advance_minutes(12);
            assert_eq!(trip.checkpoint().unwrap(), StepResult::Continued);
            assert_eq!(trip.next_milestone(), Some(expected_next));
        }

        clock.advance_minutes(12);
        assert_eq!(trip.checkpoint().unwrap(), StepResult::Finished);
        assert_eq!(trip.state(), TripState::Finished);
        assert_eq!(trip.next_milestone(), None);
        assert_eq!(trip.recorded_segments().len(), 5);
        assert_eq!(trip.last_checkpoint().0, 5);

        assert_eq!(trip.checkpoint(), Err(CoreError::TripFinished));
        assert_eq!(trip.skip_milestone(), Err(CoreError::TripFinished));
        assert_eq!(trip.estimated_finish(), Err(CoreError::TripFinished));
    }

    #[test]
    fn test_checkpoint_records_elapsed_minutes() {
        let mut est = estimator(&[10.0, 20.0]);
        let clock = ManualClock::new(start_time());
        let mut trip = TripTracker::with_clock(&mut est, Direction::Forward, clock.clone());

        clock.advance(Duration::seconds(90));
        trip.checkpoint().unwrap();

        assert_eq!(
            trip.recorded_segments(),
            &[Observation { start: 0, end: 0, minutes: 1.5 }]
        );
        assert_eq!(
            trip.last_checkpoint(),
            (1, start_time() + Duration::seconds(90))
        );
    }

    #[test]
    fn test_checkpoint_feeds_the_estimator() {
        let mut est = estimator(&[10.0, 20.0]);
        let clock = ManualClock::new(start_time());
        {
            let mut trip = TripTracker::with_clock(&mut est, Direction::Forward, clock.clone());
            clock.advance_minutes(30);
            trip.checkpoint().unwrap();
            // samples {10, 30}
            assert_eq!(trip.estimator().estimate(0), Some(20.0));
        }
        assert_eq!(est.observation_count(), 3);
        assert_eq!(est.estimate(0), Some(20.0));
    }

    #[test]
    fn test_skip_leaves_clock_and_log_alone() {
        let mut est = estimator(&[10.0, 20.0, 30.0]);
        let clock = ManualClock::new(start_time());
        let mut trip = TripTracker::with_clock(&mut est, Direction::Forward, clock.clone());

        clock.advance_minutes(5);
        assert_eq!(trip.skip_milestone().unwrap(), StepResult::Continued);

        assert_eq!(trip.next_milestone(), Some(2));
        assert_eq!(trip.last_checkpoint(), (0, start_time()));
        assert!(trip.recorded_segments().is_empty());
    }

    #[test]
    fn test_checkpoint_after_skip_records_aggregate() {
        let mut est = estimator(&[10.0, 20.0, 30.0]);
        let clock = ManualClock::new(start_time());
        let mut trip = TripTracker::with_clock(&mut est, Direction::Forward, clock.clone());

        trip.skip_milestone().unwrap();
        clock.advance_minutes(33);
        trip.checkpoint().unwrap();

        assert_eq!(
            trip.recorded_segments(),
            &[Observation { start: 0, end: 1, minutes: 33.0 }]
        );
        assert_eq!(trip.last_checkpoint().0, 2);
        assert_eq!(trip.next_milestone(), Some(3));
    }

    #[test]
    fn test_skip_past_the_end_finishes() {
        let mut est = estimator(&[10.0, 20.0]);
        let mut trip = TripTracker::with_clock(
            &mut est,
            Direction::Forward,
            ManualClock::new(start_time()),
        );

        assert_eq!(trip.skip_milestone().unwrap(), StepResult::Continued);
        assert_eq!(trip.skip_milestone().unwrap(), StepResult::Finished);
        assert!(trip.recorded_segments().is_empty());
    }

    #[test]
    fn test_backward_trip() {
        let mut est = estimator(&[10.0, 20.0, 30.0]);
        let clock = ManualClock::new(start_time());
        let mut trip = TripTracker::with_clock(&mut est, Direction::Backward, clock.clone());

        assert_eq!(trip.last_checkpoint().0, 3);
        assert_eq!(trip.next_milestone(), Some(2));
        assert_eq!(trip.end_milestone(), 0);

        clock.advance_minutes(30);
        trip.checkpoint().unwrap();
        trip.skip_milestone().unwrap();
        clock.advance_minutes(30);
        assert_eq!(trip.checkpoint().unwrap(), StepResult::Finished);

        assert_eq!(
            trip.recorded_segments(),
            &[
                Observation { start: 2, end: 2, minutes: 30.0 },
                Observation { start: 0, end: 1, minutes: 30.0 },
            ]
        );
    }

    #[test]
    fn test_estimated_finish_at_start() {
        let mut est = estimator(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let trip = TripTracker::with_clock(
            &mut est,
            Direction::Forward,
            ManualClock::new(start_time()),
        );

        assert_eq!(trip.remaining_minutes(5).unwrap(), 150.0);
        assert_eq!(
            trip.estimated_finish().unwrap(),
            start_time() + Duration::minutes(150)
        );
        assert_eq!(
            trip.estimated_next().unwrap(),
            start_time() + Duration::minutes(10)
        );
        assert_eq!(trip.estimated_time_to(0).unwrap(), start_time());
    }

    #[test]
    fn test_backward_projection_sums_behind_last_milestone() {
        let mut est = estimator(&[10.0, 20.0, 30.0]);
        let trip = TripTracker::with_clock(
            &mut est,
            Direction::Backward,
            ManualClock::new(start_time()),
        );

        assert_eq!(trip.remaining_minutes(2).unwrap(), 30.0);
        assert_eq!(
            trip.estimated_finish().unwrap(),
            start_time() + Duration::minutes(60)
        );
    }

    #[test]
    fn test_projection_moves_with_checkpoints() {
        let mut est = estimator(&[10.0, 20.0, 30.0]);
        let clock = ManualClock::new(start_time());
        let mut trip = TripTracker::with_clock(&mut est, Direction::Forward, clock.clone());

        clock.advance_minutes(10);
        trip.checkpoint().unwrap();

        assert_eq!(trip.remaining_minutes(3).unwrap(), 50.0);
        assert_eq!(
            trip.estimated_finish().unwrap(),
            start_time() + Duration::minutes(60)
        );
    }

    #[test]
    fn test_milestone_behind_traveller_is_rejected() {
        let mut est = estimator(&[10.0, 20.0, 30.0]);
        let clock = ManualClock::new(start_time());
        let mut trip = TripTracker::with_clock(&mut est, Direction::Forward, clock.clone());
        clock.advance_minutes(10);
        trip.checkpoint().unwrap();

        assert!(matches!(
            trip.estimated_time_to(0),
            Err(CoreError::MilestoneOutOfRange { milestone: 0, last: 1, .. })
        ));
        assert!(trip.estimated_time_to(4).is_err());
    }

    #[test]
    fn test_unestimated_segment_blocks_projection() {
        let mut est = SegmentEstimator::new(vec![Observation::single(2, 10.0).unwrap()]).unwrap();
        let trip = TripTracker::with_clock(
            &mut est,
            Direction::Forward,
            ManualClock::new(start_time()),
        );

        assert_eq!(trip.estimated_finish(), Err(CoreError::UnestimatedSegment(0)));
    }

    #[test]
    fn test_huge_estimate_fails_projection_instead_of_panicking() {
        let mut est = SegmentEstimator::new(vec![Observation::single(0, 1e300).unwrap()]).unwrap();
        est.run_to_convergence().unwrap();
        let trip = TripTracker::with_clock(
            &mut est,
            Direction::Forward,
            ManualClock::new(start_time()),
        );

        assert_eq!(
            trip.estimated_finish(),
            Err(CoreError::ProjectionOutOfRange { minutes: 1e300 })
        );
        assert_eq!(trip.remaining_minutes(1).unwrap(), 1e300);
    }

    #[test]
    fn test_minutes_to_duration_bounds() {
        assert_eq!(minutes_to_duration(1.5), Some(Duration::seconds(90)));
        assert_eq!(minutes_to_duration(1e300), None);
        // a few hundred million years still fits a Duration but not a DateTime
        let mut est = SegmentEstimator::new(vec![Observation::single(0, 1e14).unwrap()]).unwrap();
        est.run_to_convergence().unwrap();
        let trip = TripTracker::with_clock(
            &mut est,
            Direction::Forward,
            ManualClock::new(start_time()),
        );
        assert!(matches!(
            trip.estimated_finish(),
            Err(CoreError::ProjectionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_unrecognised_direction_token() {
        let mut est = estimator(&[10.0]);
        let err = TripTracker::from_token(&mut est, "N").err().unwrap();
        assert_eq!(err, CoreError::InvalidInput("N".to_string()));

        let trip = TripTracker::from_token(&mut est, "forward").unwrap();
        assert_eq!(trip.direction(), Direction::Forward);
    }

    #[test]
    fn test_trips_share_one_estimator() {
        let mut est = estimator(&[10.0]);
        let clock = ManualClock::new(start_time());

        for _ in 0..2 {
            let mut trip = TripTracker::with_clock(&mut est, Direction::Forward, clock.clone());
            clock.advance_minutes(40);
            assert_eq!(trip.checkpoint().unwrap(), StepResult::Finished);
        }

        // samples {10, 40, 40}
        assert_eq!(est.estimate(0), Some(40.0));
    }
}

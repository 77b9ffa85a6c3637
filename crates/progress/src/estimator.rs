//! Per-segment travel time estimation.
//!
//! Direct observations time a single segment. Aggregate observations only
//! time a contiguous run of segments as a lump sum, so each reallocation pass
//! splits every aggregate across its members in proportion to the previous
//! pass's estimates and refits each segment to the median of its evidence.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use travelometer_core::{CoreError, Observation, Result, SegmentIndex};

/// Configuration for the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Upper bound on reallocation passes per convergence run
    pub max_iterations: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// Outcome of a convergence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Convergence {
    /// Whether the last pass left the estimates bitwise unchanged
    pub converged: bool,

    /// Passes performed
    pub iterations: usize,
}

/// Median of a sample: the middle value for odd sizes, the mean of the two
/// middle values for even sizes. `None` for an empty sample.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Iterative median estimator over overlapping segment observations.
#[derive(Debug, Clone)]
pub struct SegmentEstimator {
    num_segments: usize,
    direct: Vec<Vec<f64>>,
    aggregates: Vec<Observation>,
    estimates: Vec<Option<f64>>,
    config: EstimatorConfig,
}

impl SegmentEstimator {
    /// Build an estimator from seed observations.
    ///
    /// The route length is one more than the largest end segment seen.
    /// Initial estimates are the medians of the direct observations only.
    pub fn new(observations: impl IntoIterator<Item = Observation>) -> Result<Self> {
        let observations: Vec<Observation> = observations.into_iter().collect();
        for obs in &observations {
            obs.validate()?;
        }

        let num_segments = observations
            .iter()
            .map(|obs| obs.end + 1)
            .max()
            .ok_or(CoreError::EmptyObservations)?;

        let mut direct = vec![Vec::new(); num_segments];
        let mut aggregates = Vec::new();
        for obs in observations {
            if obs.is_direct() {
                direct[obs.start].push(obs.minutes);
            } else {
                aggregates.push(obs);
            }
        }

        let estimates = direct.iter().map(|sample| median(sample)).collect();

        debug!(
            "Estimator built: {} segments, {} aggregate observations",
            num_segments,
            aggregates.len()
        );

        Ok(Self {
            num_segments,
            direct,
            aggregates,
            estimates,
            config: EstimatorConfig::default(),
        })
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EstimatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> EstimatorConfig {
        self.config
    }

    /// Number of segments on the route.
    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    /// Total observations held, direct and aggregate.
    pub fn observation_count(&self) -> usize {
        self.direct.iter().map(Vec::len).sum::<usize>() + self.aggregates.len()
    }

    /// Record a new observation. Estimates are not refreshed until the next
    /// convergence run.
    pub fn add_observation(&mut self, obs: Observation) -> Result<()> {
        obs.validate()?;
        self.check_in_range(&obs)?;

        if obs.is_direct() {
            self.direct[obs.start].push(obs.minutes);
        } else {
            self.aggregates.push(obs);
        }
        Ok(())
    }

    /// Current per-segment estimates in minutes, one per segment.
    pub fn results(&self) -> &[Option<f64>] {
        &self.estimates
    }

    /// Estimate for one segment, if any evidence has reached it.
    pub fn estimate(&self, segment: SegmentIndex) -> Option<f64> {
        self.estimates.get(segment).copied().flatten()
    }

    /// One reallocation pass. Returns `true` when the pass left every
    /// estimate bitwise unchanged.
    pub fn iterate(&mut self) -> Result<bool> {
        let previous = &self.estimates;
        let mut samples = self.direct.clone();

        for agg in &self.aggregates {
            // new() sizes the route from the largest end and add_observation
            // rejects anything past it
            debug_assert!(agg.end < self.num_segments);
            for (segment, share) in agg.segments().zip(split(agg, previous)) {
                samples[segment].push(share);
            }
        }

        let next: Vec<Option<f64>> = samples.iter().map(|sample| median(sample)).collect();
        let unchanged = same_bits(previous, &next);
        self.estimates = next;
        Ok(unchanged)
    }

    /// Reallocate until a fixed point or the configured iteration bound.
    pub fn run_to_convergence(&mut self) -> Result<Convergence> {
        self.run_to_convergence_within(self.config.max_iterations)
    }

    /// Reallocate until a fixed point or `max_iterations` passes.
    pub fn run_to_convergence_within(&mut self, max_iterations: usize) -> Result<Convergence> {
        let mut iterations = 0;
        while iterations < max_iterations {
            iterations += 1;
            if self.iterate()? {
                debug!("Estimates converged after {} iterations", iterations);
                return Ok(Convergence {
                    converged: true,
                    iterations,
                });
            }
        }

        if !self.aggregates.is_empty() {
            warn!("Estimates still moving after {} iterations", iterations);
        }
        Ok(Convergence {
            converged: false,
            iterations,
        })
    }

    fn check_in_range(&self, obs: &Observation) -> Result<()> {
        if obs.end >= self.num_segments {
            return Err(CoreError::SegmentOutOfRange {
                segment: obs.end,
                num_segments: self.num_segments,
            });
        }
        Ok(())
    }
}

/// Shares of an aggregate's duration, proportional to the members' current
/// estimates. Falls back to an equal split when any member is unestimated or
/// the members sum to zero.
fn split(agg: &Observation, estimates: &[Option<f64>]) -> Vec<f64> {
    let members = &estimates[agg.start..=agg.end];
    let known: Option<Vec<f64>> = members.iter().copied().collect();

    match known {
        Some(known) => {
            let current_sum: f64 = known.iter().sum();
            if current_sum > 0.0 {
                return known
                    .iter()
                    .map(|estimate| agg.minutes * estimate / current_sum)
                    .collect();
            }
            vec![agg.minutes / agg.span() as f64; agg.span()]
        }
        None => vec![agg.minutes / agg.span() as f64; agg.span()],
    }
}

fn same_bits(a: &[Option<f64>], b: &[Option<f64>]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.map(f64::to_bits) == y.map(f64::to_bits))
}

//! Storage trait abstraction.

use async_trait::async_trait;
use travelometer_core::{CoreError, Observation, Route, TripId};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored data failed validation
    #[error("invalid data: {0}")]
    Invalid(#[from] CoreError),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Storage abstraction for Travelometer data.
///
/// This trait allows different storage backends to be plugged in.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Route operations ===

    /// Save the route definition.
    async fn save_route(&mut self, route: &Route) -> Result<()>;

    /// Load the route definition, if one was saved.
    async fn load_route(&self) -> Result<Option<Route>>;

    // === Observation log ===

    /// Load every logged observation, oldest first.
    async fn load_observations(&self) -> Result<Vec<Observation>>;

    /// Append observations to the log.
    async fn append_observations(&mut self, observations: &[Observation]) -> Result<()>;

    /// Append one trip's observations to the log, tagged with the trip id.
    async fn append_trip(&mut self, trip: TripId, observations: &[Observation]) -> Result<()>;

    /// Route reference times followed by the logged observations: the seed
    /// data for an estimator.
    async fn history(&self) -> Result<(Route, Vec<Observation>)> {
        let route = self
            .load_route()
            .await?
            .ok_or_else(|| StorageError::NotFound("route".to_string()))?;

        let mut observations = route.seed_observations()?;
        observations.extend(self.load_observations().await?);
        Ok((route, observations))
    }
}

//! Plain file storage implementation.
//!
//! Keeps the route as `route.json` and the observation log as
//! `observations.dat` (one `start end minutes` record per line) under a
//! single data directory.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use travelometer_core::{format_log, format_trip_log, parse_log, Observation, Route, TripId};

use super::{Result, Storage};

const ROUTE_FILE: &str = "route.json";
const LOG_FILE: &str = "observations.dat";

/// File-based storage backend.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn route_path(&self) -> PathBuf {
        self.root.join(ROUTE_FILE)
    }

    fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    async fn append_log(&self, text: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for FileStorage {
    async fn save_route(&mut self, route: &Route) -> Result<()> {
        route.validate()?;
        let json = serde_json::to_string_pretty(route)?;
        fs::write(self.route_path(), json.as_bytes()).await?;
        Ok(())
    }

    async fn load_route(&self) -> Result<Option<Route>> {
        match fs::read_to_string(self.route_path()).await {
            Ok(json) => {
                let route: Route = serde_json::from_str(&json)?;
                route.validate()?;
                Ok(Some(route))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_observations(&self) -> Result<Vec<Observation>> {
        match fs::read_to_string(self.log_path()).await {
            Ok(text) => {
                let observations = parse_log(&text)?;
                debug!("Loaded {} logged observations", observations.len());
                Ok(observations)
            }
            // no trips logged yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_observations(&mut self, observations: &[Observation]) -> Result<()> {
        if observations.is_empty() {
            return Ok(());
        }

        self.append_log(&format_log(observations)).await?;
        debug!("Appended {} observations", observations.len());
        Ok(())
    }

    async fn append_trip(&mut self, trip: TripId, observations: &[Observation]) -> Result<()> {
        if observations.is_empty() {
            return Ok(());
        }

        self.append_log(&format_trip_log(trip, observations)).await?;
        debug!("Appended {} observations for trip {}", observations.len(), trip);
        Ok(())
    }
}

//! Travelometer CLI - per-segment travel estimates and live trip ETAs.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use travelometer_core::{CoreError, Direction, Milestone, Observation, Route, Time, TripId};
use travelometer_progress::{
    Clock, EstimatorConfig, SegmentEstimator, StepResult, SystemClock, TripTracker,
};
use travelometer_storage::{FileStorage, Storage};

const SAMPLE_ROUTE: &str = include_str!("../../../routes/al-wv.json");

#[derive(Parser)]
#[command(name = "travelometer")]
#[command(about = "Travel time estimates from overlapping trip logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory holding route.json and observations.dat
    #[arg(short, long, default_value = ".travelometer", global = true)]
    data: PathBuf,

    /// Upper bound on reallocation passes per estimate refresh
    #[arg(long, default_value = "10", global = true)]
    max_iterations: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a route definition into the data directory
    Init {
        /// Route JSON file (defaults to the bundled AL to WV route)
        #[arg(long)]
        route: Option<PathBuf>,
        /// Replace an existing route
        #[arg(long)]
        force: bool,
    },
    /// Show per-segment estimates
    Estimate {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Track a trip interactively
    Trip {
        /// forward/backward (or E/W)
        direction: String,
    },
    /// Log one observation by hand
    Record {
        /// First segment covered
        start: usize,
        /// Last segment covered
        end: usize,
        /// Travel time in minutes
        minutes: f64,
    },
    /// Show the observation log
    Log,
}

/// One line of trip input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Checkpoint,
    Skip,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EstimatorConfig {
        max_iterations: cli.max_iterations,
    };

    let mut storage = FileStorage::new(&cli.data).await?;

    match cli.command {
        Commands::Init { route, force } => {
            if storage.load_route().await?.is_some() && !force {
                anyhow::bail!(
                    "route already defined in {} (use --force to replace)",
                    cli.data.display()
                );
            }
            let json = match route {
                Some(path) => tokio::fs::read_to_string(path).await?,
                None => SAMPLE_ROUTE.to_string(),
            };
            let route: Route = serde_json::from_str(&json)?;
            storage.save_route(&route).await?;
            println!(
                "Route '{}' saved: {} segments, {} to {}",
                route.name,
                route.num_segments(),
                route.begin_label,
                route.end_label
            );
        }
        Commands::Estimate { json } => {
            let (route, estimator) = load_estimator(&storage, config).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(estimator.results())?);
                return Ok(());
            }

            println!("{} ({} observations)", route.name, estimator.observation_count());
            for (segment, estimate) in estimator.results().iter().enumerate() {
                println!(
                    "  {:>2} | {:>6.1} | {:>6} | {} -> {}",
                    segment,
                    route.reference_minutes[segment],
                    format_minutes(*estimate),
                    milestone_name(&route, segment),
                    milestone_name(&route, segment + 1),
                );
            }
            let total: Option<f64> = estimator.results().iter().copied().sum();
            println!("  Total: {}", format_minutes(total));
        }
        Commands::Trip { direction } => {
            let direction: Direction = direction.parse()?;
            let (route, mut estimator) = load_estimator(&storage, config).await?;

            let stdin = BufReader::new(tokio::io::stdin());
            let (trip_id, recorded) =
                run_trip(&route, &mut estimator, direction, stdin, SystemClock).await?;
            storage.append_trip(trip_id, &recorded).await?;
            info!("Saved {} observations for trip {}", recorded.len(), trip_id);
        }
        Commands::Record { start, end, minutes } => {
            let (route, _) = storage.history().await?;
            let obs = Observation::new(start, end, minutes)?;
            if obs.end >= route.num_segments() {
                return Err(CoreError::SegmentOutOfRange {
                    segment: obs.end,
                    num_segments: route.num_segments(),
                }
                .into());
            }
            storage.append_observations(&[obs]).await?;
            println!("Recorded: {}", obs);
        }
        Commands::Log => {
            let (route, _) = storage.history().await?;
            let observations = storage.load_observations().await?;

            println!("Observations ({})", observations.len());
            for obs in observations {
                println!(
                    "  {} | {} -> {}",
                    obs,
                    milestone_name(&route, obs.start),
                    milestone_name(&route, obs.end + 1),
                );
            }
        }
    }

    Ok(())
}

async fn load_estimator(
    storage: &FileStorage,
    config: EstimatorConfig,
) -> Result<(Route, SegmentEstimator)> {
    let (route, observations) = storage.history().await?;
    let mut estimator = SegmentEstimator::new(observations)?.with_config(config);
    anyhow::ensure!(
        estimator.num_segments() == route.num_segments(),
        "observation log covers {} segments but the route has {}",
        estimator.num_segments(),
        route.num_segments()
    );

    let convergence = estimator.run_to_convergence()?;
    info!(
        "Estimates ready: converged={} after {} iterations",
        convergence.converged, convergence.iterations
    );
    Ok((route, estimator))
}

/// Drive one trip from line input. Returns the trip id and the observations
/// it recorded, also when the traveller quits early or input ends.
async fn run_trip<R, C>(
    route: &Route,
    estimator: &mut SegmentEstimator,
    direction: Direction,
    input: R,
    clock: C,
) -> Result<(TripId, Vec<Observation>)>
where
    R: AsyncBufRead + Unpin,
    C: Clock + Clone,
{
    let mut trip = TripTracker::with_clock(estimator, direction, clock.clone());
    let mut lines = input.lines();

    loop {
        print_status(route, &trip, clock.now());
        println!("[C]heckpoint, [S]kip or [Q]uit?");

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let step = match parse_action(&line) {
            Ok(Action::Checkpoint) => trip.checkpoint()?,
            Ok(Action::Skip) => trip.skip_milestone()?,
            Ok(Action::Quit) => break,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        if step == StepResult::Finished {
            let (_, at) = trip.last_checkpoint();
            println!("Arrived: {} at {}", end_label(route, direction), format_clock(at));
            break;
        }
    }

    let trip_id = trip.id();
    Ok((trip_id, trip.into_recorded()))
}

fn print_status<C: Clock>(route: &Route, trip: &TripTracker<'_, C>, now: Time) {
    let (last, at) = trip.last_checkpoint();
    println!("Last checkpoint: {} at {}", milestone_name(route, last), format_clock(at));

    if let Some(next) = trip.next_milestone() {
        match trip.estimated_time_to(next) {
            Ok(eta) => println!("Next checkpoint: {} at {}", milestone_name(route, next), format_clock(eta)),
            Err(e) => println!("Next checkpoint: {} ({})", milestone_name(route, next), e),
        }
    }

    let end = trip.end_milestone();
    match (trip.remaining_minutes(end), trip.estimated_finish()) {
        (Ok(minutes), Ok(eta)) => {
            println!("Remaining minutes: {:.0}", minutes);
            println!("ETA: {} ({})", format_clock(eta), format_countdown(eta, now));
        }
        (Err(e), _) | (_, Err(e)) => println!("ETA unavailable: {}", e),
    }
}

fn parse_action(input: &str) -> std::result::Result<Action, CoreError> {
    match input.trim().to_lowercase().as_str() {
        "c" | "checkpoint" => Ok(Action::Checkpoint),
        "s" | "skip" => Ok(Action::Skip),
        "q" | "quit" => Ok(Action::Quit),
        _ => Err(CoreError::InvalidInput(input.trim().to_string())),
    }
}

fn milestone_name(route: &Route, milestone: Milestone) -> &str {
    route.milestone_name(milestone).unwrap_or("?")
}

fn format_minutes(minutes: Option<f64>) -> String {
    match minutes {
        Some(m) => format!("{:.1}", m),
        None => "-".to_string(),
    }
}

fn format_clock(at: Time) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// `T minus HH:MM:SS` before the ETA, `T plus HH:MM:SS` after it.
fn format_countdown(eta: Time, now: Time) -> String {
    let delta = eta - now;
    let (label, secs) = if delta.num_seconds() >= 0 {
        ("T minus", delta.num_seconds())
    } else {
        ("T plus", -delta.num_seconds())
    };
    format!(
        "{} {:02}:{:02}:{:02}",
        label,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

fn end_label(route: &Route, direction: Direction) -> &str {
    match direction {
        Direction::Forward => &route.end_label,
        Direction::Backward => &route.begin_label,
    }
}

//! # Powerlog
//!
//! Periodic electrical metering daemon.
//!
//! Samples per-channel currents at a fixed cadence, derives power and
//! accumulated tariff cost, appends every reading to a day-scoped and a
//! month-scoped CSV log, mirrors each tick to a time-series sink, and
//! archives completed log files offsite at calendar rollovers.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{error, info};

use powerlog::acquisition::SimulatedCurrentSource;
use powerlog::archive::{ArchiveUploader, LocalMirrorUploader, NullUploader};
use powerlog::config::Config;
use powerlog::session::LoggerSession;
use powerlog::sink::{JsonlSink, NullSink, TimeSeriesSink};

/// Default configuration file path when none is given on the command
/// line.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the Powerlog daemon
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load and validate configuration
///    - Wire the acquisition, time-series, and archive collaborators
///    - Build the logging session (cold-start: existing files for the
///      current day/month are adopted, not archived)
///
/// 2. **Main Loop**
///    - Tick at the configured interval, aligned to in-minute second
///      offsets (a 5s interval fires at :00, :05, :10, ...)
///    - Skip, never queue, ticks that overrun the interval
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop sampling between rows, leaving no partial row behind
///    - Log total tick count
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or the log
/// directory cannot be prepared. Collaborator failures during operation
/// are logged and never abort the loop.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Powerlog v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    info!(
        "Loaded configuration from {} (site {}, logger {})",
        config_path, config.identity.site, config.identity.logger
    );

    let source = Box::new(SimulatedCurrentSource::new(
        config.channels.count,
        config.channels.capacity,
    ));

    let sink: Arc<dyn TimeSeriesSink> = if config.timeseries.enabled {
        let path = Path::new(&config.storage.directory).join("timeseries.jsonl");
        Arc::new(JsonlSink::new(path))
    } else {
        Arc::new(NullSink)
    };

    let uploader: Arc<dyn ArchiveUploader> = if config.archive.enabled {
        Arc::new(LocalMirrorUploader::new(
            config.archive.mirror_directory.clone(),
        ))
    } else {
        Arc::new(NullUploader)
    };

    let mut session = LoggerSession::new(&config, source, sink, uploader)?;
    info!(
        "Logging {} channels every {}s to {}",
        config.channels.count, config.sampling.interval_secs, config.storage.directory
    );

    // Align the first tick to the next in-minute offset, then fire at
    // fixed offsets so drift comes only from timer precision.
    let period = Duration::from_secs(config.sampling.interval_secs);
    let start = Instant::now() + alignment_delay(config.sampling.interval_secs);
    let mut tick_interval = interval_at(start, period);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Press Ctrl+C to exit");

    // Main sampling loop
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                if let Err(e) = session.tick().await {
                    error!("Tick failed: {}", e);
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total ticks recorded: {}", session.tick_count());
                break;
            }
        }
    }

    Ok(())
}

/// Delay until the next in-minute offset that is a multiple of the
/// sampling interval.
fn alignment_delay(interval_secs: u64) -> Duration {
    alignment_delay_from(chrono::Utc::now().timestamp_millis(), interval_secs)
}

fn alignment_delay_from(now_ms: i64, interval_secs: u64) -> Duration {
    let interval_ms = (interval_secs * 1000) as i64;
    let into_minute = now_ms.rem_euclid(60_000);
    let next = ((into_minute / interval_ms) + 1) * interval_ms;
    Duration::from_millis((next - into_minute) as u64)
}

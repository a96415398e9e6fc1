//! # Session Module
//!
//! The per-process logging session: owns the live [`Reading`], the
//! day- and month-scoped log files, and the collaborator handles, and
//! drives one tick end to end.
//!
//! A session is owned by exactly one driving task, so the rotate→append
//! sequence of a tick is mutually exclusive by construction. Archive
//! uploads and time-series writes are spawned as background tasks and
//! never block the next tick.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::acquisition::CurrentSource;
use crate::archive::{self, ArchiveUploader};
use crate::config::Config;
use crate::error::Result;
use crate::logfile::continuity::ContinuityTracker;
use crate::logfile::{Granularity, Rotation, RotatingLogFile};
use crate::reading::Reading;
use crate::sink::{self, SamplePoint, TimeSeriesSink};
use crate::tariff::TariffCalculator;

/// One logging session, driven at a fixed cadence by the main loop.
pub struct LoggerSession {
    tick_secs: u64,
    capacity: f64,
    status_every_ticks: u64,
    timeseries_enabled: bool,
    measurement: String,
    remote_dir: String,
    tz: Tz,
    tariff: TariffCalculator,
    tracker: ContinuityTracker,
    reading: Reading,
    day_file: RotatingLogFile,
    month_file: RotatingLogFile,
    source: Box<dyn CurrentSource>,
    sink: Arc<dyn TimeSeriesSink>,
    uploader: Arc<dyn ArchiveUploader>,
    tick_count: u64,
}

impl std::fmt::Debug for LoggerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerSession")
            .field("tick_secs", &self.tick_secs)
            .field("tick_count", &self.tick_count)
            .field("day_file", &self.day_file.name())
            .field("month_file", &self.month_file.name())
            .finish_non_exhaustive()
    }
}

impl LoggerSession {
    /// Builds a session from configuration and collaborator handles.
    ///
    /// Both log files start with their period unbound (cold start):
    /// the first tick adopts the running day and month instead of
    /// treating the restart as a rollover, and existing files for the
    /// current period are appended to without re-emitting headers.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is inconsistent or the log
    /// directory cannot be prepared.
    pub fn new(
        config: &Config,
        source: Box<dyn CurrentSource>,
        sink: Arc<dyn TimeSeriesSink>,
        uploader: Arc<dyn ArchiveUploader>,
    ) -> Result<Self> {
        let tz = config.timezone()?;
        let now = Utc::now().with_timezone(&tz);

        let tariff = TariffCalculator::new(
            config.peak_start()?,
            config.peak_end()?,
            config.tariff.peak_rate,
            config.tariff.off_peak_rate,
        );

        let directory = Path::new(&config.storage.directory);
        let channels = config.channels.count;
        let day_file = RotatingLogFile::create(
            &config.identity.logger,
            directory,
            Granularity::Day,
            channels,
            now,
            None,
        )?;
        let month_file = RotatingLogFile::create(
            &config.identity.logger,
            directory,
            Granularity::Month,
            channels,
            now,
            None,
        )?;

        Ok(Self {
            tick_secs: config.sampling.interval_secs,
            capacity: config.channels.capacity,
            status_every_ticks: config.sampling.status_every_ticks,
            timeseries_enabled: config.timeseries.enabled,
            measurement: config.timeseries.measurement.clone(),
            remote_dir: archive::remote_dir(
                &config.archive.base_path,
                &config.identity.site,
                &config.identity.logger,
            ),
            tz,
            tariff,
            tracker: ContinuityTracker::new(config.sampling.interval_secs),
            reading: Reading::new(now, config.channels.voltages.clone()),
            day_file,
            month_file,
            source,
            sink,
            uploader,
            tick_count: 0,
        })
    }

    /// Runs one tick at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns error only for rotation failures; downstream collaborator
    /// failures are logged and the tick proceeds best-effort.
    pub async fn tick(&mut self) -> Result<()> {
        let now = Utc::now().with_timezone(&self.tz);
        self.tick_at(now).await
    }

    /// Runs one tick at an explicit timestamp.
    ///
    /// The sequence per tick: evaluate rotation for the month and day
    /// files independently (archiving any superseded file in the
    /// background), surface continuity gaps, append the current reading
    /// snapshot to both files and the time-series sink, then advance
    /// the reading with fresh samples.
    pub async fn tick_at(&mut self, now: DateTime<Tz>) -> Result<()> {
        self.rotate(Slot::Month, now)?;
        self.rotate(Slot::Day, now)?;

        self.tracker
            .check(self.day_file.path(), now.time(), self.day_file.name());

        let record = self.reading.csv_record();
        if let Err(e) = self.day_file.append(&record) {
            warn!("Failed to append to {}: {}", self.day_file.name(), e);
        }
        if let Err(e) = self.month_file.append(&record) {
            warn!("Failed to append to {}: {}", self.month_file.name(), e);
        }

        if self.timeseries_enabled {
            let point = SamplePoint::new(&self.measurement, now, self.reading.currents());
            sink::spawn_write(self.sink.clone(), point);
        }

        let samples = match self.source.sample() {
            Ok(samples) => samples,
            Err(e) => {
                warn!("Acquisition failed, keeping previous currents: {}", e);
                self.reading.currents().to_vec()
            }
        };
        self.reading
            .update(&samples, now, &self.tariff, self.tick_secs, self.capacity);

        self.tick_count += 1;
        if self.tick_count % self.status_every_ticks == 0 {
            info!("Tick {}: {}", self.tick_count, self.reading);
        }

        Ok(())
    }

    /// Evaluates rotation for one file slot, archiving any superseded
    /// file in the background.
    fn rotate(&mut self, slot: Slot, now: DateTime<Tz>) -> Result<()> {
        let file = match slot {
            Slot::Day => &mut self.day_file,
            Slot::Month => &mut self.month_file,
        };
        if let Rotation::Superseded(superseded) = file.check_rotation(now)? {
            archive::spawn_upload(
                self.uploader.clone(),
                superseded,
                self.remote_dir.clone(),
                now,
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    #[must_use]
    pub fn day_file(&self) -> &RotatingLogFile {
        &self.day_file
    }

    #[must_use]
    pub fn month_file(&self) -> &RotatingLogFile {
        &self.month_file
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Day,
    Month,
}

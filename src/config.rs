//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every value here is static for the lifetime of the process: the
//! sampling cadence, tariff window, channel layout, and file locations
//! are read once at startup and never mutated by the daemon.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub identity: IdentityConfig,
    pub sampling: SamplingConfig,
    pub channels: ChannelsConfig,
    pub tariff: TariffConfig,
    pub storage: StorageConfig,
    pub archive: ArchiveConfig,
    pub timeseries: TimeseriesConfig,
}

/// Site and logger identity
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    #[serde(default = "default_site")]
    pub site: String,

    #[serde(default = "default_logger")]
    pub logger: String,
}

/// Sampling cadence configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_status_every_ticks")]
    pub status_every_ticks: u64,
}

/// Monitored channel configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelsConfig {
    #[serde(default = "default_channel_count")]
    pub count: usize,

    /// Nominal supply voltage per channel, one entry per channel.
    #[serde(default = "default_voltages")]
    pub voltages: Vec<f64>,

    /// Maximum amperage on each channel before the overcurrent counter
    /// increments.
    #[serde(default = "default_capacity")]
    pub capacity: f64,
}

/// Peak/off-peak tariff configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TariffConfig {
    #[serde(default = "default_peak_start")]
    pub peak_start: String,

    #[serde(default = "default_peak_end")]
    pub peak_end: String,

    #[serde(default = "default_peak_rate")]
    pub peak_rate: f64,

    #[serde(default = "default_off_peak_rate")]
    pub off_peak_rate: f64,
}

/// Local log file storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_directory")]
    pub directory: String,
}

/// Offsite archive configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_enabled")]
    pub enabled: bool,

    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Local directory standing in for the remote store. The concrete
    /// remote protocol is a deployment concern behind `ArchiveUploader`.
    #[serde(default = "default_mirror_directory")]
    pub mirror_directory: String,
}

/// Time-series sink configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeseriesConfig {
    #[serde(default = "default_timeseries_enabled")]
    pub enabled: bool,

    #[serde(default = "default_measurement")]
    pub measurement: String,
}

// Default value functions
fn default_site() -> String { "site-0".to_string() }
fn default_logger() -> String { "logger-0".to_string() }

fn default_interval_secs() -> u64 { 5 }
fn default_timezone() -> String { "Europe/London".to_string() }
fn default_status_every_ticks() -> u64 { 120 }

fn default_channel_count() -> usize { 3 }
fn default_voltages() -> Vec<f64> { vec![230.0; 3] }
fn default_capacity() -> f64 { 400.0 }

fn default_peak_start() -> String { "08:00:00".to_string() }
fn default_peak_end() -> String { "23:00:00".to_string() }
fn default_peak_rate() -> f64 { 0.128636 }
fn default_off_peak_rate() -> f64 { 0.089862 }

fn default_directory() -> String { "./logs".to_string() }

fn default_archive_enabled() -> bool { true }
fn default_base_path() -> String { "/Power Logger Readings".to_string() }
fn default_mirror_directory() -> String { "./archive".to_string() }

fn default_timeseries_enabled() -> bool { true }
fn default_measurement() -> String { "sensorData".to_string() }

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed IANA time zone for all timestamping and rollover decisions
    pub fn timezone(&self) -> Result<Tz> {
        self.sampling.timezone.parse::<Tz>().map_err(|e| {
            crate::error::PowerlogError::Config(
                toml::de::Error::custom(format!("invalid timezone: {}", e))
            )
        })
    }

    /// Parsed peak window start time
    pub fn peak_start(&self) -> Result<NaiveTime> {
        parse_time("peak_start", &self.tariff.peak_start)
    }

    /// Parsed peak window end time
    pub fn peak_end(&self) -> Result<NaiveTime> {
        parse_time("peak_end", &self.tariff.peak_end)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.identity.site.is_empty() {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("site identifier cannot be empty")
            ));
        }

        if self.identity.logger.is_empty() {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("logger identifier cannot be empty")
            ));
        }

        // Ticks align to fixed second offsets within each minute, so the
        // interval must divide evenly into 60.
        if self.sampling.interval_secs == 0 || self.sampling.interval_secs > 30 {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("interval_secs must be between 1 and 30")
            ));
        }

        if 60 % self.sampling.interval_secs != 0 {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("interval_secs must divide evenly into 60")
            ));
        }

        if self.sampling.status_every_ticks == 0 {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("status_every_ticks must be greater than 0")
            ));
        }

        self.timezone()?;

        if self.channels.count == 0 {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("channel count must be greater than 0")
            ));
        }

        if self.channels.voltages.len() != self.channels.count {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom(format!(
                    "voltages must have exactly {} entries (one per channel)",
                    self.channels.count
                ))
            ));
        }

        for &v in &self.channels.voltages {
            if v < 0.0 {
                return Err(crate::error::PowerlogError::Config(
                    toml::de::Error::custom("channel voltages must be non-negative")
                ));
            }
        }

        if self.channels.capacity <= 0.0 {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("capacity must be greater than 0")
            ));
        }

        self.peak_start()?;
        self.peak_end()?;

        if self.tariff.peak_rate < 0.0 || self.tariff.off_peak_rate < 0.0 {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("tariff rates must be non-negative")
            ));
        }

        if self.storage.directory.is_empty() {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("storage directory cannot be empty")
            ));
        }

        if self.archive.enabled {
            if self.archive.base_path.is_empty() {
                return Err(crate::error::PowerlogError::Config(
                    toml::de::Error::custom("archive base_path cannot be empty when enabled")
                ));
            }
            if self.archive.mirror_directory.is_empty() {
                return Err(crate::error::PowerlogError::Config(
                    toml::de::Error::custom("archive mirror_directory cannot be empty when enabled")
                ));
            }
        }

        if self.timeseries.enabled && self.timeseries.measurement.is_empty() {
            return Err(crate::error::PowerlogError::Config(
                toml::de::Error::custom("timeseries measurement cannot be empty when enabled")
            ));
        }

        Ok(())
    }
}

fn parse_time(name: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|e| {
        crate::error::PowerlogError::Config(
            toml::de::Error::custom(format!("{} must be HH:MM:SS: {}", name, e))
        )
    })
}

//! # Time-Series Sink Module
//!
//! Per-tick structured points for a time-series database.
//!
//! The database client and wire format live behind [`TimeSeriesSink`];
//! the shipped implementation appends JSON Lines to a local file.
//! Writes are fire-and-forget: a failing sink is logged and never
//! stalls the sampling cadence.

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{PowerlogError, Result};

/// One structured point: the tick timestamp plus per-channel currents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplePoint {
    pub measurement: String,
    pub timestamp: String,
    pub currents: Vec<f64>,
}

impl SamplePoint {
    /// Builds a point for a tick.
    #[must_use]
    pub fn new(measurement: &str, at: DateTime<Tz>, currents: &[f64]) -> Self {
        Self {
            measurement: measurement.to_string(),
            timestamp: at.to_rfc3339(),
            currents: currents.to_vec(),
        }
    }
}

/// Accepts one structured point per tick.
#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    async fn write_point(&self, point: &SamplePoint) -> Result<()>;
}

/// Dispatches a point as a background task.
///
/// The handle is returned for tests; the sampling loop drops it.
pub fn spawn_write(sink: Arc<dyn TimeSeriesSink>, point: SamplePoint) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = sink.write_point(&point).await {
            warn!("Time-series write failed: {}", e);
        }
    })
}

/// Sink appending one JSON object per line to a local file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TimeSeriesSink for JsonlSink {
    async fn write_point(&self, point: &SamplePoint) -> Result<()> {
        let mut line = serde_json::to_string(point)
            .map_err(|e| PowerlogError::Sink(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Sink that discards every point, for deployments without a database.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

#[async_trait]
impl TimeSeriesSink for NullSink {
    async fn write_point(&self, _point: &SamplePoint) -> Result<()> {
        Ok(())
    }
}

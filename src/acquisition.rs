//! # Acquisition Module
//!
//! Per-channel current sampling.
//!
//! Real sensor hardware sits behind the [`CurrentSource`] trait; the
//! shipped implementation is a simulated wandering current for
//! deployments and tests without attached sensors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;

/// Supplies one current sample per configured channel per tick.
///
/// The core treats acquisition as synchronous and trusts the values; no
/// validation happens beyond the overcurrent check in the reading
/// update.
pub trait CurrentSource: Send {
    /// Returns one amperage value per channel.
    fn sample(&mut self) -> Result<Vec<f64>>;
}

/// Simulated fluctuating current.
///
/// Each channel performs a bounded random walk: near zero it only steps
/// upward, above 110% of capacity it only steps downward, otherwise it
/// wanders freely in steps of up to ±10 A.
#[derive(Debug)]
pub struct SimulatedCurrentSource {
    currents: Vec<f64>,
    capacity: f64,
    rng: StdRng,
}

impl SimulatedCurrentSource {
    /// Creates a simulator for `channels` channels, starting at 0 A.
    #[must_use]
    pub fn new(channels: usize, capacity: f64) -> Self {
        Self::with_rng(channels, capacity, StdRng::from_os_rng())
    }

    /// Creates a simulator with a caller-supplied RNG, for
    /// deterministic tests.
    #[must_use]
    pub fn with_rng(channels: usize, capacity: f64, rng: StdRng) -> Self {
        Self {
            currents: vec![0.0; channels],
            capacity,
            rng,
        }
    }
}

impl CurrentSource for SimulatedCurrentSource {
    fn sample(&mut self) -> Result<Vec<f64>> {
        for current in &mut self.currents {
            let step = if *current < 10.0 {
                self.rng.random_range(0.0..=10.0)
            } else if *current > 1.1 * self.capacity {
                self.rng.random_range(-10.0..=0.0)
            } else {
                self.rng.random_range(-10.0..=10.0)
            };
            *current += step;
        }
        Ok(self.currents.clone())
    }
}

//! # Reading Module
//!
//! The in-memory value object holding the latest per-channel samples
//! and the running tariff cost, advanced once per sampling tick.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::tariff::TariffCalculator;

/// Latest per-channel current/voltage/power samples plus accumulated
/// cost, one instance per logger session.
///
/// Invariants held after every [`Reading::update`]:
/// - `powers[i] == currents[i] * voltages[i]` for every channel
/// - `cumulative_cost` never decreases
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    timestamp: DateTime<Tz>,
    currents: Vec<f64>,
    voltages: Vec<f64>,
    powers: Vec<f64>,
    cumulative_cost: f64,
    overcurrent_counts: Vec<u32>,
}

impl Reading {
    /// Creates a zeroed reading for `voltages.len()` channels.
    #[must_use]
    pub fn new(now: DateTime<Tz>, voltages: Vec<f64>) -> Self {
        let n = voltages.len();
        Self {
            timestamp: now,
            currents: vec![0.0; n],
            voltages,
            powers: vec![0.0; n],
            cumulative_cost: 0.0,
            overcurrent_counts: vec![0; n],
        }
    }

    /// Number of monitored channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.voltages.len()
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Tz> {
        self.timestamp
    }

    #[must_use]
    pub fn currents(&self) -> &[f64] {
        &self.currents
    }

    #[must_use]
    pub fn cumulative_cost(&self) -> f64 {
        self.cumulative_cost
    }

    #[must_use]
    pub fn overcurrent_counts(&self) -> &[u32] {
        &self.overcurrent_counts
    }

    /// Advances the reading by one sampling tick.
    ///
    /// For each channel the sampled current is checked against
    /// `capacity` (breaches increment that channel's overcurrent
    /// counter), power is recomputed as `I * V`, and the tariff cost for
    /// the tick is accrued at the rate applicable at `now`.
    ///
    /// The energy integral assumes exactly `tick_secs` elapsed since the
    /// previous tick. A delayed scheduler therefore accrues cost as if
    /// the cadence had been kept; this is a documented limitation, not
    /// corrected here.
    ///
    /// # Arguments
    ///
    /// * `samples` - One current sample per channel; extra entries are
    ///   ignored, missing entries leave the channel at its last value
    /// * `now` - Wall-clock timestamp of this tick
    /// * `tariff` - Rate schedule applied at `now`'s time of day
    /// * `tick_secs` - Configured sampling interval
    /// * `capacity` - Overcurrent threshold in amps
    pub fn update(
        &mut self,
        samples: &[f64],
        now: DateTime<Tz>,
        tariff: &TariffCalculator,
        tick_secs: u64,
        capacity: f64,
    ) {
        for (i, &sample) in samples.iter().take(self.currents.len()).enumerate() {
            if sample > capacity {
                self.overcurrent_counts[i] += 1;
            }
            self.currents[i] = sample;
        }

        for i in 0..self.powers.len() {
            self.powers[i] = self.currents[i] * self.voltages[i];
        }

        let kwh: f64 = self.powers.iter().sum::<f64>() * (tick_secs as f64 / 3600.0);
        let rate = tariff.rate_at(now.time());
        self.cumulative_cost += rate * kwh;

        self.timestamp = now;
    }

    /// Clears the overcurrent counter for a single channel.
    ///
    /// Counters are monotone between resets; resetting one channel
    /// leaves the others untouched. Out-of-range indices are ignored.
    pub fn reset_overcurrent(&mut self, channel: usize) {
        if let Some(count) = self.overcurrent_counts.get_mut(channel) {
            *count = 0;
        }
    }

    /// Builds the CSV row for the current state:
    /// `Time, Date, I1..IN, V1..VN, P1..PN, Cumulative Cost`.
    #[must_use]
    pub fn csv_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(2 + 3 * self.channel_count() + 1);
        record.push(self.timestamp.format("%H:%M:%S").to_string());
        record.push(self.timestamp.format("%a %d %b %Y").to_string());
        for i in &self.currents {
            record.push(format!("{:.2}", i));
        }
        for v in &self.voltages {
            record.push(format!("{:.2}", v));
        }
        for p in &self.powers {
            record.push(format!("{:.2}", p));
        }
        record.push(format!("{:.6}", self.cumulative_cost));
        record
    }

    /// Column-name header row matching [`Reading::csv_record`].
    #[must_use]
    pub fn csv_header(channels: usize) -> Vec<String> {
        let mut header = Vec::with_capacity(2 + 3 * channels + 1);
        header.push("Time".to_string());
        header.push("Date".to_string());
        for i in 1..=channels {
            header.push(format!("I{}", i));
        }
        for i in 1..=channels {
            header.push(format!("V{}", i));
        }
        for i in 1..=channels {
            header.push(format!("P{}", i));
        }
        header.push("Cumulative Cost".to_string());
        header
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} I=[{}] cost={:.4}",
            self.timestamp.format("%H:%M:%S"),
            self.currents
                .iter()
                .map(|i| format!("{:.1}", i))
                .collect::<Vec<_>>()
                .join(", "),
            self.cumulative_cost
        )
    }
}

//! # Tariff Module
//!
//! Time-of-day peak/off-peak electricity pricing.
//!
//! The peak window is a circular interval over the 24-hour clock: a
//! window of 22:00-06:00 wraps past midnight and covers both late
//! evening and early morning. Boundaries are inclusive at both ends.

use chrono::NaiveTime;

/// Peak/off-peak rate schedule.
///
/// Pure and total: `rate_at` always returns exactly one of the two
/// configured rates and has no failure modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TariffCalculator {
    peak_start: NaiveTime,
    peak_end: NaiveTime,
    peak_rate: f64,
    off_peak_rate: f64,
}

impl TariffCalculator {
    /// Creates a tariff calculator for the given peak window and rates.
    #[must_use]
    pub fn new(
        peak_start: NaiveTime,
        peak_end: NaiveTime,
        peak_rate: f64,
        off_peak_rate: f64,
    ) -> Self {
        Self {
            peak_start,
            peak_end,
            peak_rate,
            off_peak_rate,
        }
    }

    /// Returns the applicable rate for a time of day.
    #[must_use]
    pub fn rate_at(&self, at: NaiveTime) -> f64 {
        if time_in_range(self.peak_start, self.peak_end, at) {
            self.peak_rate
        } else {
            self.off_peak_rate
        }
    }
}

/// Checks whether `x` falls within the circular interval `[start, end]`.
///
/// When `start <= end` the interval is the ordinary inclusive range.
/// When `start > end` the interval wraps past midnight, so membership
/// means `x >= start || x <= end`.
#[must_use]
pub fn time_in_range(start: NaiveTime, end: NaiveTime, x: NaiveTime) -> bool {
    if start <= end {
        start <= x && x <= end
    } else {
        x >= start || x <= end
    }
}

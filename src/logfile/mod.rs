//! # Log File Module
//!
//! Rolling CSV log files bound to calendar periods.
//!
//! One [`RotatingLogFile`] exists per granularity (day-scoped and
//! month-scoped). Each file knows the calendar unit it is bound to and
//! rotates exactly once when a tick's timestamp falls outside that
//! unit. Rotation decisions compare calendar units, never elapsed
//! durations, so a backward clock jump can never trigger a spurious
//! rotation.

pub mod continuity;

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;
use crate::reading::Reading;

/// Calendar granularity of a rotating log file.
///
/// Replaces day/month subclassing with a single parametrized
/// abstraction: the granularity supplies the period-key extraction and
/// the file naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One file per calendar day, keyed by day-of-month.
    Day,
    /// One file per calendar month, keyed by month-of-year.
    Month,
}

impl Granularity {
    /// Extracts the calendar unit a timestamp belongs to.
    #[must_use]
    pub fn period_key(&self, at: DateTime<Tz>) -> u32 {
        match self {
            Granularity::Day => at.day(),
            Granularity::Month => at.month(),
        }
    }

    /// Derives the file name for a file created at `at`.
    ///
    /// The formats are bit-exact for compatibility with existing
    /// archives:
    /// - day: `"<logger> Daily Powerlog <dd-mm-yy; Dow dd Mon>.csv"`
    /// - month: `"<logger> Monthly Powerlog <mm-yy Mon>.csv"`
    #[must_use]
    pub fn file_name(&self, logger_id: &str, at: DateTime<Tz>) -> String {
        match self {
            Granularity::Day => format!(
                "{} Daily Powerlog {}.csv",
                logger_id,
                at.format("%d-%m-%y; %a %d %b")
            ),
            Granularity::Month => format!(
                "{} Monthly Powerlog {}.csv",
                logger_id,
                at.format("%m-%y %b")
            ),
        }
    }
}

/// Outcome of one rotation check.
#[derive(Debug)]
pub enum Rotation {
    /// The file is still bound to the current period; no transition.
    Current,
    /// Cold start: the file adopted the current period without
    /// archiving.
    Adopted(u32),
    /// The previous period ended; the superseded file is handed back
    /// for archival and a fresh file is already in place.
    Superseded(SupersededFile),
}

/// An immutable, finished log file queued for archival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupersededFile {
    pub path: PathBuf,
    pub name: String,
}

/// One physical rolling log file.
///
/// Lifecycle: created with `period_key = None` at process start (cold
/// start) or bound to a period at rotation time; appended to while
/// active; superseded exactly once when a tick falls in a different
/// calendar unit, after which its content is immutable.
#[derive(Debug)]
pub struct RotatingLogFile {
    granularity: Granularity,
    logger_id: String,
    directory: PathBuf,
    channels: usize,
    period_key: Option<u32>,
    name: String,
    path: PathBuf,
    header_written: bool,
}

impl RotatingLogFile {
    /// Creates a log file for the period containing `now`.
    ///
    /// `period_key` is `None` at process start: the file adopts the
    /// running period on the first rotation check instead of treating
    /// the restart as a rollover. The two-line header block (logger
    /// identity, then column names) is written only if no file with the
    /// derived name exists yet, so a restart within the same period
    /// never duplicates headers.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the header
    /// cannot be written.
    pub fn create(
        logger_id: &str,
        directory: &Path,
        granularity: Granularity,
        channels: usize,
        now: DateTime<Tz>,
        period_key: Option<u32>,
    ) -> Result<Self> {
        fs::create_dir_all(directory)?;

        let name = granularity.file_name(logger_id, now);
        let path = directory.join(&name);

        let mut file = Self {
            granularity,
            logger_id: logger_id.to_string(),
            directory: directory.to_path_buf(),
            channels,
            period_key,
            name,
            path,
            header_written: false,
        };
        file.ensure_header()?;
        Ok(file)
    }

    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    #[must_use]
    pub fn period_key(&self) -> Option<u32> {
        self.period_key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Whether this file is still the correct target for a timestamp.
    #[must_use]
    pub fn is_current_for(&self, now: DateTime<Tz>) -> bool {
        self.period_key == Some(self.granularity.period_key(now))
    }

    /// Evaluates the rotation state machine for one tick.
    ///
    /// - Unbound (`period_key = None`): adopt `now`'s calendar unit
    ///   without archiving.
    /// - Bound to a different unit: replace self with a fresh file for
    ///   `now`'s period and hand the superseded file back to the caller
    ///   for archival.
    /// - Bound to the same unit: no transition.
    ///
    /// Calling this twice within the same period is idempotent: the
    /// second call creates no file and supersedes nothing.
    ///
    /// # Errors
    ///
    /// Returns error only if the replacement file cannot be created; the
    /// old file is left in place in that case.
    pub fn check_rotation(&mut self, now: DateTime<Tz>) -> Result<Rotation> {
        let key = self.granularity.period_key(now);

        match self.period_key {
            None => {
                self.period_key = Some(key);
                info!(
                    "Adopted current period {} for {}",
                    key,
                    self.name
                );
                Ok(Rotation::Adopted(key))
            }
            Some(bound) if bound == key => Ok(Rotation::Current),
            Some(bound) => {
                let fresh = Self::create(
                    &self.logger_id,
                    &self.directory,
                    self.granularity,
                    self.channels,
                    now,
                    Some(key),
                )?;
                let old = std::mem::replace(self, fresh);
                info!(
                    "Rolled over {:?} file: period {} -> {}, superseded {}",
                    old.granularity, bound, key, old.name
                );
                Ok(Rotation::Superseded(SupersededFile {
                    path: old.path,
                    name: old.name,
                }))
            }
        }
    }

    /// Appends one reading row to the physical file.
    ///
    /// The full row is written and flushed before returning, so a crash
    /// between ticks never leaves a partially buffered row behind.
    /// Prior rows are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or written.
    pub fn append(&mut self, record: &[String]) -> Result<()> {
        let file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);
        writer.write_record(record)?;
        writer.flush()?;
        debug!("Appended row to {}", self.name);
        Ok(())
    }

    /// Writes the two-line header block if the file does not exist yet.
    fn ensure_header(&mut self) -> Result<()> {
        if self.path.exists() {
            debug!("{} already exists, keeping its header", self.name);
            return Ok(());
        }

        let file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);
        writer.write_record([self.logger_id.as_str()])?;
        writer.write_record(Reading::csv_header(self.channels))?;
        writer.flush()?;
        self.header_written = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::London;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> DateTime<Tz> {
        London.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn sample_record() -> Vec<String> {
        vec![
            "09:00:00".into(),
            "Sat 14 Mar 2026".into(),
            "1.00".into(),
            "2.00".into(),
            "3.00".into(),
            "230.00".into(),
            "230.00".into(),
            "230.00".into(),
            "230.00".into(),
            "460.00".into(),
            "690.00".into(),
            "0.000120".into(),
        ]
    }

    #[test]
    fn test_day_file_name_is_bit_exact() {
        let name = Granularity::Day.file_name("DL-041", at(14, 9));
        assert_eq!(name, "DL-041 Daily Powerlog 14-03-26; Sat 14 Mar.csv");
    }

    #[test]
    fn test_month_file_name_is_bit_exact() {
        let name = Granularity::Month.file_name("DL-041", at(14, 9));
        assert_eq!(name, "DL-041 Monthly Powerlog 03-26 Mar.csv");
    }

    #[test]
    fn test_period_key_extraction() {
        assert_eq!(Granularity::Day.period_key(at(14, 9)), 14);
        assert_eq!(Granularity::Month.period_key(at(14, 9)), 3);
    }

    #[test]
    fn test_header_block_written_once() {
        let dir = TempDir::new().unwrap();
        let file = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 9), None,
        )
        .unwrap();
        assert!(file.header_written());

        let contents = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "DL-041");
        assert!(lines[1].starts_with("Time,Date,I1,I2,I3,"));
        assert!(lines[1].ends_with("Cumulative Cost"));
    }

    #[test]
    fn test_header_not_rewritten_for_existing_file() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 9), None,
        )
        .unwrap();
        file.append(&sample_record()).unwrap();

        // Restart within the same day: same derived name, no new header
        let file2 = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 10), None,
        )
        .unwrap();
        assert!(!file2.header_written());

        let contents = fs::read_to_string(file2.path()).unwrap();
        assert_eq!(contents.matches("Time,Date").count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_cold_start_adopts_without_superseding() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 9), None,
        )
        .unwrap();

        match file.check_rotation(at(14, 9)).unwrap() {
            Rotation::Adopted(key) => assert_eq!(key, 14),
            other => panic!("expected Adopted, got {:?}", other),
        }
        assert_eq!(file.period_key(), Some(14));
    }

    #[test]
    fn test_rotation_is_idempotent_within_period() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 9), None,
        )
        .unwrap();
        file.check_rotation(at(14, 9)).unwrap();

        for _ in 0..2 {
            match file.check_rotation(at(14, 10)).unwrap() {
                Rotation::Current => {}
                other => panic!("expected Current, got {:?}", other),
            }
        }

        // Only the one file exists
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_day_rollover_supersedes_and_replaces() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 9), Some(14),
        )
        .unwrap();
        let old_name = file.name().to_string();

        match file.check_rotation(at(15, 0)).unwrap() {
            Rotation::Superseded(superseded) => {
                assert_eq!(superseded.name, old_name);
                assert!(superseded.path.exists());
            }
            other => panic!("expected Superseded, got {:?}", other),
        }

        assert_eq!(file.period_key(), Some(15));
        assert_eq!(
            file.name(),
            "DL-041 Daily Powerlog 15-03-26; Sun 15 Mar.csv"
        );
        assert!(file.header_written());
        assert!(file.path().exists());
    }

    #[test]
    fn test_month_rollover_independent_of_day() {
        let dir = TempDir::new().unwrap();
        let mut month = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Month, 3, at(31, 23), Some(3),
        )
        .unwrap();
        let april = London.with_ymd_and_hms(2026, 4, 1, 0, 0, 5).unwrap();

        match month.check_rotation(april).unwrap() {
            Rotation::Superseded(superseded) => {
                assert_eq!(superseded.name, "DL-041 Monthly Powerlog 03-26 Mar.csv");
            }
            other => panic!("expected Superseded, got {:?}", other),
        }
        assert_eq!(month.name(), "DL-041 Monthly Powerlog 04-26 Apr.csv");
    }

    #[test]
    fn test_backward_clock_jump_within_period_does_not_rotate() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 9), Some(14),
        )
        .unwrap();

        match file.check_rotation(at(14, 2)).unwrap() {
            Rotation::Current => {}
            other => panic!("expected Current, got {:?}", other),
        }
    }

    #[test]
    fn test_append_rows_accumulate() {
        let dir = TempDir::new().unwrap();
        let mut file = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 9), Some(14),
        )
        .unwrap();

        file.append(&sample_record()).unwrap();
        file.append(&sample_record()).unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        // 2 header lines + 2 data rows
        assert_eq!(contents.lines().count(), 4);
    }

    #[test]
    fn test_is_current_for() {
        let dir = TempDir::new().unwrap();
        let file = RotatingLogFile::create(
            "DL-041", dir.path(), Granularity::Day, 3, at(14, 9), Some(14),
        )
        .unwrap();

        assert!(file.is_current_for(at(14, 23)));
        assert!(!file.is_current_for(at(15, 0)));
    }
}

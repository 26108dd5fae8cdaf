//! Time-rotating file sink
//!
//! Closes the active log file when its interval ends, renames the finished
//! segment after the *start* of that interval rather than the rollover moment,
//! prunes old segments beyond the retention count, and reopens a fresh file.
//! Interval starts that sit on the far side of a DST transition are shifted by
//! an hour so the rendered name matches the true wall clock.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

use crate::config::Granularity;
use crate::record::LogRecord;
use crate::retention::prune_rotated_segments;
use crate::sink::RecordSink;

/// File sink that rotates on a time interval
///
/// The active file lives at the base path and is opened in append mode. The
/// rollover check runs synchronously inside `write`, so the caller's lock
/// around the sink covers the whole close/rename/reopen sequence.
pub struct RotatingSink {
    base_path: PathBuf,
    file: Option<File>,
    granularity: Granularity,
    interval_secs: i64,
    next_rollover_at: i64,
    retention: usize,
    utc: bool,
}

impl RotatingSink {
    /// Open a rotating sink at `base_path`
    ///
    /// The file is created if absent and opened in append mode. Construction
    /// failures (missing directory, bad permissions) are fatal.
    pub fn new(
        base_path: impl Into<PathBuf>,
        granularity: Granularity,
        retention: usize,
        utc: bool,
    ) -> Result<Self> {
        let base_path = base_path.into();
        let file = open_append(&base_path)?;
        let now = Utc::now().timestamp();
        Ok(Self {
            base_path,
            file: Some(file),
            granularity,
            interval_secs: granularity.interval_secs(),
            next_rollover_at: next_rollover(now, granularity, utc),
            retention,
            utc,
        })
    }

    /// Path of the active log file
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn rollover_due(&self, now: i64) -> bool {
        now >= self.next_rollover_at
    }

    /// Rotate the active file and schedule the next rollover
    ///
    /// The finished segment is named for the start of the interval that just
    /// ended. In local-time mode the rendered start is shifted by an hour when
    /// the interval crossed a DST transition; in UTC mode no correction
    /// applies. Any I/O failure here is fatal to the sink.
    fn do_rollover(&mut self, now: i64) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().context("Failed to flush log file before rotation")?;
        }

        // The interval that is ending began one interval before its deadline.
        let interval_start = self.next_rollover_at - self.interval_secs;
        let dst_now = !self.utc && is_dst_local(now);
        let suffix = if self.utc {
            segment_timestamp(interval_start, true)
        } else {
            let dst_then = is_dst_local(interval_start);
            segment_timestamp(dst_adjusted_start(interval_start, dst_now, dst_then), false)
        };

        let dest = segment_path(&self.base_path, &suffix);
        if dest.exists() {
            // Last writer wins on duplicate-second collisions.
            fs::remove_file(&dest)
                .with_context(|| format!("Failed to remove stale segment {}", dest.display()))?;
        }
        fs::rename(&self.base_path, &dest).with_context(|| {
            format!(
                "Failed to archive {} as {}",
                self.base_path.display(),
                dest.display()
            )
        })?;

        if self.retention > 0 {
            prune_rotated_segments(&self.base_path, self.retention)?;
        }

        self.file = Some(open_append(&self.base_path)?);

        // Guard against clock skew or a late check scheduling a rollover that
        // is already due.
        let mut next = next_rollover(now, self.granularity, self.utc);
        while next <= now {
            next += self.interval_secs;
        }
        if self.granularity.is_clock_anchored() && !self.utc {
            let dst_at_rollover = is_dst_local(next);
            if dst_now != dst_at_rollover {
                // Keep the next rollover on the intended wall-clock boundary:
                // DST begins before it fires -> an hour less, ends -> an hour more.
                next += if dst_now { 3600 } else { -3600 };
            }
        }
        self.next_rollover_at = next;
        Ok(())
    }
}

impl RecordSink for RotatingSink {
    fn write(&mut self, record: &LogRecord) -> Result<()> {
        let now = Utc::now().timestamp();
        if self.rollover_due(now) {
            self.do_rollover(now)?;
        }
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => {
                self.file = Some(open_append(&self.base_path)?);
                self.file.as_mut().context("Log file handle missing")?
            }
        };
        writeln!(file, "{}", record.format_line()).with_context(|| {
            format!("Failed to write to log file {}", self.base_path.display())
        })?;
        file.flush()
            .with_context(|| format!("Failed to flush log file {}", self.base_path.display()))?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().context("Failed to flush log file on close")?;
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Build `<base>.<suffix>` alongside the base file
fn segment_path(base_path: &Path, suffix: &str) -> PathBuf {
    let mut name = base_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('.');
    name.push_str(suffix);
    base_path.with_file_name(name)
}

fn utc_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}

fn local_datetime(ts: i64) -> DateTime<Local> {
    utc_datetime(ts).with_timezone(&Local)
}

/// Whether DST is in effect at `ts` in the local time zone
///
/// The local offset exceeds the zone's standard offset exactly when DST is
/// active; the standard offset is the smaller of the January and July offsets,
/// which holds in both hemispheres.
pub(crate) fn is_dst_local(ts: i64) -> bool {
    let dt = local_datetime(ts);
    dt.offset().local_minus_utc() > standard_offset(dt.year())
}

fn standard_offset(year: i32) -> i32 {
    let offset_at = |dt: DateTime<Utc>| local_datetime(dt.timestamp()).offset().local_minus_utc();
    let jan = Utc.with_ymd_and_hms(year, 1, 1, 12, 0, 0).single();
    let jul = Utc.with_ymd_and_hms(year, 7, 1, 12, 0, 0).single();
    match (jan, jul) {
        (Some(jan), Some(jul)) => offset_at(jan).min(offset_at(jul)),
        (Some(dt), None) | (None, Some(dt)) => offset_at(dt),
        (None, None) => 0,
    }
}

/// Shift a rendered interval start across a DST discontinuity
///
/// When the DST flag differs between "now" and the interval start, the wall
/// clock jumped by an hour in between; compensate so the rendered start names
/// the true wall-clock moment.
pub(crate) fn dst_adjusted_start(interval_start: i64, dst_now: bool, dst_then: bool) -> i64 {
    if dst_now == dst_then {
        interval_start
    } else if dst_now {
        interval_start + 3600
    } else {
        interval_start - 3600
    }
}

/// Render the timestamp suffix used in segment file names
fn segment_timestamp(ts: i64, utc: bool) -> String {
    if utc {
        utc_datetime(ts).format("%Y-%m-%d_%H-%M-%S").to_string()
    } else {
        local_datetime(ts).format("%Y-%m-%d_%H-%M-%S").to_string()
    }
}

/// Seconds since midnight and weekday (0 = Monday) at `ts`
fn clock_parts(ts: i64, utc: bool) -> (i64, u8) {
    if utc {
        let dt = utc_datetime(ts);
        (
            i64::from(dt.num_seconds_from_midnight()),
            dt.weekday().num_days_from_monday() as u8,
        )
    } else {
        let dt = local_datetime(ts);
        (
            i64::from(dt.num_seconds_from_midnight()),
            dt.weekday().num_days_from_monday() as u8,
        )
    }
}

fn seconds_until_midnight(now: i64, utc: bool) -> i64 {
    let (time_of_day, _) = clock_parts(now, utc);
    24 * 60 * 60 - time_of_day
}

/// First rollover instant after `now` for the given granularity
pub(crate) fn next_rollover(now: i64, granularity: Granularity, utc: bool) -> i64 {
    match granularity {
        Granularity::Second | Granularity::Minute | Granularity::Hour | Granularity::Day => {
            now + granularity.interval_secs()
        }
        Granularity::Midnight => now + seconds_until_midnight(now, utc),
        Granularity::Week(target) => {
            // The weekly boundary is the midnight ending the target weekday.
            let mut at = now + seconds_until_midnight(now, utc);
            let (_, day) = clock_parts(now, utc);
            if day != target {
                let days_to_wait = if day < target {
                    i64::from(target - day)
                } else {
                    i64::from(6 - day + target + 1)
                };
                at += days_to_wait * 24 * 60 * 60;
            }
            at
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogLevel;
    use chrono::Weekday;
    use tempfile::TempDir;

    // 2023-11-14 22:13:20 UTC, a Tuesday
    const TS: i64 = 1_700_000_000;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(LogLevel::Info, "job", "src/train.rs", 1, message)
    }

    fn segments(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("job.log."))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_dst_adjusted_start_no_transition() {
        assert_eq!(dst_adjusted_start(TS, false, false), TS);
        assert_eq!(dst_adjusted_start(TS, true, true), TS);
    }

    #[test]
    fn test_dst_adjusted_start_spring_forward() {
        // DST active now, was not at the interval start: render an hour later.
        assert_eq!(dst_adjusted_start(TS, true, false), TS + 3600);
    }

    #[test]
    fn test_dst_adjusted_start_fall_back() {
        // DST ended since the interval start: render an hour earlier.
        assert_eq!(dst_adjusted_start(TS, false, true), TS - 3600);
    }

    #[test]
    fn test_next_rollover_fixed_intervals() {
        assert_eq!(next_rollover(TS, Granularity::Second, true), TS + 1);
        assert_eq!(next_rollover(TS, Granularity::Minute, true), TS + 60);
        assert_eq!(next_rollover(TS, Granularity::Hour, true), TS + 3600);
        assert_eq!(next_rollover(TS, Granularity::Day, true), TS + 86400);
    }

    #[test]
    fn test_next_rollover_midnight_utc() {
        let at = next_rollover(TS, Granularity::Midnight, true);
        assert_eq!(at % 86400, 0);
        assert!(at > TS);
        assert!(at - TS <= 86400);
        // 22:13:20 -> 6400 seconds left in the day
        assert_eq!(at, TS + 6400);
    }

    #[test]
    fn test_next_rollover_week_utc() {
        // Rollover lands on the midnight that ends the target weekday.
        let at = next_rollover(TS, Granularity::Week(0), true);
        assert_eq!(at % 86400, 0);
        assert_eq!(utc_datetime(at).weekday(), Weekday::Tue);
        assert_eq!(at, TS + 6400 + 6 * 86400);
    }

    #[test]
    fn test_next_rollover_week_same_day() {
        // TS is a Tuesday; a w1 schedule rolls over at the coming midnight.
        let at = next_rollover(TS, Granularity::Week(1), true);
        assert_eq!(at, TS + 6400);
    }

    #[test]
    fn test_write_without_due_rollover_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut sink =
            RotatingSink::new(dir.path().join("job.log"), Granularity::Hour, 0, true).unwrap();
        let scheduled = sink.next_rollover_at;

        sink.write(&record("first")).unwrap();
        sink.write(&record("second")).unwrap();

        assert!(segments(&dir).is_empty());
        assert_eq!(sink.next_rollover_at, scheduled);
        let content = std::fs::read_to_string(dir.path().join("job.log")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_due_rollover_archives_by_interval_start() {
        let dir = TempDir::new().unwrap();
        let mut sink =
            RotatingSink::new(dir.path().join("job.log"), Granularity::Hour, 0, true).unwrap();

        sink.write(&record("before rollover")).unwrap();
        // Pretend the interval ending at TS has just elapsed.
        sink.next_rollover_at = TS;
        sink.write(&record("after rollover")).unwrap();

        let expected = format!("job.log.{}", segment_timestamp(TS - 3600, true));
        assert_eq!(segments(&dir), vec![expected.clone()]);

        let archived = std::fs::read_to_string(dir.path().join(&expected)).unwrap();
        assert!(archived.contains("before rollover"));
        let active = std::fs::read_to_string(dir.path().join("job.log")).unwrap();
        assert!(active.contains("after rollover"));
        assert!(!active.contains("before rollover"));
    }

    #[test]
    fn test_rollover_schedules_strictly_after_now() {
        let dir = TempDir::new().unwrap();
        let mut sink =
            RotatingSink::new(dir.path().join("job.log"), Granularity::Second, 0, true).unwrap();

        // A check running very late must still land in the future.
        sink.next_rollover_at = TS;
        let now = Utc::now().timestamp();
        sink.do_rollover(now).unwrap();
        assert!(sink.next_rollover_at > now);
    }

    #[test]
    fn test_duplicate_segment_name_overwritten() {
        let dir = TempDir::new().unwrap();
        let mut sink =
            RotatingSink::new(dir.path().join("job.log"), Granularity::Hour, 0, true).unwrap();

        sink.write(&record("first interval")).unwrap();
        sink.next_rollover_at = TS;
        sink.write(&record("second interval")).unwrap();

        // Same deadline again: the segment name collides and is replaced.
        sink.next_rollover_at = TS;
        sink.write(&record("third interval")).unwrap();

        let names = segments(&dir);
        assert_eq!(names.len(), 1);
        let archived = std::fs::read_to_string(dir.path().join(&names[0])).unwrap();
        assert!(archived.contains("second interval"));
        assert!(!archived.contains("first interval"));
    }

    #[test]
    fn test_retention_keeps_newest_segments() {
        let dir = TempDir::new().unwrap();
        let mut sink =
            RotatingSink::new(dir.path().join("job.log"), Granularity::Hour, 2, true).unwrap();

        for k in 0..4 {
            sink.write(&record(&format!("interval {}", k))).unwrap();
            sink.next_rollover_at = TS + k * 3600;
            sink.write(&record("tick")).unwrap();
        }

        let names = segments(&dir);
        assert_eq!(names.len(), 2);
        // The survivors are the two most recent interval starts.
        assert_eq!(
            names,
            vec![
                format!("job.log.{}", segment_timestamp(TS + 3600, true)),
                format!("job.log.{}", segment_timestamp(TS + 2 * 3600, true)),
            ]
        );
    }

    #[test]
    fn test_close_releases_handle() {
        let dir = TempDir::new().unwrap();
        let mut sink =
            RotatingSink::new(dir.path().join("job.log"), Granularity::Hour, 0, true).unwrap();
        sink.write(&record("line")).unwrap();
        sink.close().unwrap();
        assert!(sink.file.is_none());
    }
}

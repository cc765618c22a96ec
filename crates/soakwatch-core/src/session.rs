//! Durable run output: the CSV tick log and JSON documents.
//!
//! The CSV log is opened lazily on the first snapshot. That first open
//! creates the file or truncates whatever a previous run left there, and
//! writes the header row. Later rows of the same run are appended, each one
//! flushed as soon as it is written.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::sink::{Sink, SinkError};
use crate::snapshot::Snapshot;

pub const CSV_HEADER: &str = "timestamp,datetime,cpu_temp,sensor1_temp,sensor2_temp,cpu_pct,mem_pct,disk_pct,endpoints_up,endpoints_total";

// ---------------------------------------------------------------------------
// CSV tick log
// ---------------------------------------------------------------------------

/// One CSV row per snapshot, under a single header.
pub struct TickLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    rows: u64,
}

impl TickLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            rows: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written by this instance.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    fn open(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            let mut w = BufWriter::new(file);
            writeln!(w, "{CSV_HEADER}")?;
            self.writer = Some(w);
        }
        match self.writer.as_mut() {
            Some(w) => Ok(w),
            None => Err(std::io::Error::other("tick log writer missing")),
        }
    }
}

/// Render one snapshot as a CSV row (no trailing newline).
pub fn csv_row(s: &Snapshot) -> String {
    format!(
        "{:.3},{},{:.1},{:.1},{:.1},{:.1},{:.1},{:.1},{},{}",
        s.unix_secs(),
        format_utc(s.tick_time),
        s.resources.cpu_temp_c,
        s.bus.sensor1_c,
        s.bus.sensor2_c,
        s.resources.cpu_pct,
        s.resources.mem_pct,
        s.resources.disk_pct,
        s.up_count(),
        s.endpoint_count(),
    )
}

impl Sink for TickLog {
    fn name(&self) -> &str {
        "csv"
    }

    fn consume(&mut self, snapshot: &Arc<Snapshot>) -> Result<(), SinkError> {
        let row = csv_row(snapshot);
        let w = self.open()?;
        writeln!(w, "{row}")?;
        w.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(w) = self.writer.as_mut() {
            w.flush()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON documents
// ---------------------------------------------------------------------------

/// Write `value` as pretty-printed JSON, creating parent directories.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Time formatting (UTC, no leap seconds)
// ---------------------------------------------------------------------------

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_utc(t: SystemTime) -> String {
    let (y, mo, d, h, mi, s) = utc_fields(unix_secs(t));
    format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}")
}

/// `YYYYMMDD_HHMMSS` in UTC, for file names.
pub fn file_stamp(t: SystemTime) -> String {
    let (y, mo, d, h, mi, s) = utc_fields(unix_secs(t));
    format!("{y:04}{mo:02}{d:02}_{h:02}{mi:02}{s:02}")
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Split seconds since the epoch into calendar fields.
fn utc_fields(secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (y, mo, d) = civil_from_days(days);
    (y, mo, d, rem / 3600, (rem / 60) % 60, rem % 60)
}

/// Days since 1970-01-01 to (year, month, day), proleptic Gregorian.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    // Shift the epoch to 0000-03-01 so leap days fall at the end of a year.
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

//! Post-run statistics over a CSV tick log.
//!
//! Reads the log written by [`TickLog`](crate::session::TickLog) and
//! summarizes each temperature series: extremes with the time they were
//! seen, mean, peak-to-peak, sample variance and standard deviation.
//! Sentinel readings are left out of every statistic. Rows that cannot be
//! parsed (a run killed mid-write leaves a torn last line) are counted and
//! skipped.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::snapshot::is_valid_temp;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tick log is empty")]
    Empty,
    #[error("tick log header has no '{0}' column")]
    MissingColumn(&'static str),
}

/// Temperature columns of the tick log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    Cpu,
    Sensor1,
    Sensor2,
}

impl Series {
    pub const ALL: [Series; 3] = [Series::Cpu, Series::Sensor1, Series::Sensor2];

    pub fn column(self) -> &'static str {
        match self {
            Self::Cpu => "cpu_temp",
            Self::Sensor1 => "sensor1_temp",
            Self::Sensor2 => "sensor2_temp",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Sensor1 => "Sensor 1",
            Self::Sensor2 => "Sensor 2",
        }
    }
}

/// One parsed row. Temperatures keep their sentinel values.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub unix_secs: f64,
    pub datetime: String,
    pub cpu_temp_c: f64,
    pub sensor1_c: f64,
    pub sensor2_c: f64,
}

impl LogRow {
    pub fn value(&self, series: Series) -> f64 {
        match series {
            Series::Cpu => self.cpu_temp_c,
            Series::Sensor1 => self.sensor1_c,
            Series::Sensor2 => self.sensor2_c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extreme {
    pub celsius: f64,
    pub unix_secs: f64,
    pub datetime: String,
}

/// Statistics for one series over its valid readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub series: Series,
    pub samples: usize,
    /// Rows where this series held a sentinel.
    pub missing: usize,
    pub max: Extreme,
    pub min: Extreme,
    pub mean: f64,
    pub peak_to_peak: f64,
    /// Sample variance (n - 1); 0 with a single reading.
    pub variance: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogReport {
    pub rows: usize,
    pub skipped_rows: usize,
    pub first: Option<String>,
    pub last: Option<String>,
    pub span_secs: f64,
    /// Series with at least one valid reading, in column order.
    pub series: Vec<SeriesStats>,
    /// Series that never produced a valid reading.
    pub no_data: Vec<Series>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

struct Columns {
    timestamp: usize,
    datetime: usize,
    temps: [usize; 3],
}

fn locate_columns(header: &str) -> Result<Columns, ReportError> {
    let names: Vec<&str> = header.split(',').map(str::trim).collect();
    let find = |name: &'static str| {
        names
            .iter()
            .position(|n| *n == name)
            .ok_or(ReportError::MissingColumn(name))
    };
    Ok(Columns {
        timestamp: find("timestamp")?,
        datetime: find("datetime")?,
        temps: [
            find(Series::Cpu.column())?,
            find(Series::Sensor1.column())?,
            find(Series::Sensor2.column())?,
        ],
    })
}

fn parse_row(line: &str, cols: &Columns) -> Option<LogRow> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let num = |i: usize| fields.get(i)?.parse::<f64>().ok();
    Some(LogRow {
        unix_secs: num(cols.timestamp)?,
        datetime: fields.get(cols.datetime)?.to_string(),
        cpu_temp_c: num(cols.temps[0])?,
        sensor1_c: num(cols.temps[1])?,
        sensor2_c: num(cols.temps[2])?,
    })
}

/// Parse tick log text. Returns the rows and the number of lines skipped.
pub fn parse_tick_log(text: &str) -> Result<(Vec<LogRow>, usize), ReportError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or(ReportError::Empty)?;
    let cols = locate_columns(header)?;

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (i, line) in lines.enumerate() {
        match parse_row(line, &cols) {
            Some(row) => rows.push(row),
            None => {
                log::warn!("skipping malformed tick log row {}: {line:?}", i + 2);
                skipped += 1;
            }
        }
    }
    Ok((rows, skipped))
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Statistics for `series`, or `None` if it never held a valid reading.
/// Ties on an extreme resolve to the earliest row.
pub fn series_stats(rows: &[LogRow], series: Series) -> Option<SeriesStats> {
    let valid: Vec<&LogRow> = rows
        .iter()
        .filter(|r| is_valid_temp(r.value(series)))
        .collect();
    let first = *valid.first()?;

    let mut max = first;
    let mut min = first;
    for &r in &valid[1..] {
        if r.value(series) > max.value(series) {
            max = r;
        }
        if r.value(series) < min.value(series) {
            min = r;
        }
    }

    let n = valid.len() as f64;
    let mean = valid.iter().map(|r| r.value(series)).sum::<f64>() / n;
    let variance = if valid.len() > 1 {
        valid
            .iter()
            .map(|r| (r.value(series) - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0)
    } else {
        0.0
    };

    let extreme = |r: &LogRow| Extreme {
        celsius: r.value(series),
        unix_secs: r.unix_secs,
        datetime: r.datetime.clone(),
    };
    Some(SeriesStats {
        series,
        samples: valid.len(),
        missing: rows.len() - valid.len(),
        max: extreme(max),
        min: extreme(min),
        mean,
        peak_to_peak: max.value(series) - min.value(series),
        variance,
        std_dev: variance.sqrt(),
    })
}

/// Summarize parsed rows.
pub fn summarize(rows: &[LogRow], skipped_rows: usize) -> LogReport {
    let mut series = Vec::new();
    let mut no_data = Vec::new();
    for s in Series::ALL {
        match series_stats(rows, s) {
            Some(stats) => series.push(stats),
            None => no_data.push(s),
        }
    }
    let span_secs = match (rows.first(), rows.last()) {
        (Some(a), Some(b)) => (b.unix_secs - a.unix_secs).max(0.0),
        _ => 0.0,
    };
    LogReport {
        rows: rows.len(),
        skipped_rows,
        first: rows.first().map(|r| r.datetime.clone()),
        last: rows.last().map(|r| r.datetime.clone()),
        span_secs,
        series,
        no_data,
    }
}

/// Read and summarize the tick log at `path`.
pub fn analyze_tick_log(path: &Path) -> Result<LogReport, ReportError> {
    let text = fs::read_to_string(path)?;
    let (rows, skipped) = parse_tick_log(&text)?;
    Ok(summarize(&rows, skipped))
}

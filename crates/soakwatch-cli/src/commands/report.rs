//! `soakwatch report`: temperature statistics from a finished run's CSV log.

use std::path::Path;

use soakwatch_core::{LogReport, SeriesStats, analyze_tick_log};

pub fn run(csv: &Path, json: bool) {
    crate::logging::init_stderr();

    let report = match analyze_tick_log(csv) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error reading {}: {e}", csv.display());
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    print!("{}", render(csv, &report));
}

fn render(csv: &Path, report: &LogReport) -> String {
    let mut out = format!("Tick log: {}\n", csv.display());
    match (&report.first, &report.last) {
        (Some(first), Some(last)) => out.push_str(&format!(
            "  {} rows, {first} to {last} UTC ({:.0}s)\n",
            report.rows, report.span_secs
        )),
        _ => out.push_str("  no rows\n"),
    }
    if report.skipped_rows > 0 {
        out.push_str(&format!("  {} malformed rows skipped\n", report.skipped_rows));
    }
    out.push('\n');

    if !report.series.is_empty() {
        out.push_str(&stats_table(&report.series));
    }
    for s in &report.no_data {
        out.push_str(&format!("  {:<9} no data\n", s.label()));
    }
    out
}

/// `HH:MM:SS` from a `YYYY-MM-DD HH:MM:SS` log timestamp.
fn clock(datetime: &str) -> &str {
    datetime.rsplit(' ').next().unwrap_or(datetime)
}

pub fn stats_table(stats: &[SeriesStats]) -> String {
    let mut out = format!(
        "  {:<9} {:>7} {:>9} {:>7} {:>9} {:>7} {:>6} {:>7} {:>7} {:>6}\n",
        "SERIES", "MAX", "AT", "MIN", "AT", "MEAN", "P-P", "VAR", "STDDEV", "N"
    );
    out.push_str(&format!("  {}\n", "─".repeat(86)));
    for s in stats {
        out.push_str(&format!(
            "  {:<9} {:>7.1} {:>9} {:>7.1} {:>9} {:>7.2} {:>6.1} {:>7.2} {:>7.2} {:>6}\n",
            s.series.label(),
            s.max.celsius,
            clock(&s.max.datetime),
            s.min.celsius,
            clock(&s.min.datetime),
            s.mean,
            s.peak_to_peak,
            s.variance,
            s.std_dev,
            s.samples,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use soakwatch_core::CSV_HEADER;

    fn sample_log(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("soak.csv");
        let rows = [
            "1700000000.000,2023-11-14 22:13:20,50.0,30.0,-999.0,10.0,20.0,30.0,3,4",
            "1700000002.000,2023-11-14 22:13:22,56.0,31.0,-999.0,10.0,20.0,30.0,3,4",
            "1700000004.000,2023-11-14 22:13:24,-999.0,32.0,-999.0,10.0,20.0,30.0,3,4",
        ];
        std::fs::write(&path, format!("{CSV_HEADER}\n{}\n", rows.join("\n"))).unwrap();
        path
    }

    #[test]
    fn test_clock() {
        assert_eq!(clock("2023-11-14 22:13:20"), "22:13:20");
        assert_eq!(clock("22:13:20"), "22:13:20");
    }

    #[test]
    fn test_render_report() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_log(tmp.path());
        let report = analyze_tick_log(&path).unwrap();
        let text = render(&path, &report);

        assert!(text.contains("3 rows, 2023-11-14 22:13:20 to 2023-11-14 22:13:24 UTC (4s)"));
        let cpu = text.lines().find(|l| l.trim_start().starts_with("CPU")).unwrap();
        assert!(cpu.contains("56.0"));
        assert!(cpu.contains("22:13:22"));
        assert!(!cpu.contains("-999"));
        assert!(text.lines().any(|l| l.contains("Sensor 2") && l.ends_with("no data")));
    }

    #[test]
    fn test_stats_table_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let report = analyze_tick_log(&sample_log(tmp.path())).unwrap();
        let table = stats_table(&report.series);
        assert_eq!(table.lines().count(), 2 + report.series.len());
        assert!(table.lines().next().unwrap().contains("STDDEV"));
    }
}

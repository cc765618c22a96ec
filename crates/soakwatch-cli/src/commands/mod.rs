pub mod plan;
pub mod report;
pub mod roster;
pub mod run;
pub mod sample;
pub mod stress;

use std::path::Path;
use std::time::Duration;

use soakwatch_core::{
    ConfigError, EndpointSpec, IntensityChoice, load_roster, parse_duration, parse_intensity,
    reference_roster,
};

/// Exit status for configuration errors, reported before any work starts.
pub const EXIT_CONFIG: i32 = 2;

/// clap value parser for `500ms` / `30s` / `5m` / `1h`.
pub fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/// clap value parser for intensity levels.
pub fn intensity_arg(s: &str) -> Result<IntensityChoice, String> {
    parse_intensity(s).map_err(|e| e.to_string())
}

/// Print a configuration error and exit with [`EXIT_CONFIG`].
pub fn exit_config(err: &ConfigError) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(EXIT_CONFIG);
}

/// The roster from `path`, or the reference roster.
pub fn roster_or_default(path: Option<&Path>) -> Result<Vec<EndpointSpec>, ConfigError> {
    match path {
        Some(p) => Ok(load_roster(p)?),
        None => Ok(reference_roster()),
    }
}

/// Format a temperature, or "no data" for sentinels.
pub fn fmt_temp(celsius: f64) -> String {
    if soakwatch_core::is_valid_temp(celsius) {
        format!("{celsius:.1}°C")
    } else {
        "no data".to_string()
    }
}

/// Format a percentage, or "n/a" for sentinels.
pub fn fmt_pct(pct: f64) -> String {
    if soakwatch_core::is_valid_pct(pct) {
        format!("{pct:.1}%")
    } else {
        "n/a".to_string()
    }
}

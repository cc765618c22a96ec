//! Run configuration, resolved once at startup and immutable afterwards.

use std::path::PathBuf;
use std::time::Duration;

use crate::intensity::{IntensityChoice, IntensityLevel};
use crate::roster::{EndpointSpec, RosterError, reference_roster};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("duration must be greater than zero")]
    ZeroDuration,
    #[error("interval must be greater than zero")]
    ZeroInterval,
    #[error("source timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid duration '{0}' (expected e.g. 500ms, 30s, 5m, 1h)")]
    InvalidDuration(String),
    #[error("{0}")]
    UnknownLevel(String),
    #[error("CAN interface name must not be empty")]
    EmptyInterface,
    #[error(transparent)]
    Roster(#[from] RosterError),
}

/// Everything a run needs to know.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Total wall time of the run.
    pub duration: Duration,
    /// Time between tick starts.
    pub interval: Duration,
    pub intensity: IntensityChoice,
    /// Run the workload family every tick.
    pub stress: bool,
    /// Probe the roster every tick. When false the roster is reported empty.
    pub network: bool,
    /// Directory for the CSV log, the run summary and the text log.
    pub log_dir: PathBuf,
    /// CSV tick log path; defaults to a timestamped file in `log_dir`.
    pub log_path: Option<PathBuf>,
    /// Deadline for each source call within a tick.
    pub source_timeout: Duration,
    /// How long `ping` waits for a reply.
    pub probe_wait: Duration,
    /// How long a probe result may be reused. Zero disables caching.
    pub probe_cache_ttl: Duration,
    /// Where the disk workload writes; a fresh temp dir when `None`.
    pub scratch_dir: Option<PathBuf>,
    /// Filesystem whose usage is reported as disk %.
    pub disk_path: PathBuf,
    pub can_interface: String,
    pub roster: Vec<EndpointSpec>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(300),
            interval: Duration::from_secs(2),
            intensity: IntensityChoice::Fixed(IntensityLevel::Medium),
            stress: true,
            network: true,
            log_dir: PathBuf::from("logs"),
            log_path: None,
            source_timeout: Duration::from_secs(5),
            probe_wait: Duration::from_secs(3),
            probe_cache_ttl: Duration::ZERO,
            scratch_dir: None,
            disk_path: PathBuf::from("/"),
            can_interface: "can0".to_string(),
            roster: reference_roster(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.source_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.can_interface.trim().is_empty() {
            return Err(ConfigError::EmptyInterface);
        }
        Ok(())
    }

    /// Number of ticks a run performs if every tick fits in its slot.
    pub fn planned_ticks(&self) -> u64 {
        if self.interval.is_zero() {
            return 0;
        }
        self.duration.as_nanos().div_ceil(self.interval.as_nanos()) as u64
    }

    /// CSV log path, falling back to `<log_dir>/soak_<stamp>.csv`.
    pub fn resolved_log_path(&self, stamp: &str) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.log_dir.join(format!("soak_{stamp}.csv")))
    }
}

/// Parse `500ms`, `30s`, `5m`, `1h` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        (s, 1000)
    };

    let value: u64 = numeric
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;
    value
        .checked_mul(multiplier)
        .map(Duration::from_millis)
        .ok_or_else(|| ConfigError::InvalidDuration(s.to_string()))
}

pub fn parse_intensity(s: &str) -> Result<IntensityChoice, ConfigError> {
    s.parse().map_err(ConfigError::UnknownLevel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = RunConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.roster.len(), 11);
        assert_eq!(cfg.planned_ticks(), 150);
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut cfg = RunConfig {
            duration: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroDuration)));
        cfg.duration = Duration::from_secs(1);
        cfg.interval = Duration::ZERO;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroInterval)));
        cfg.interval = Duration::from_secs(1);
        cfg.source_timeout = Duration::ZERO;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_planned_ticks_rounds_up() {
        let cfg = RunConfig {
            duration: Duration::from_secs(10),
            interval: Duration::from_secs(3),
            ..Default::default()
        };
        assert_eq!(cfg.planned_ticks(), 4);
        let cfg = RunConfig {
            duration: Duration::from_secs(10),
            interval: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(cfg.planned_ticks(), 5);
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration(" 2 ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_parse_intensity() {
        assert_eq!(parse_intensity("auto").unwrap(), IntensityChoice::Auto);
        assert!(matches!(parse_intensity("max"), Err(ConfigError::UnknownLevel(_))));
    }

    #[test]
    fn test_resolved_log_path() {
        let cfg = RunConfig::default();
        assert_eq!(
            cfg.resolved_log_path("20260101_000000"),
            PathBuf::from("logs/soak_20260101_000000.csv")
        );
    }
}

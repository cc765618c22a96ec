//! Source adapter contracts.
//!
//! Each data source implements one of [`BusSource`], [`Prober`] or
//! [`ResourceSource`]. Adapters only report what they saw: they return a
//! `Result` and never substitute sentinels themselves. Timeouts and sentinel
//! substitution belong to the orchestrator.

use crate::roster::EndpointSpec;
use crate::snapshot::{BusReading, ResourceReading};

/// Why a source call produced no reading.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// The device or facility is not present on this host.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// The call did not finish within the per-call deadline.
    #[error("timed out after {0} ms")]
    Timeout(u64),
    /// The previous call on the same adapter is still running.
    #[error("adapter busy with a previous call")]
    Busy,
    #[error("io error: {0}")]
    Io(String),
    /// Data arrived but could not be interpreted.
    #[error("decode error: {0}")]
    Decode(String),
    #[error("adapter panicked")]
    Panicked,
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Field-bus temperature feed (two sensors).
pub trait BusSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Read the latest pair of calibrated temperatures.
    fn read(&self) -> Result<BusReading, SourceError>;
}

/// Result of one reachability probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub up: bool,
    /// Round-trip latency; only meaningful when `up`.
    pub latency_ms: Option<f64>,
}

impl ProbeResult {
    pub fn up(latency_ms: f64) -> Self {
        Self {
            up: true,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn down() -> Self {
        Self {
            up: false,
            latency_ms: None,
        }
    }
}

/// Reachability checker for roster endpoints.
pub trait Prober: Send + Sync {
    fn name(&self) -> &str;

    /// Probe one endpoint. An unreachable endpoint is `Ok(ProbeResult::down())`;
    /// `Err` means the probe itself could not be carried out.
    fn probe(&self, endpoint: &EndpointSpec) -> Result<ProbeResult, SourceError>;
}

/// Host utilization and CPU temperature.
pub trait ResourceSource: Send + Sync {
    fn name(&self) -> &str;

    fn sample(&self) -> Result<ResourceReading, SourceError>;
}

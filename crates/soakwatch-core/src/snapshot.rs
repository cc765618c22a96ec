//! Per-tick snapshot data model.
//!
//! A [`Snapshot`] is built once per tick by the orchestrator and handed to
//! every sink as an `Arc<Snapshot>`. It is never mutated afterwards.
//!
//! Every field is populated on every tick. When a source fails, its field
//! carries a sentinel value ([`TEMP_SENTINEL_C`], [`UTIL_SENTINEL`], or an
//! endpoint marked down with no latency) together with the error text, so
//! consumers never branch on absence.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::intensity::IntensityLevel;
use crate::roster::{EndpointCategory, EndpointSpec};
use crate::workload::{StressResult, WorkloadKind};

/// Temperature reported when a reading could not be obtained.
pub const TEMP_SENTINEL_C: f64 = -999.0;

/// Utilization percentage reported when a counter could not be read.
pub const UTIL_SENTINEL: f64 = -1.0;

/// Anything below this is treated as a sentinel rather than a real temperature.
pub const TEMP_VALID_FLOOR_C: f64 = -900.0;

/// Whether a temperature is a real reading (not a failure marker).
pub fn is_valid_temp(celsius: f64) -> bool {
    celsius.is_finite() && celsius > TEMP_VALID_FLOOR_C
}

/// Whether a utilization percentage is a real reading.
pub fn is_valid_pct(pct: f64) -> bool {
    pct.is_finite() && pct >= 0.0
}

// ---------------------------------------------------------------------------
// Bus readings
// ---------------------------------------------------------------------------

/// Two calibrated temperatures from the field-bus sensor feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusReading {
    pub sensor1_c: f64,
    pub sensor2_c: f64,
}

impl BusReading {
    /// Both sensors set to the failure sentinel.
    pub fn sentinel() -> Self {
        Self {
            sensor1_c: TEMP_SENTINEL_C,
            sensor2_c: TEMP_SENTINEL_C,
        }
    }
}

/// Bus field of a snapshot: the reading (or sentinels) plus the failure text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSample {
    pub sensor1_c: f64,
    pub sensor2_c: f64,
    pub error: Option<String>,
}

impl BusSample {
    pub fn from_reading(reading: BusReading) -> Self {
        Self {
            sensor1_c: reading.sensor1_c,
            sensor2_c: reading.sensor2_c,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let s = BusReading::sentinel();
        Self {
            sensor1_c: s.sensor1_c,
            sensor2_c: s.sensor2_c,
            error: Some(error.into()),
        }
    }

    /// Sensor values keyed by sensor id, in id order.
    pub fn by_sensor(&self) -> [(&'static str, f64); 2] {
        [("sensor1", self.sensor1_c), ("sensor2", self.sensor2_c)]
    }
}

// ---------------------------------------------------------------------------
// Reachability
// ---------------------------------------------------------------------------

/// Outcome of probing one endpoint this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Up,
    Down,
    /// The probe did not return within the per-call timeout.
    Timeout,
    /// The probe itself failed (spawn error, busy adapter, ...).
    Error,
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Reachability of one roster endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub id: String,
    pub address: String,
    pub category: EndpointCategory,
    pub status: LinkStatus,
    pub latency_ms: Option<f64>,
    pub error: Option<String>,
}

impl EndpointStatus {
    pub fn up(&self) -> bool {
        self.status == LinkStatus::Up
    }

    /// Build the down/no-latency placeholder for a failed probe.
    pub fn failed(spec: &EndpointSpec, status: LinkStatus, error: impl Into<String>) -> Self {
        Self {
            id: spec.id.clone(),
            address: spec.address.clone(),
            category: spec.category,
            status,
            latency_ms: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Host resources
// ---------------------------------------------------------------------------

/// Host utilization counters and CPU temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceReading {
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub disk_pct: f64,
    pub cpu_temp_c: f64,
}

/// Resource field of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub disk_pct: f64,
    pub cpu_temp_c: f64,
    pub error: Option<String>,
}

impl ResourceSample {
    pub fn from_reading(r: ResourceReading) -> Self {
        Self {
            cpu_pct: r.cpu_pct,
            mem_pct: r.mem_pct,
            disk_pct: r.disk_pct,
            cpu_temp_c: r.cpu_temp_c,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            cpu_pct: UTIL_SENTINEL,
            mem_pct: UTIL_SENTINEL,
            disk_pct: UTIL_SENTINEL,
            cpu_temp_c: TEMP_SENTINEL_C,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable merged result of one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Zero-based tick index within the run.
    pub tick: u64,
    pub tick_time: SystemTime,
    pub level: IntensityLevel,
    pub bus: BusSample,
    pub reachability: Vec<EndpointStatus>,
    pub resources: ResourceSample,
    pub stress: BTreeMap<WorkloadKind, StressResult>,
    /// Wall time spent assembling this snapshot.
    pub assembly_time: Duration,
}

impl Snapshot {
    pub fn up_count(&self) -> usize {
        self.reachability.iter().filter(|e| e.up()).count()
    }

    pub fn endpoint_count(&self) -> usize {
        self.reachability.len()
    }

    /// Tick time as fractional seconds since the Unix epoch.
    pub fn unix_secs(&self) -> f64 {
        self.tick_time
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    /// Number of stress workloads that failed this tick.
    pub fn stress_failures(&self) -> usize {
        self.stress.values().filter(|r| !r.is_success()).count()
    }
}

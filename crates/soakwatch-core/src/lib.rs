//! # soakwatch-core
//!
//! **Watch a machine cook, and cook it on purpose.**
//!
//! `soakwatch-core` samples three sources on a fixed cadence (a field-bus
//! temperature feed, reachability of a fixed endpoint roster, and host
//! resource counters), merges them into one immutable [`Snapshot`] per tick,
//! and runs intensity-tiered synthetic load against the host at the same time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use soakwatch_core::{Orchestrator, RunConfig, StopSignal, TickLog, HardwareProfile, Sink};
//!
//! let config = RunConfig::default();
//! config.validate().unwrap();
//! let level = HardwareProfile::detect().resolve(config.intensity);
//! let mut orch = Orchestrator::from_config(&config, level).unwrap();
//! let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(TickLog::new("soak.csv"))];
//! let summary = orch.run(&mut sinks, &StopSignal::new());
//! println!("{} ticks", summary.ticks);
//! ```
//!
//! ## Architecture
//!
//! Sources (timed, sentinel on failure) + Workloads (concurrent, per tick)
//! → Snapshot → Sinks (CSV log, live view, run statistics)
//!
//! Every failure becomes data: a dead bus reads `-999.0`, an unreachable
//! endpoint reads DOWN with no latency, a crashed workload reads `failed`.
//! The loop itself only ends when the duration elapses or the
//! [`StopSignal`] is raised. Afterwards [`analyze_tick_log`] turns the CSV
//! log into per-series temperature statistics.

pub mod cache;
pub mod config;
pub mod intensity;
pub mod orchestrator;
pub mod report;
pub mod roster;
pub mod session;
pub mod sink;
pub mod snapshot;
pub mod source;
pub mod sources;
pub mod stop;
pub mod timed;
pub mod workload;

pub use cache::TtlCache;
pub use config::{ConfigError, RunConfig, parse_duration, parse_intensity};
pub use intensity::{HardwareProfile, IntensityChoice, IntensityLevel, WorkloadSpec, resolve};
pub use orchestrator::{FailureCounts, Orchestrator, RunSummary, Sources};
pub use report::{LogReport, ReportError, Series, SeriesStats, analyze_tick_log};
pub use roster::{EndpointCategory, EndpointSpec, RosterError, load_roster, reference_roster};
pub use session::{CSV_HEADER, TickLog, file_stamp, format_utc};
pub use sink::{ChannelSink, RunInfo, RunReport, RunStats, Sink, SinkError};
pub use snapshot::{
    BusReading, BusSample, EndpointStatus, LinkStatus, ResourceReading, ResourceSample, Snapshot,
    TEMP_SENTINEL_C, UTIL_SENTINEL, is_valid_pct, is_valid_temp,
};
pub use source::{BusSource, ProbeResult, Prober, ResourceSource, SourceError};
pub use stop::StopSignal;
pub use workload::{
    StressResult, StressStatus, Workload, WorkloadError, WorkloadFamily, WorkloadKind,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

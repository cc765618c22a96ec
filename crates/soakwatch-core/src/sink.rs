//! Snapshot consumers.
//!
//! The orchestrator hands every finished snapshot to each sink in order.
//! A failing sink is logged and counted; it never stops the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use serde::Serialize;

use crate::intensity::IntensityLevel;
use crate::session::{format_utc, write_json_pretty};
use crate::snapshot::{Snapshot, is_valid_temp};
use crate::workload::WorkloadKind;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The consumer is behind; this snapshot was dropped.
    #[error("consumer is behind, snapshot dropped")]
    Backpressure,
    #[error("consumer has gone away")]
    Closed,
}

pub trait Sink: Send {
    fn name(&self) -> &str;

    fn consume(&mut self, snapshot: &Arc<Snapshot>) -> Result<(), SinkError>;

    /// Called once after the last tick.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Channel sink
// ---------------------------------------------------------------------------

/// Forwards snapshots to another thread over a bounded channel.
pub struct ChannelSink {
    tx: SyncSender<Arc<Snapshot>>,
}

impl ChannelSink {
    /// Create the sink and the receiving end. `capacity` of zero is raised to one.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Arc<Snapshot>>) {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    fn consume(&mut self, snapshot: &Arc<Snapshot>) -> Result<(), SinkError> {
        match self.tx.try_send(Arc::clone(snapshot)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SinkError::Backpressure),
            Err(TrySendError::Disconnected(_)) => Err(SinkError::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// Run statistics
// ---------------------------------------------------------------------------

/// Count, mean and range of the valid readings of one temperature channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TempStats {
    pub readings: u64,
    pub invalid: u64,
    pub avg_c: Option<f64>,
    pub min_c: Option<f64>,
    pub max_c: Option<f64>,
    #[serde(skip)]
    sum: f64,
}

impl TempStats {
    pub fn record(&mut self, celsius: f64) {
        if !is_valid_temp(celsius) {
            self.invalid += 1;
            return;
        }
        self.readings += 1;
        self.sum += celsius;
        self.avg_c = Some(self.sum / self.readings as f64);
        self.min_c = Some(self.min_c.map_or(celsius, |m| m.min(celsius)));
        self.max_c = Some(self.max_c.map_or(celsius, |m| m.max(celsius)));
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TemperatureSummary {
    pub cpu: TempStats,
    pub sensor1: TempStats,
    pub sensor2: TempStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkSummary {
    pub total_probes: u64,
    pub successful_probes: u64,
    /// Ticks on which each endpoint was down.
    pub down_ticks: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StressSummary {
    pub runs: BTreeMap<WorkloadKind, u64>,
    pub failures: BTreeMap<WorkloadKind, u64>,
}

/// Static facts about the run recorded alongside the statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub started_at: String,
    pub duration_secs: f64,
    pub interval_secs: f64,
    pub level: IntensityLevel,
    pub stress: bool,
    pub csv_log: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run: RunInfo,
    pub ticks: u64,
    pub last_tick_at: Option<String>,
    pub temperatures: TemperatureSummary,
    pub network: NetworkSummary,
    pub stress: StressSummary,
}

/// Accumulates per-run statistics and writes them as JSON on finish.
pub struct RunStats {
    path: PathBuf,
    report: RunReport,
}

impl RunStats {
    pub fn new(path: impl Into<PathBuf>, info: RunInfo) -> Self {
        Self {
            path: path.into(),
            report: RunReport {
                run: info,
                ticks: 0,
                last_tick_at: None,
                temperatures: TemperatureSummary::default(),
                network: NetworkSummary::default(),
                stress: StressSummary::default(),
            },
        }
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for RunStats {
    fn name(&self) -> &str {
        "run_stats"
    }

    fn consume(&mut self, snapshot: &Arc<Snapshot>) -> Result<(), SinkError> {
        let r = &mut self.report;
        r.ticks += 1;
        r.last_tick_at = Some(format_utc(snapshot.tick_time));

        r.temperatures.cpu.record(snapshot.resources.cpu_temp_c);
        r.temperatures.sensor1.record(snapshot.bus.sensor1_c);
        r.temperatures.sensor2.record(snapshot.bus.sensor2_c);

        for ep in &snapshot.reachability {
            r.network.total_probes += 1;
            if ep.up() {
                r.network.successful_probes += 1;
            } else {
                *r.network.down_ticks.entry(ep.id.clone()).or_default() += 1;
            }
        }

        for (kind, result) in &snapshot.stress {
            *r.stress.runs.entry(*kind).or_default() += 1;
            if !result.is_success() {
                *r.stress.failures.entry(*kind).or_default() += 1;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        write_json_pretty(&self.path, &self.report)?;
        log::info!("run summary written to {}", self.path.display());
        Ok(())
    }
}

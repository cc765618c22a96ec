//! Tick loop: sample every source, run the workloads, publish one snapshot.
//!
//! Ticks run on a fixed-rate schedule anchored at the start of the run: tick
//! *k* is due at `start + k * interval`. A tick that overruns its slot skips
//! the slots it missed instead of running back-to-back, so drift never
//! accumulates. Ticks never overlap.
//!
//! Within a tick the bus read, one probe per roster endpoint and the resource
//! sample are started as deadline-bounded background calls. The workload
//! family runs on the loop thread meanwhile; then every source result is
//! collected. Failed sources become sentinels and the loop carries on.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;

use crate::cache::TtlCache;
use crate::config::RunConfig;
use crate::intensity::{IntensityLevel, WorkloadSpec};
use crate::roster::EndpointSpec;
use crate::sink::Sink;
use crate::snapshot::{BusSample, EndpointStatus, LinkStatus, ResourceSample, Snapshot};
use crate::source::{BusSource, ProbeResult, Prober, ResourceSource, SourceError};
use crate::sources::{CanBusSource, HostResources, PingProber};
use crate::stop::StopSignal;
use crate::timed::{CallSlot, PendingCall};
use crate::workload::WorkloadFamily;

/// The three adapters sampled every tick.
pub struct Sources {
    pub bus: Arc<dyn BusSource>,
    pub prober: Arc<dyn Prober>,
    pub resources: Arc<dyn ResourceSource>,
}

impl Sources {
    /// SocketCAN, system ping and sysinfo, configured from `config`.
    pub fn system(config: &RunConfig) -> Self {
        Self {
            bus: Arc::new(CanBusSource::new(&config.can_interface)),
            prober: Arc::new(PingProber::new(config.probe_wait)),
            resources: Arc::new(HostResources::new(&config.disk_path)),
        }
    }
}

/// Per-source failure counts for the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub bus: u64,
    pub probes: u64,
    pub resources: u64,
    pub stress: u64,
}

/// What a finished run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub level: IntensityLevel,
    pub ticks: u64,
    /// Slots skipped because a tick overran its interval.
    pub skipped_slots: u64,
    pub failures: FailureCounts,
    /// Failed `consume` / `finish` calls per sink name.
    pub sink_failures: BTreeMap<String, u64>,
    pub elapsed: Duration,
    pub stopped_early: bool,
}

/// Index of the next slot to run after `current`, given time since start.
///
/// Slots whose start time has already passed are skipped; if the loop is
/// exactly on a slot boundary that slot is still due.
pub fn next_slot(current: u64, elapsed: Duration, interval: Duration) -> u64 {
    let step = interval.as_nanos().max(1);
    let due = elapsed.as_nanos().div_ceil(step);
    let due = u64::try_from(due).unwrap_or(u64::MAX);
    due.max(current.saturating_add(1))
}

/// Offset of slot `k` from the start of the run.
pub fn slot_offset(interval: Duration, k: u64) -> Duration {
    let nanos = interval.as_nanos().saturating_mul(u128::from(k));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

enum ProbeCall {
    Cached(ProbeResult),
    Pending(PendingCall<ProbeResult>),
}

pub struct Orchestrator {
    sources: Sources,
    roster: Vec<EndpointSpec>,
    family: WorkloadFamily,
    level: IntensityLevel,
    spec: WorkloadSpec,
    duration: Duration,
    interval: Duration,
    source_timeout: Duration,
    bus_slot: CallSlot,
    resource_slot: CallSlot,
    probe_slots: Vec<CallSlot>,
    probe_cache: TtlCache<String, ProbeResult>,
    tick: u64,
    failures: FailureCounts,
    _scratch: Option<tempfile::TempDir>,
}

impl Orchestrator {
    /// Build an orchestrator from explicit adapters and workloads.
    ///
    /// The roster is taken from `config` unless network probing is disabled,
    /// in which case it is empty.
    pub fn new(
        config: &RunConfig,
        level: IntensityLevel,
        sources: Sources,
        family: WorkloadFamily,
    ) -> Self {
        let roster = if config.network {
            config.roster.clone()
        } else {
            Vec::new()
        };
        let probe_slots = roster
            .iter()
            .map(|ep| CallSlot::new(format!("probe-{}", ep.id)))
            .collect();
        Self {
            bus_slot: CallSlot::new(sources.bus.name().to_string()),
            resource_slot: CallSlot::new(sources.resources.name().to_string()),
            sources,
            roster,
            family,
            level,
            spec: WorkloadSpec::for_level(level),
            duration: config.duration,
            interval: config.interval,
            source_timeout: config.source_timeout,
            probe_slots,
            probe_cache: TtlCache::new(config.probe_cache_ttl),
            tick: 0,
            failures: FailureCounts::default(),
            _scratch: None,
        }
    }

    /// Build with the system adapters and, if stress is enabled, the
    /// standard workload family writing into the configured scratch
    /// directory (or a private temporary one).
    pub fn from_config(config: &RunConfig, level: IntensityLevel) -> std::io::Result<Self> {
        let (family, scratch) = if config.stress {
            let (dir, guard): (PathBuf, Option<tempfile::TempDir>) = match &config.scratch_dir {
                Some(dir) => {
                    std::fs::create_dir_all(dir)?;
                    (dir.clone(), None)
                }
                None => {
                    let tmp = tempfile::Builder::new().prefix("soakwatch-").tempdir()?;
                    (tmp.path().to_path_buf(), Some(tmp))
                }
            };
            log::debug!("disk workload scratch dir: {}", dir.display());
            (WorkloadFamily::standard(dir), guard)
        } else {
            (WorkloadFamily::new(), None)
        };
        let mut orch = Self::new(config, level, Sources::system(config), family);
        orch._scratch = scratch;
        Ok(orch)
    }

    pub fn level(&self) -> IntensityLevel {
        self.level
    }

    pub fn workload_spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    pub fn roster(&self) -> &[EndpointSpec] {
        &self.roster
    }

    pub fn failures(&self) -> &FailureCounts {
        &self.failures
    }

    /// Run one tick and return its snapshot.
    pub fn tick(&mut self, stop: &StopSignal) -> Snapshot {
        let tick_time = SystemTime::now();
        let t0 = Instant::now();
        let deadline = t0 + self.source_timeout;

        let bus = Arc::clone(&self.sources.bus);
        let bus_call = self.bus_slot.start(deadline, move || bus.read());

        let res = Arc::clone(&self.sources.resources);
        let resource_call = self.resource_slot.start(deadline, move || res.sample());

        let probe_calls: Vec<ProbeCall> = self
            .roster
            .iter()
            .zip(&self.probe_slots)
            .map(|(ep, slot)| match self.probe_cache.get(&ep.id, t0) {
                Some(hit) => ProbeCall::Cached(hit),
                None => {
                    let prober = Arc::clone(&self.sources.prober);
                    let ep = ep.clone();
                    ProbeCall::Pending(slot.start(deadline, move || prober.probe(&ep)))
                }
            })
            .collect();

        let stress = if self.family.is_empty() {
            BTreeMap::new()
        } else {
            self.family.run_all(&self.spec, stop)
        };
        self.failures.stress += stress.values().filter(|r| !r.is_success()).count() as u64;

        let bus = match bus_call.wait() {
            Ok(reading) => {
                log::debug!(
                    "tick {}: bus {:.1} / {:.1} C",
                    self.tick,
                    reading.sensor1_c,
                    reading.sensor2_c
                );
                BusSample::from_reading(reading)
            }
            Err(e) => {
                log::warn!("tick {}: bus read failed: {e}", self.tick);
                self.failures.bus += 1;
                BusSample::failed(e.to_string())
            }
        };

        let now = Instant::now();
        let mut reachability = Vec::with_capacity(self.roster.len());
        for (ep, call) in self.roster.iter().zip(probe_calls) {
            let outcome = match call {
                ProbeCall::Cached(hit) => Ok(hit),
                ProbeCall::Pending(pending) => {
                    let r = pending.wait();
                    if let Ok(hit) = &r {
                        self.probe_cache.insert(ep.id.clone(), *hit, now);
                    }
                    r
                }
            };
            reachability.push(match outcome {
                Ok(p) => EndpointStatus {
                    id: ep.id.clone(),
                    address: ep.address.clone(),
                    category: ep.category,
                    status: if p.up { LinkStatus::Up } else { LinkStatus::Down },
                    latency_ms: if p.up { p.latency_ms } else { None },
                    error: None,
                },
                Err(e) => {
                    log::warn!("tick {}: probe {} failed: {e}", self.tick, ep.id);
                    self.failures.probes += 1;
                    let status = match e {
                        SourceError::Timeout(_) => LinkStatus::Timeout,
                        _ => LinkStatus::Error,
                    };
                    EndpointStatus::failed(ep, status, e.to_string())
                }
            });
        }

        let resources = match resource_call.wait() {
            Ok(r) => ResourceSample::from_reading(r),
            Err(e) => {
                log::warn!("tick {}: resource sample failed: {e}", self.tick);
                self.failures.resources += 1;
                ResourceSample::failed(e.to_string())
            }
        };

        let snapshot = Snapshot {
            tick: self.tick,
            tick_time,
            level: self.level,
            bus,
            reachability,
            resources,
            stress,
            assembly_time: t0.elapsed(),
        };
        self.tick += 1;
        snapshot
    }

    /// Run ticks until the duration elapses or `stop` is raised, handing
    /// every snapshot to `sinks` in order.
    pub fn run(&mut self, sinks: &mut [Box<dyn Sink>], stop: &StopSignal) -> RunSummary {
        let start = Instant::now();
        let mut slot = 0u64;
        let mut ticks = 0u64;
        let mut skipped = 0u64;
        let mut sink_failures: BTreeMap<String, u64> = BTreeMap::new();
        let planned = u64::try_from(
            self.duration
                .as_nanos()
                .div_ceil(self.interval.as_nanos().max(1)),
        )
        .unwrap_or(u64::MAX);

        log::info!(
            "run started: level {}, interval {:?}, duration {:?}, {} endpoints, {} workloads",
            self.level,
            self.interval,
            self.duration,
            self.roster.len(),
            self.family.len()
        );

        loop {
            if stop.is_stopped() || slot_offset(self.interval, slot) >= self.duration {
                break;
            }

            let snapshot = Arc::new(self.tick(stop));
            ticks += 1;
            for sink in sinks.iter_mut() {
                if let Err(e) = sink.consume(&snapshot) {
                    log::warn!("sink {} failed on tick {}: {e}", sink.name(), snapshot.tick);
                    *sink_failures.entry(sink.name().to_string()).or_default() += 1;
                }
            }

            let next = next_slot(slot, start.elapsed(), self.interval);
            let missed = next.min(planned).saturating_sub(slot + 1);
            if missed > 0 {
                log::warn!(
                    "tick {} overran its interval, skipping {missed} slot(s)",
                    snapshot.tick
                );
                skipped += missed;
            }
            slot = next;

            let offset = slot_offset(self.interval, slot);
            if offset >= self.duration {
                break;
            }
            if stop.wait_until(start + offset) {
                break;
            }
        }

        for sink in sinks.iter_mut() {
            if let Err(e) = sink.finish() {
                log::warn!("sink {} failed to finish: {e}", sink.name());
                *sink_failures.entry(sink.name().to_string()).or_default() += 1;
            }
        }

        let summary = RunSummary {
            level: self.level,
            ticks,
            skipped_slots: skipped,
            failures: self.failures.clone(),
            sink_failures,
            elapsed: start.elapsed(),
            stopped_early: stop.is_stopped(),
        };
        log::info!(
            "run finished: {} ticks in {:.1}s ({} skipped slots)",
            summary.ticks,
            summary.elapsed.as_secs_f64(),
            summary.skipped_slots
        );
        summary
    }
}

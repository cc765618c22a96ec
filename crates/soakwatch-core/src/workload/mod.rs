//! Synthetic load generators.
//!
//! Every generator implements [`Workload`]. The provided [`Workload::run`]
//! measures wall time from entry to exit and turns errors and panics into a
//! failed [`StressResult`], so a broken workload never takes the tick down.
//! [`WorkloadFamily`] runs all enabled workloads concurrently, once per tick.

pub mod compute;
pub mod custom;
pub mod disk;
pub mod memory;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::intensity::WorkloadSpec;
use crate::stop::StopSignal;

pub use compute::ComputeWorkload;
pub use custom::CustomWorkload;
pub use disk::DiskWorkload;
pub use memory::MemoryWorkload;

/// Which generator produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    Compute,
    Memory,
    Disk,
    Custom,
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compute => write!(f, "compute"),
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressStatus {
    Success,
    Failed,
}

/// Outcome of one workload execution. `error` is present iff failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub status: StressStatus,
    pub duration: Duration,
    /// Short summary of what was done (empty on failure).
    pub detail: String,
    pub error: Option<String>,
}

impl StressResult {
    pub fn success(duration: Duration, detail: impl Into<String>) -> Self {
        Self {
            status: StressStatus::Success,
            duration,
            detail: detail.into(),
            error: None,
        }
    }

    pub fn failed(duration: Duration, error: impl Into<String>) -> Self {
        Self {
            status: StressStatus::Failed,
            duration,
            detail: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StressStatus::Success
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("verification failed for {path}: {reason}")]
    VerifyMismatch { path: PathBuf, reason: String },
    #[error("{failed} of {total} workers failed: {first}")]
    WorkerFailed {
        failed: usize,
        total: usize,
        first: String,
    },
    #[error("cancelled")]
    Cancelled,
    #[error("a {0} workload is already registered")]
    DuplicateKind(WorkloadKind),
    #[error("{0}")]
    Custom(String),
}

/// Return `Cancelled` if the stop signal has been raised.
pub(crate) fn check_stop(stop: &StopSignal) -> Result<(), WorkloadError> {
    if stop.is_stopped() {
        Err(WorkloadError::Cancelled)
    } else {
        Ok(())
    }
}

/// A synthetic load generator.
pub trait Workload: Send + Sync {
    fn kind(&self) -> WorkloadKind;

    /// Do one round of work at the given intensity. Returns a short summary.
    fn execute(&self, spec: &WorkloadSpec, stop: &StopSignal) -> Result<String, WorkloadError>;

    /// Timed, panic-safe wrapper around [`execute`](Self::execute).
    fn run(&self, spec: &WorkloadSpec, stop: &StopSignal) -> StressResult {
        let t0 = Instant::now();
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.execute(spec, stop)));
        let elapsed = t0.elapsed();
        match outcome {
            Ok(Ok(detail)) => StressResult::success(elapsed, detail),
            Ok(Err(e)) => StressResult::failed(elapsed, e.to_string()),
            Err(_) => StressResult::failed(elapsed, "workload panicked"),
        }
    }
}

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

/// The set of workloads run every tick. At most one workload per kind.
#[derive(Default)]
pub struct WorkloadFamily {
    workloads: Vec<Box<dyn Workload>>,
}

impl WorkloadFamily {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute, memory and disk workloads; disk files go under `scratch_dir`.
    pub fn standard(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            workloads: vec![
                Box::new(ComputeWorkload::default()),
                Box::new(MemoryWorkload),
                Box::new(DiskWorkload::new(scratch_dir)),
            ],
        }
    }

    /// Register a workload. Results are keyed by kind, so a second workload
    /// of a kind already present is refused.
    pub fn add(&mut self, workload: Box<dyn Workload>) -> Result<(), WorkloadError> {
        let kind = workload.kind();
        if self.workloads.iter().any(|w| w.kind() == kind) {
            log::warn!("refusing duplicate {kind} workload");
            return Err(WorkloadError::DuplicateKind(kind));
        }
        self.workloads.push(workload);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.workloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty()
    }

    pub fn kinds(&self) -> Vec<WorkloadKind> {
        self.workloads.iter().map(|w| w.kind()).collect()
    }

    /// Run every workload concurrently and wait for all of them.
    pub fn run_all(
        &self,
        spec: &WorkloadSpec,
        stop: &StopSignal,
    ) -> BTreeMap<WorkloadKind, StressResult> {
        std::thread::scope(|s| {
            let handles: Vec<_> = self
                .workloads
                .iter()
                .map(|w| (w.kind(), s.spawn(move || w.run(spec, stop))))
                .collect();

            handles
                .into_iter()
                .map(|(kind, h)| {
                    let result = h.join().unwrap_or_else(|_| {
                        StressResult::failed(Duration::ZERO, "workload thread panicked")
                    });
                    if let Some(err) = &result.error {
                        log::warn!("{kind} workload failed: {err}");
                    }
                    (kind, result)
                })
                .collect()
        })
    }
}

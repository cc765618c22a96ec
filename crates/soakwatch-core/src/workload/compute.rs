//! CPU load: per-worker recursive Fibonacci plus a dense matrix multiply.

use std::hint::black_box;

use super::{Workload, WorkloadError, WorkloadKind, check_stop};
use crate::intensity::WorkloadSpec;
use crate::stop::StopSignal;

/// Work done by one compute worker. Receives the worker index.
pub type ComputeKernel = fn(usize, &WorkloadSpec) -> Result<u64, WorkloadError>;

/// Spawns `thread_count` workers running the kernel and joins them all.
pub struct ComputeWorkload {
    kernel: ComputeKernel,
}

impl ComputeWorkload {
    pub fn with_kernel(kernel: ComputeKernel) -> Self {
        Self { kernel }
    }
}

impl Default for ComputeWorkload {
    fn default() -> Self {
        Self::with_kernel(fib_matmul_kernel)
    }
}

impl Workload for ComputeWorkload {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Compute
    }

    fn execute(&self, spec: &WorkloadSpec, stop: &StopSignal) -> Result<String, WorkloadError> {
        check_stop(stop)?;
        let workers = spec.thread_count.max(1);
        let kernel = self.kernel;

        let outcomes: Vec<Result<u64, String>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|i| s.spawn(move || kernel(i, spec)))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(Ok(v)) => Ok(v),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("worker panicked".to_string()),
                })
                .collect()
        });

        let failures: Vec<&String> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
        if let Some(first) = failures.first() {
            return Err(WorkloadError::WorkerFailed {
                failed: failures.len(),
                total: workers,
                first: (*first).clone(),
            });
        }
        let checksum = outcomes
            .iter()
            .filter_map(|o| o.as_ref().ok())
            .fold(0u64, |acc, v| acc.wrapping_add(*v));
        Ok(format!(
            "{workers} workers, fib({}) + {}x{} matmul, checksum {checksum:016x}",
            spec.fib_depth, spec.matrix_dim, spec.matrix_dim
        ))
    }
}

// ---------------------------------------------------------------------------
// Default kernel
// ---------------------------------------------------------------------------

fn fib(n: u32) -> u64 {
    if n < 2 {
        u64::from(n)
    } else {
        fib(n - 1).wrapping_add(fib(n - 2))
    }
}

/// Multiply two deterministic `dim x dim` matrices; returns the trace.
fn matmul_trace(dim: usize, seed: usize) -> f64 {
    let a: Vec<f64> = (0..dim * dim)
        .map(|i| ((i + seed) % 17) as f64 * 0.5)
        .collect();
    let b: Vec<f64> = (0..dim * dim)
        .map(|i| ((i * 7 + seed) % 13) as f64 * 0.25)
        .collect();
    let mut c = vec![0.0f64; dim * dim];
    for i in 0..dim {
        for k in 0..dim {
            let aik = a[i * dim + k];
            for j in 0..dim {
                c[i * dim + j] += aik * b[k * dim + j];
            }
        }
    }
    (0..dim).map(|i| c[i * dim + i]).sum()
}

/// Fibonacci to `fib_depth`, then a `matrix_dim` square multiply.
pub fn fib_matmul_kernel(worker: usize, spec: &WorkloadSpec) -> Result<u64, WorkloadError> {
    let f = black_box(fib(black_box(spec.fib_depth)));
    let trace = black_box(matmul_trace(spec.matrix_dim, worker));
    if !trace.is_finite() {
        return Err(WorkloadError::Custom("matrix trace is not finite".into()));
    }
    Ok(f ^ trace.to_bits())
}

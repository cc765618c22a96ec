//! Memory load: allocate, fill, sort, scan and search one large block.

use rand::Rng;

use super::{Workload, WorkloadError, WorkloadKind, check_stop};
use crate::intensity::WorkloadSpec;
use crate::stop::StopSignal;

const PROBE_COUNT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    pub words: usize,
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub probe_hits: usize,
}

/// Allocates `memory_block_size` bytes, fills them with random words, sorts,
/// scans and membership-tests them, and frees the block before returning.
pub struct MemoryWorkload;

impl Workload for MemoryWorkload {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Memory
    }

    fn execute(&self, spec: &WorkloadSpec, stop: &StopSignal) -> Result<String, WorkloadError> {
        let report = run_cycle(spec.memory_block_size, stop)?;
        Ok(format!(
            "{} MiB sorted, {} of {PROBE_COUNT} probes found",
            report.words * 8 / (1024 * 1024),
            report.probe_hits
        ))
    }
}

/// One allocate/fill/sort/scan/search pass over `bytes` bytes.
pub fn run_cycle(bytes: usize, stop: &StopSignal) -> Result<MemoryReport, WorkloadError> {
    check_stop(stop)?;
    let words = (bytes / std::mem::size_of::<u64>()).max(1);
    let mut block: Vec<u64> = Vec::new();
    block
        .try_reserve_exact(words)
        .map_err(|_| WorkloadError::Allocation { bytes })?;
    block.resize(words, 0);

    let mut rng = rand::rng();
    rng.fill(block.as_mut_slice());
    check_stop(stop)?;

    block.sort_unstable();
    check_stop(stop)?;

    let (min, max, sum) = block
        .iter()
        .fold((u64::MAX, 0u64, 0u64), |(lo, hi, s), &v| {
            (lo.min(v), hi.max(v), s.wrapping_add(v))
        });

    // Half the probes are known members so the search path is exercised both ways.
    let probe_hits = (0..PROBE_COUNT)
        .map(|i| {
            if i % 2 == 0 {
                block[rng.random_range(0..words)]
            } else {
                rng.random::<u64>()
            }
        })
        .filter(|p| block.binary_search(p).is_ok())
        .count();

    drop(block);
    Ok(MemoryReport {
        words,
        min,
        max,
        sum,
        probe_hits,
    })
}

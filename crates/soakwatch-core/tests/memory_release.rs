//! The memory workload must hand its block back before returning.
//!
//! A counting global allocator tracks live heap bytes for this test binary.
//! Everything runs in a single test so no other test thread allocates
//! between the measurements.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use soakwatch_core::workload::MemoryWorkload;
use soakwatch_core::workload::memory::run_cycle;
use soakwatch_core::{IntensityLevel, StopSignal, Workload, WorkloadError, WorkloadSpec};

struct Counting;

static LIVE: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            let live = LIVE.fetch_add(layout.size(), Ordering::SeqCst) + layout.size();
            PEAK.fetch_max(live, Ordering::SeqCst);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        LIVE.fetch_sub(layout.size(), Ordering::SeqCst);
    }
}

#[global_allocator]
static ALLOC: Counting = Counting;

/// Thread-local RNG state and similar one-off allocations.
const SLACK: usize = 64 * 1024;

fn live() -> usize {
    LIVE.load(Ordering::SeqCst)
}

fn reset_peak() -> usize {
    let now = live();
    PEAK.store(now, Ordering::SeqCst);
    now
}

#[test]
fn memory_block_released_on_every_exit_path() {
    let spec = WorkloadSpec::for_level(IntensityLevel::Low);
    let stop = StopSignal::new();

    // Warm up the thread-local RNG so it does not count against the run.
    run_cycle(1024, &stop).unwrap();

    // Success: the block was really allocated, then freed.
    let baseline = reset_peak();
    let result = MemoryWorkload.run(&spec, &stop);
    assert!(result.is_success(), "{:?}", result.error);
    drop(result);
    let peak = PEAK.load(Ordering::SeqCst);
    assert!(
        peak >= baseline + spec.memory_block_size,
        "peak {peak} never reached baseline {baseline} + block"
    );
    assert!(
        live() <= baseline + SLACK,
        "{} bytes still live after run",
        live() - baseline
    );

    // Repeated cycles do not accumulate.
    let baseline = reset_peak();
    for _ in 0..5 {
        run_cycle(spec.memory_block_size, &stop).unwrap();
    }
    assert!(live() <= baseline + SLACK);

    // Refused allocation leaves nothing behind.
    let baseline = reset_peak();
    let r = run_cycle(usize::MAX, &stop);
    assert!(matches!(r, Err(WorkloadError::Allocation { .. })));
    assert!(live() <= baseline + SLACK);

    // Cancellation before the block exists.
    let cancelled = StopSignal::new();
    cancelled.stop();
    let baseline = reset_peak();
    let r = run_cycle(spec.memory_block_size, &cancelled);
    assert!(matches!(r, Err(WorkloadError::Cancelled)));
    assert!(live() <= baseline + SLACK);
}

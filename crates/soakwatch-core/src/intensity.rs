//! Intensity tiers and the per-tier workload schedule.
//!
//! The level is resolved exactly once at startup. `auto` is mapped from the
//! host's core count and total memory; explicit levels pass through.
//! [`WorkloadSpec::for_level`] is a pure function of the level and every
//! parameter it produces is strictly increasing with the tier.

use serde::{Deserialize, Serialize};

const MIB: usize = 1024 * 1024;
const KIB: usize = 1024;

/// Stress tier, ordered `Low < Medium < High < Extreme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl IntensityLevel {
    pub const ALL: [IntensityLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Extreme];

    /// Numeric tier, 1 through 4.
    pub fn tier(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Extreme => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }
}

impl std::fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Level requested on the command line: a fixed tier or `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntensityChoice {
    Auto,
    Fixed(IntensityLevel),
}

impl std::str::FromStr for IntensityChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "low" => Ok(Self::Fixed(IntensityLevel::Low)),
            "medium" => Ok(Self::Fixed(IntensityLevel::Medium)),
            "high" => Ok(Self::Fixed(IntensityLevel::High)),
            "extreme" => Ok(Self::Fixed(IntensityLevel::Extreme)),
            other => Err(format!(
                "unknown intensity '{other}' (expected low, medium, high, extreme or auto)"
            )),
        }
    }
}

impl std::fmt::Display for IntensityChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(level) => level.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Map a choice to a concrete level given the host's cores and memory (GB).
///
/// Total over all inputs: zero cores or non-finite memory resolve to `Low`.
pub fn resolve(choice: IntensityChoice, cores: usize, memory_gb: f64) -> IntensityLevel {
    match choice {
        IntensityChoice::Fixed(level) => level,
        IntensityChoice::Auto => auto_level(cores, memory_gb),
    }
}

fn auto_level(cores: usize, memory_gb: f64) -> IntensityLevel {
    if !memory_gb.is_finite() {
        return IntensityLevel::Low;
    }
    if cores >= 8 && memory_gb >= 16.0 {
        IntensityLevel::Extreme
    } else if cores >= 4 && memory_gb >= 8.0 {
        IntensityLevel::High
    } else if cores >= 2 && memory_gb >= 4.0 {
        IntensityLevel::Medium
    } else {
        IntensityLevel::Low
    }
}

/// Host capacity used by `auto` resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HardwareProfile {
    pub cores: usize,
    pub memory_gb: f64,
}

impl HardwareProfile {
    /// Read logical core count and total physical memory.
    pub fn detect() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let memory_gb = sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0);
        Self { cores, memory_gb }
    }

    pub fn resolve(&self, choice: IntensityChoice) -> IntensityLevel {
        resolve(choice, self.cores, self.memory_gb)
    }
}

// ---------------------------------------------------------------------------
// Workload schedule
// ---------------------------------------------------------------------------

/// Parameters handed to every workload for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkloadSpec {
    /// Compute worker threads.
    pub thread_count: usize,
    /// Bytes allocated by the memory workload.
    pub memory_block_size: usize,
    /// Bytes per scratch file.
    pub file_size: usize,
    /// Scratch files per disk cycle.
    pub file_count: usize,
    /// Side of the square matrices multiplied by each compute worker.
    pub matrix_dim: usize,
    /// Recursive Fibonacci depth per compute worker.
    pub fib_depth: u32,
}

impl WorkloadSpec {
    pub fn for_level(level: IntensityLevel) -> Self {
        let tier = level.tier() as usize;
        let shift = tier - 1;
        let (matrix_dim, fib_depth) = match level {
            IntensityLevel::Low => (48, 20),
            IntensityLevel::Medium => (64, 22),
            IntensityLevel::High => (96, 24),
            IntensityLevel::Extreme => (128, 26),
        };
        Self {
            thread_count: 2 * tier,
            memory_block_size: (8 * MIB) << shift,
            file_size: (256 * KIB) << shift,
            file_count: tier,
            matrix_dim,
            fib_depth,
        }
    }
}

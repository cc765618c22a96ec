//! `soakwatch plan`: what `auto` would pick here, and what each tier does.

use soakwatch_core::{HardwareProfile, IntensityChoice, IntensityLevel, WorkloadSpec};

pub fn run(intensity: IntensityChoice) {
    let profile = HardwareProfile::detect();
    let level = profile.resolve(intensity);

    println!("Host:      {} cores, {:.1} GB memory", profile.cores, profile.memory_gb);
    println!("Requested: {intensity}");
    println!("Resolved:  {level}");
    println!();
    print!("{}", tier_table(level));
}

pub fn tier_table(selected: IntensityLevel) -> String {
    let mut out = format!(
        "    {:<8} {:>7} {:>9} {:>6} {:>9} {:>6} {:>4}\n",
        "LEVEL", "THREADS", "MEM MiB", "FILES", "FILE KiB", "MATRIX", "FIB"
    );
    for level in IntensityLevel::ALL {
        let spec = WorkloadSpec::for_level(level);
        let marker = if level == selected { "▸" } else { " " };
        out.push_str(&format!(
            "  {marker} {:<8} {:>7} {:>9} {:>6} {:>9} {:>6} {:>4}\n",
            level.name(),
            spec.thread_count,
            spec.memory_block_size / (1024 * 1024),
            spec.file_count,
            spec.file_size / 1024,
            spec.matrix_dim,
            spec.fib_depth
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_table_marks_selection() {
        let table = tier_table(IntensityLevel::High);
        assert_eq!(table.lines().count(), 5);
        let marked: Vec<_> = table.lines().filter(|l| l.contains('▸')).collect();
        assert_eq!(marked.len(), 1);
        assert!(marked[0].contains("high"));
    }
}

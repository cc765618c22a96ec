//! `soakwatch stress`: run the workload family without any monitoring.

use std::path::{Path, PathBuf};

use soakwatch_core::{
    HardwareProfile, IntensityChoice, StopSignal, WorkloadFamily, WorkloadKind, WorkloadSpec,
};

pub fn run(intensity: IntensityChoice, rounds: u32, scratch_dir: Option<&Path>) {
    crate::logging::init_stderr();

    let level = HardwareProfile::detect().resolve(intensity);
    let spec = WorkloadSpec::for_level(level);

    // Keeps the temp dir alive for the whole command.
    let (dir, _guard): (PathBuf, Option<tempfile::TempDir>) = match scratch_dir {
        Some(d) => {
            if let Err(e) = std::fs::create_dir_all(d) {
                eprintln!("Error creating scratch dir {}: {e}", d.display());
                std::process::exit(1);
            }
            (d.to_path_buf(), None)
        }
        None => match tempfile::Builder::new().prefix("soakwatch-").tempdir() {
            Ok(t) => (t.path().to_path_buf(), Some(t)),
            Err(e) => {
                eprintln!("Error creating scratch dir: {e}");
                std::process::exit(1);
            }
        },
    };

    let stop = StopSignal::new();
    let s = stop.clone();
    ctrlc::set_handler(move || {
        s.stop();
    })
    .expect("Error setting Ctrl+C handler");

    let family = WorkloadFamily::standard(&dir);
    println!("Stress: {level} x {rounds} round(s), scratch {}", dir.display());
    println!(
        "  {} threads, {} MiB memory block, {} x {} KiB files",
        spec.thread_count,
        spec.memory_block_size / (1024 * 1024),
        spec.file_count,
        spec.file_size / 1024
    );
    println!();

    let mut failures = 0u32;
    for round in 1..=rounds {
        if stop.is_stopped() {
            break;
        }
        let results = family.run_all(&spec, &stop);
        println!("Round {round}/{rounds}");
        for (kind, r) in &results {
            println!("{}", result_line(*kind, r));
            if !r.is_success() {
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("\n{failures} workload run(s) failed");
        std::process::exit(1);
    }
}

fn result_line(kind: WorkloadKind, r: &soakwatch_core::StressResult) -> String {
    let text = if r.is_success() {
        r.detail.clone()
    } else {
        format!("FAILED: {}", r.error.as_deref().unwrap_or("unknown"))
    };
    format!(
        "  {:<8} {:>7.2}s  {text}",
        kind.to_string(),
        r.duration.as_secs_f64()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use soakwatch_core::StressResult;
    use std::time::Duration;

    #[test]
    fn test_result_line() {
        let ok = result_line(
            WorkloadKind::Memory,
            &StressResult::success(Duration::from_millis(1500), "8 MiB sorted"),
        );
        assert!(ok.contains("memory"));
        assert!(ok.contains("1.50s"));
        assert!(ok.ends_with("8 MiB sorted"));

        let bad = result_line(
            WorkloadKind::Disk,
            &StressResult::failed(Duration::ZERO, "no space left"),
        );
        assert!(bad.ends_with("FAILED: no space left"));
    }
}

//! `soakwatch run`: the soak itself.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use soakwatch_core::{
    ChannelSink, ConfigError, HardwareProfile, IntensityLevel, Orchestrator, RunConfig, RunInfo,
    RunStats, RunSummary, Sink, StopSignal, TickLog, file_stamp, format_utc,
};

use super::{exit_config, roster_or_default};
use crate::RunArgs;
use crate::plain::PlainView;
use crate::tui::app::{App, RunHeader};

/// Snapshots buffered between the tick loop and the dashboard.
const VIEW_CHANNEL_CAPACITY: usize = 64;

pub fn build_config(args: &RunArgs) -> Result<RunConfig, ConfigError> {
    let config = RunConfig {
        duration: args.duration,
        interval: args.interval,
        intensity: args.intensity,
        stress: !args.no_stress,
        network: !args.no_network,
        log_dir: args.log_dir.clone(),
        log_path: args.log.clone(),
        source_timeout: args.timeout,
        probe_wait: args.probe_wait,
        probe_cache_ttl: args.probe_cache,
        scratch_dir: args.scratch_dir.clone(),
        disk_path: args.disk_path.clone(),
        can_interface: args.can_interface.clone(),
        roster: roster_or_default(args.roster.as_deref())?,
    };
    config.validate()?;
    Ok(config)
}

/// `<csv stem>_summary.json` next to the CSV log.
pub fn summary_path(csv: &Path) -> PathBuf {
    let stem = csv
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "soak".into());
    csv.with_file_name(format!("{stem}_summary.json"))
}

#[allow(clippy::too_many_lines)]
pub fn run(args: RunArgs) {
    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => exit_config(&e),
    };

    let started = SystemTime::now();
    let stamp = file_stamp(started);
    let csv = config.resolved_log_path(&stamp);
    let summary_json = summary_path(&csv);
    let use_tui = !args.no_tui && std::io::stdout().is_terminal();

    if let Some(dir) = csv.parent().filter(|p| !p.as_os_str().is_empty())
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("Error creating log directory {}: {e}", dir.display());
        std::process::exit(1);
    }

    let text_log = config.log_dir.join(format!("soakwatch_{stamp}.log"));
    if use_tui {
        crate::logging::init_file(&text_log);
    } else {
        crate::logging::init_stderr();
    }

    let profile = HardwareProfile::detect();
    let level = profile.resolve(config.intensity);
    log::info!(
        "host: {} cores, {:.1} GB; intensity {} -> {level}",
        profile.cores,
        profile.memory_gb,
        config.intensity
    );

    let mut orch = match Orchestrator::from_config(&config, level) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error preparing workloads: {e}");
            std::process::exit(1);
        }
    };

    let stop = StopSignal::new();
    let s = stop.clone();
    ctrlc::set_handler(move || {
        s.stop();
    })
    .expect("Error setting Ctrl+C handler");

    let info = RunInfo {
        started_at: format_utc(started),
        duration_secs: config.duration.as_secs_f64(),
        interval_secs: config.interval.as_secs_f64(),
        level,
        stress: config.stress,
        csv_log: csv.clone(),
    };
    let mut sinks: Vec<Box<dyn Sink>> = vec![
        Box::new(TickLog::new(&csv)),
        Box::new(RunStats::new(&summary_json, info)),
    ];

    print_banner(&config, level, &csv, use_tui.then_some(text_log.as_path()));

    let summary = if use_tui {
        let (channel, rx) = ChannelSink::bounded(VIEW_CHANNEL_CAPACITY);
        sinks.push(Box::new(channel));
        let header = RunHeader {
            level,
            interval: config.interval,
            duration: config.duration,
            planned_ticks: config.planned_ticks(),
            stress: config.stress,
            csv_log: csv.clone(),
        };

        let worker_stop = stop.clone();
        let worker = std::thread::Builder::new()
            .name("soak-orchestrator".into())
            .spawn(move || orch.run(&mut sinks, &worker_stop));
        let worker = match worker {
            Ok(h) => h,
            Err(e) => {
                eprintln!("Error starting tick loop: {e}");
                std::process::exit(1);
            }
        };

        let mut app = App::new(rx, stop.clone(), header);
        if let Err(e) = app.run() {
            stop.stop();
            eprintln!("Dashboard error: {e}");
        }

        match worker.join() {
            Ok(summary) => summary,
            Err(_) => {
                eprintln!("Error: tick loop panicked");
                std::process::exit(1);
            }
        }
    } else {
        sinks.push(Box::new(PlainView::new(std::io::stdout())));
        orch.run(&mut sinks, &stop)
    };

    print_summary(&summary, &csv, &summary_json);
}

fn print_banner(config: &RunConfig, level: IntensityLevel, csv: &Path, text_log: Option<&Path>) {
    println!("soakwatch run");
    println!("  Duration:  {:.0}s", config.duration.as_secs_f64());
    println!("  Interval:  {}ms", config.interval.as_millis());
    println!(
        "  Intensity: {level}{}",
        if config.stress { "" } else { " (stress disabled)" }
    );
    println!(
        "  Network:   {}",
        if config.network {
            format!("{} endpoints", config.roster.len())
        } else {
            "disabled".to_string()
        }
    );
    println!("  CAN:       {}", config.can_interface);
    println!("  CSV log:   {}", csv.display());
    if let Some(p) = text_log {
        println!("  Text log:  {}", p.display());
    }
    println!();
}

fn print_summary(summary: &RunSummary, csv: &Path, summary_json: &Path) {
    println!();
    println!(
        "Run {} after {:.1}s",
        if summary.stopped_early {
            "stopped"
        } else {
            "finished"
        },
        summary.elapsed.as_secs_f64()
    );
    println!("  Ticks:          {}", summary.ticks);
    if summary.skipped_slots > 0 {
        println!("  Skipped slots:  {}", summary.skipped_slots);
    }
    let f = &summary.failures;
    println!(
        "  Failures:       bus {}  probes {}  resources {}  stress {}",
        f.bus, f.probes, f.resources, f.stress
    );
    for (sink, n) in &summary.sink_failures {
        println!("  Sink errors:    {sink} x{n}");
    }
    println!("  CSV log:        {}", csv.display());
    println!("  Summary:        {}", summary_json.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use soakwatch_core::{IntensityChoice, IntensityLevel};
    use std::time::Duration;

    fn parse(argv: &[&str]) -> RunArgs {
        match crate::Cli::try_parse_from(argv).unwrap().command {
            crate::Commands::Run(args) => args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = build_config(&parse(&["soakwatch", "run"])).unwrap();
        assert_eq!(cfg.duration, Duration::from_secs(300));
        assert_eq!(cfg.interval, Duration::from_secs(2));
        assert_eq!(cfg.intensity, IntensityChoice::Fixed(IntensityLevel::Medium));
        assert!(cfg.stress);
        assert!(cfg.network);
        assert_eq!(cfg.roster.len(), 11);
        assert_eq!(cfg.probe_cache_ttl, Duration::ZERO);
    }

    #[test]
    fn test_flags_flow_into_config() {
        let args = parse(&[
            "soakwatch",
            "run",
            "--duration",
            "10m",
            "--interval",
            "500ms",
            "--intensity",
            "auto",
            "--no-stress",
            "--no-network",
            "--log",
            "out/run.csv",
            "--can-interface",
            "vcan0",
        ]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.duration, Duration::from_secs(600));
        assert_eq!(cfg.interval, Duration::from_millis(500));
        assert_eq!(cfg.intensity, IntensityChoice::Auto);
        assert!(!cfg.stress);
        assert!(!cfg.network);
        assert_eq!(cfg.can_interface, "vcan0");
        assert_eq!(cfg.resolved_log_path("x"), PathBuf::from("out/run.csv"));
    }

    #[test]
    fn test_zero_interval_is_config_error() {
        let args = parse(&["soakwatch", "run", "--interval", "0s"]);
        assert!(matches!(build_config(&args), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn test_bad_values_rejected_by_parser() {
        assert!(crate::Cli::try_parse_from(["soakwatch", "run", "--intensity", "max"]).is_err());
        assert!(crate::Cli::try_parse_from(["soakwatch", "run", "--duration", "soon"]).is_err());
    }

    #[test]
    fn test_summary_path() {
        assert_eq!(
            summary_path(Path::new("logs/soak_20260101_000000.csv")),
            PathBuf::from("logs/soak_20260101_000000_summary.json")
        );
    }
}

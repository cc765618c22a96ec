//! CLI for soakwatch: watch a machine cook, and cook it on purpose.

mod commands;
mod logging;
mod plain;
mod tui;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use soakwatch_core::IntensityChoice;

#[derive(Parser)]
#[command(name = "soakwatch")]
#[command(about = "soakwatch: bus temperatures, roster reachability and host load under tiered synthetic stress")]
#[command(version = soakwatch_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a soak: sample every interval, stress the host, log every tick
    Run(RunArgs),

    /// Print the endpoint roster that would be probed
    Roster {
        /// JSON roster file (defaults to the built-in reference roster)
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Take one snapshot of every source (no stress) and print it
    Sample {
        /// SocketCAN interface carrying the temperature frame
        #[arg(long, default_value = "can0")]
        can_interface: String,

        /// JSON roster file (defaults to the built-in reference roster)
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Skip reachability probes
        #[arg(long)]
        no_network: bool,

        /// Per-source timeout, e.g. 5s or 500ms
        #[arg(long, default_value = "5s", value_parser = commands::duration_arg)]
        timeout: Duration,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the workload family on its own for a few rounds
    Stress {
        /// Intensity: low, medium, high, extreme or auto
        #[arg(long, default_value = "auto", value_parser = commands::intensity_arg)]
        intensity: IntensityChoice,

        /// Number of rounds
        #[arg(long, default_value = "3")]
        rounds: u32,

        /// Directory for disk workload scratch files (defaults to a temp dir)
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },

    /// Show the detected hardware, the resolved level and the per-tier schedule
    Plan {
        /// Intensity: low, medium, high, extreme or auto
        #[arg(long, default_value = "auto", value_parser = commands::intensity_arg)]
        intensity: IntensityChoice,
    },

    /// Temperature statistics (extremes, mean, spread) from a run's CSV log
    Report {
        /// CSV tick log written by `soakwatch run`
        csv: PathBuf,

        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Options for `soakwatch run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Total run time, e.g. 300s, 10m, 2h
    #[arg(long, default_value = "300s", value_parser = commands::duration_arg)]
    duration: Duration,

    /// Time between ticks, e.g. 2s, 500ms
    #[arg(long, default_value = "2s", value_parser = commands::duration_arg)]
    interval: Duration,

    /// Intensity: low, medium, high, extreme or auto
    #[arg(long, default_value = "medium", value_parser = commands::intensity_arg)]
    intensity: IntensityChoice,

    /// CSV tick log path (defaults to <log-dir>/soak_<timestamp>.csv)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Directory for the CSV log, run summary and text log
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Monitor only; do not run stress workloads
    #[arg(long)]
    no_stress: bool,

    /// Skip reachability probes
    #[arg(long)]
    no_network: bool,

    /// Per-source timeout within a tick
    #[arg(long, default_value = "5s", value_parser = commands::duration_arg)]
    timeout: Duration,

    /// Reuse probe results for this long (0 probes every tick)
    #[arg(long, default_value = "0s", value_parser = commands::duration_arg)]
    probe_cache: Duration,

    /// How long ping waits for a reply
    #[arg(long, default_value = "3s", value_parser = commands::duration_arg)]
    probe_wait: Duration,

    /// Directory for disk workload scratch files (defaults to a temp dir)
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Filesystem whose usage is reported as disk %
    #[arg(long, default_value = "/")]
    disk_path: PathBuf,

    /// SocketCAN interface carrying the temperature frame
    #[arg(long, default_value = "can0")]
    can_interface: String,

    /// JSON roster file (defaults to the built-in reference roster)
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Print one line per tick instead of the live dashboard
    #[arg(long)]
    no_tui: bool,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Roster { roster, json } => commands::roster::run(roster.as_deref(), json),
        Commands::Sample {
            can_interface,
            roster,
            no_network,
            timeout,
            json,
        } => commands::sample::run(commands::sample::SampleCommandConfig {
            can_interface: &can_interface,
            roster_path: roster.as_deref(),
            network: !no_network,
            timeout,
            json,
        }),
        Commands::Stress {
            intensity,
            rounds,
            scratch_dir,
        } => commands::stress::run(intensity, rounds, scratch_dir.as_deref()),
        Commands::Plan { intensity } => commands::plan::run(intensity),
        Commands::Report { csv, json } => commands::report::run(&csv, json),
    }
}

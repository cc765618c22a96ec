//! `soakwatch sample`: one tick against the real sources, no stress.

use std::path::Path;
use std::time::Duration;

use soakwatch_core::{
    IntensityLevel, Orchestrator, RunConfig, Sources, StopSignal, WorkloadFamily,
};

use super::{exit_config, roster_or_default};
use crate::plain::tick_line;

pub struct SampleCommandConfig<'a> {
    pub can_interface: &'a str,
    pub roster_path: Option<&'a Path>,
    pub network: bool,
    pub timeout: Duration,
    pub json: bool,
}

pub fn run(cmd: SampleCommandConfig<'_>) {
    crate::logging::init_stderr();

    let roster = match roster_or_default(cmd.roster_path) {
        Ok(r) => r,
        Err(e) => exit_config(&e),
    };
    let config = RunConfig {
        stress: false,
        network: cmd.network,
        source_timeout: cmd.timeout,
        can_interface: cmd.can_interface.to_string(),
        roster,
        ..Default::default()
    };
    if let Err(e) = config.validate() {
        exit_config(&e);
    }

    let mut orch = Orchestrator::new(
        &config,
        IntensityLevel::Low,
        Sources::system(&config),
        WorkloadFamily::new(),
    );
    let snapshot = orch.tick(&StopSignal::new());

    if cmd.json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("{}", tick_line(&snapshot));
    if let Some(err) = &snapshot.bus.error {
        println!("  bus:       {err}");
    }
    if let Some(err) = &snapshot.resources.error {
        println!("  resources: {err}");
    }
    if !snapshot.reachability.is_empty() {
        println!();
        for ep in &snapshot.reachability {
            let latency = ep
                .latency_ms
                .map(|ms| format!("{ms:.1} ms"))
                .unwrap_or_else(|| "—".into());
            println!(
                "  {:<18} {:<16} {:<8} {latency}",
                ep.id, ep.address, ep.status
            );
        }
    }
    println!();
    println!("  assembled in {:.0}ms", snapshot.assembly_time.as_secs_f64() * 1000.0);
}

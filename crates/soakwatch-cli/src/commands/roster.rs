//! `soakwatch roster`: show the endpoints a run would probe.

use std::path::Path;

use soakwatch_core::EndpointSpec;

use super::{exit_config, roster_or_default};

pub fn run(path: Option<&Path>, json: bool) {
    let roster = match roster_or_default(path) {
        Ok(r) => r,
        Err(e) => exit_config(&e),
    };

    if json {
        match serde_json::to_string_pretty(&roster) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let source = path.map_or_else(|| "built-in".to_string(), |p| p.display().to_string());
    println!("Roster ({source}): {} endpoints", roster.len());
    println!();
    print!("{}", roster_table(&roster));
}

pub fn roster_table(roster: &[EndpointSpec]) -> String {
    let mut out = format!("  {:<18} {:<9} {}\n", "ID", "KIND", "ADDRESS");
    out.push_str(&format!("  {}\n", "─".repeat(44)));
    for ep in roster {
        out.push_str(&format!("  {:<18} {:<9} {}\n", ep.id, ep.category, ep.address));
    }
    out
}

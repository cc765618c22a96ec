//! One line per tick on stdout, for `--no-tui` and non-interactive terminals.

use std::io::Write;
use std::sync::Arc;

use soakwatch_core::{Sink, SinkError, Snapshot, format_utc};

use crate::commands::{fmt_pct, fmt_temp};

pub struct PlainView<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> PlainView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Render one tick as a single line.
pub fn tick_line(s: &Snapshot) -> String {
    let stress = if s.stress.is_empty() {
        "stress off".to_string()
    } else {
        format!(
            "stress {}/{} ok",
            s.stress.len() - s.stress_failures(),
            s.stress.len()
        )
    };
    format!(
        "[{:>4}] {}  cpu {} s1 {} s2 {} | cpu {} mem {} disk {} | net {}/{} | {}",
        s.tick,
        format_utc(s.tick_time),
        fmt_temp(s.resources.cpu_temp_c),
        fmt_temp(s.bus.sensor1_c),
        fmt_temp(s.bus.sensor2_c),
        fmt_pct(s.resources.cpu_pct),
        fmt_pct(s.resources.mem_pct),
        fmt_pct(s.resources.disk_pct),
        s.up_count(),
        s.endpoint_count(),
        stress,
    )
}

impl<W: Write + Send> Sink for PlainView<W> {
    fn name(&self) -> &str {
        "plain_view"
    }

    fn consume(&mut self, snapshot: &Arc<Snapshot>) -> Result<(), SinkError> {
        writeln!(self.out, "{}", tick_line(snapshot))?;
        for ep in snapshot.reachability.iter().filter(|e| !e.up()) {
            writeln!(self.out, "       {:<16} {:<15} {}", ep.id, ep.address, ep.status)?;
        }
        for (kind, r) in snapshot.stress.iter().filter(|(_, r)| !r.is_success()) {
            writeln!(
                self.out,
                "       stress {kind} failed: {}",
                r.error.as_deref().unwrap_or("unknown")
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soakwatch_core::{
        BusSample, EndpointCategory, EndpointSpec, EndpointStatus, IntensityLevel, LinkStatus,
        ResourceReading, ResourceSample, StressResult, WorkloadKind,
    };
    use std::collections::BTreeMap;
    use std::time::{Duration, UNIX_EPOCH};

    fn snapshot() -> Snapshot {
        let radar = EndpointSpec::new("radar_front", "192.168.1.20", EndpointCategory::Radar);
        let mut stress = BTreeMap::new();
        stress.insert(
            WorkloadKind::Compute,
            StressResult::success(Duration::from_millis(40), "ok"),
        );
        stress.insert(
            WorkloadKind::Disk,
            StressResult::failed(Duration::from_millis(5), "disk full"),
        );
        Snapshot {
            tick: 7,
            tick_time: UNIX_EPOCH + Duration::from_secs(1_767_225_600),
            level: IntensityLevel::Low,
            bus: BusSample::failed("can0 not found"),
            reachability: vec![EndpointStatus::failed(&radar, LinkStatus::Timeout, "timed out")],
            resources: ResourceSample::from_reading(ResourceReading {
                cpu_pct: 12.5,
                mem_pct: 40.0,
                disk_pct: 70.0,
                cpu_temp_c: 48.0,
            }),
            stress,
            assembly_time: Duration::from_millis(60),
        }
    }

    #[test]
    fn test_tick_line() {
        let line = tick_line(&snapshot());
        assert!(line.starts_with("[   7] 2026-01-01 00:00:00"), "{line}");
        assert!(line.contains("cpu 48.0°C s1 no data s2 no data"));
        assert!(line.contains("net 0/1"));
        assert!(line.contains("stress 1/2 ok"));
    }

    #[test]
    fn test_consume_lists_failures() {
        let mut view = PlainView::new(Vec::new());
        view.consume(&Arc::new(snapshot())).unwrap();
        let text = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("radar_front"));
        assert!(text.contains("TIMEOUT"));
        assert!(text.contains("stress disk failed: disk full"));
    }
}

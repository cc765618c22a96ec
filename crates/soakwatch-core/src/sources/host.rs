//! Host resource counters via `sysinfo`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sysinfo::{Components, Disks, System};

use crate::snapshot::{ResourceReading, TEMP_SENTINEL_C, UTIL_SENTINEL};
use crate::source::{ResourceSource, SourceError};

/// Sensor labels tried in order before falling back to the first component.
const PREFERRED_CPU_SENSORS: &[&str] = &["coretemp", "cpu_thermal"];

/// Samples global CPU %, memory %, usage of the disk holding `disk_path`,
/// and CPU temperature.
pub struct HostResources {
    disk_path: PathBuf,
    sys: Mutex<System>,
}

impl HostResources {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        let mut sys = System::new();
        // CPU usage is a delta between refreshes; prime the first one.
        sys.refresh_cpu_usage();
        Self {
            disk_path: disk_path.into(),
            sys: Mutex::new(sys),
        }
    }

    /// Path whose filesystem the disk percentage describes.
    pub fn disk_path(&self) -> &Path {
        &self.disk_path
    }
}

impl Default for HostResources {
    fn default() -> Self {
        Self::new("/")
    }
}

impl ResourceSource for HostResources {
    fn name(&self) -> &str {
        "host"
    }

    fn sample(&self) -> Result<ResourceReading, SourceError> {
        let (cpu_pct, mem_pct) = {
            let mut sys = self
                .sys
                .lock()
                .map_err(|_| SourceError::Io("sysinfo lock poisoned".into()))?;
            sys.refresh_cpu_usage();
            sys.refresh_memory();
            let cpu = f64::from(sys.global_cpu_info().cpu_usage());
            let mem = percent(
                sys.total_memory().saturating_sub(sys.available_memory()),
                sys.total_memory(),
            );
            (cpu, mem)
        };

        let disks = Disks::new_with_refreshed_list();
        let disk_pct = disks
            .list()
            .iter()
            .filter(|d| self.disk_path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| {
                percent(
                    d.total_space().saturating_sub(d.available_space()),
                    d.total_space(),
                )
            })
            .unwrap_or(UTIL_SENTINEL);

        let components = Components::new_with_refreshed_list();
        let labelled: Vec<(String, f64)> = components
            .list()
            .iter()
            .map(|c| (c.label().to_string(), f64::from(c.temperature())))
            .collect();
        let cpu_temp_c = pick_cpu_temperature(&labelled);

        if !cpu_pct.is_finite() {
            return Err(SourceError::Decode("CPU usage is not finite".into()));
        }
        Ok(ResourceReading {
            cpu_pct,
            mem_pct,
            disk_pct,
            cpu_temp_c,
        })
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return UTIL_SENTINEL;
    }
    used as f64 / total as f64 * 100.0
}

/// Choose the CPU temperature from `(label, celsius)` pairs.
///
/// Labels containing `coretemp` win, then `cpu_thermal`, then the first
/// component with a finite reading. No usable sensor yields the sentinel.
pub fn pick_cpu_temperature(components: &[(String, f64)]) -> f64 {
    let usable = |t: &f64| t.is_finite();
    for preferred in PREFERRED_CPU_SENSORS {
        let hit = components
            .iter()
            .filter(|(label, _)| label.to_ascii_lowercase().contains(preferred))
            .map(|(_, t)| *t)
            .find(usable);
        if let Some(t) = hit {
            return t;
        }
    }
    components
        .iter()
        .map(|(_, t)| *t)
        .find(usable)
        .unwrap_or(TEMP_SENTINEL_C)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comps(list: &[(&str, f64)]) -> Vec<(String, f64)> {
        list.iter().map(|(l, t)| (l.to_string(), *t)).collect()
    }

    #[test]
    fn test_prefers_coretemp() {
        let c = comps(&[("acpitz", 30.0), ("cpu_thermal", 50.0), ("coretemp Package id 0", 61.0)]);
        assert_eq!(pick_cpu_temperature(&c), 61.0);
    }

    #[test]
    fn test_falls_back_to_cpu_thermal() {
        let c = comps(&[("acpitz", 30.0), ("cpu_thermal", 50.0)]);
        assert_eq!(pick_cpu_temperature(&c), 50.0);
    }

    #[test]
    fn test_falls_back_to_first_component() {
        let c = comps(&[("nvme Composite", f64::NAN), ("acpitz", 30.0)]);
        assert_eq!(pick_cpu_temperature(&c), 30.0);
    }

    #[test]
    fn test_no_sensors_is_sentinel() {
        assert_eq!(pick_cpu_temperature(&[]), TEMP_SENTINEL_C);
    }

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(percent(5, 0), UTIL_SENTINEL);
        assert_eq!(percent(50, 200), 25.0);
    }

    #[test]
    fn test_sample_ranges() {
        let host = HostResources::default();
        let r = host.sample().unwrap();
        assert!((0.0..=100.0).contains(&r.mem_pct) || r.mem_pct == UTIL_SENTINEL);
        assert!(r.cpu_pct >= 0.0);
        assert_eq!(host.disk_path(), Path::new("/"));
    }
}

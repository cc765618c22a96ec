//! ICMP reachability via the system `ping` binary.

use std::process::{Command, Stdio};
use std::time::Duration;

use crate::roster::EndpointSpec;
use crate::source::{ProbeResult, Prober, SourceError};

/// Sends one echo request per probe with `ping -c 1 -W <secs>`.
pub struct PingProber {
    wait: Duration,
}

impl PingProber {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }

    fn wait_secs(&self) -> u64 {
        self.wait.as_secs().max(1)
    }
}

impl Default for PingProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl Prober for PingProber {
    fn name(&self) -> &str {
        "ping"
    }

    fn probe(&self, endpoint: &EndpointSpec) -> Result<ProbeResult, SourceError> {
        let output = Command::new("ping")
            .args(["-c", "1", "-W"])
            .arg(self.wait_secs().to_string())
            .arg(&endpoint.address)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    SourceError::Unavailable("ping binary not found".into())
                }
                _ => SourceError::from(e),
            })?;

        if !output.status.success() {
            return Ok(ProbeResult::down());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(ProbeResult {
            up: true,
            latency_ms: parse_ping_latency(&stdout),
        })
    }
}

/// Extract the round-trip time from the first `time=` field in ping output.
///
/// Handles both `time=0.412 ms` and `time<1ms` styles.
pub fn parse_ping_latency(output: &str) -> Option<f64> {
    for line in output.lines() {
        let Some(idx) = line.find("time=").or_else(|| line.find("time<")) else {
            continue;
        };
        let rest = &line[idx + 5..];
        let end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if let Ok(v) = rest[..end].parse::<f64>() {
            return Some(v);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linux_output() {
        let out = "PING 10.7.5.152 (10.7.5.152) 56(84) bytes of data.\n\
                   64 bytes from 10.7.5.152: icmp_seq=1 ttl=64 time=0.412 ms\n\n\
                   --- 10.7.5.152 ping statistics ---\n";
        assert_eq!(parse_ping_latency(out), Some(0.412));
    }

    #[test]
    fn test_parse_sub_millisecond_marker() {
        let out = "Reply from 192.168.11.9: bytes=32 time<1ms TTL=64";
        assert_eq!(parse_ping_latency(out), Some(1.0));
    }

    #[test]
    fn test_parse_no_time() {
        assert_eq!(parse_ping_latency("Request timed out."), None);
        assert_eq!(parse_ping_latency(""), None);
    }

    #[test]
    fn test_wait_is_at_least_one_second() {
        assert_eq!(PingProber::new(Duration::from_millis(200)).wait_secs(), 1);
        assert_eq!(PingProber::new(Duration::from_secs(3)).wait_secs(), 3);
    }

    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_probe_loopback() {
        let ep = EndpointSpec::new("lo", "127.0.0.1", crate::roster::EndpointCategory::Compute);
        let r = PingProber::default().probe(&ep).unwrap();
        assert!(r.up);
    }
}

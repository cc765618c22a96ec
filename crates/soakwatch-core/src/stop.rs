//! Cooperative cancellation token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const POLL_STEP: Duration = Duration::from_millis(10);

/// Cloneable stop flag shared by the run loop, the workloads and whatever
/// raises it (Ctrl+C handler, the live view's quit key).
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Sleep until `deadline` or until the signal is raised.
    /// Returns `true` if the signal was raised.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if self.is_stopped() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep((deadline - now).min(POLL_STEP));
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let a = StopSignal::new();
        let b = a.clone();
        assert!(!b.is_stopped());
        a.stop();
        assert!(b.is_stopped());
    }

    #[test]
    fn test_wait_times_out() {
        let s = StopSignal::new();
        let t0 = Instant::now();
        assert!(!s.wait_timeout(Duration::from_millis(30)));
        assert!(t0.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_returns_early_on_stop() {
        let s = StopSignal::new();
        let s2 = s.clone();
        let h = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            s2.stop();
        });
        let t0 = Instant::now();
        assert!(s.wait_timeout(Duration::from_secs(5)));
        assert!(t0.elapsed() < Duration::from_secs(2));
        h.join().unwrap();
    }
}

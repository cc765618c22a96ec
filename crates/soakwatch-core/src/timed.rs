//! Deadline-bounded source calls.
//!
//! A [`CallSlot`] runs one adapter call at a time on a background thread and
//! hands back a [`PendingCall`] that the orchestrator waits on against a
//! deadline. A call that outlives its deadline keeps the slot busy until it
//! finally returns, and further calls on that slot fail fast with
//! [`SourceError::Busy`] instead of piling up threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::source::SourceError;

/// Clears the busy flag when the worker finishes, including on panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Serializes calls to one adapter (or one endpoint).
pub struct CallSlot {
    name: String,
    busy: Arc<AtomicBool>,
}

impl CallSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start `call` on a background thread with the given deadline.
    pub fn start<T, F>(&self, deadline: Instant, call: F) -> PendingCall<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, SourceError> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("{}: previous call still running", self.name);
            return PendingCall::ready(Err(SourceError::Busy));
        }

        let (tx, rx) = mpsc::channel();
        let guard = BusyGuard(Arc::clone(&self.busy));
        let spawned = std::thread::Builder::new()
            .name(format!("src-{}", self.name))
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(call))
                    .unwrap_or(Err(SourceError::Panicked));
                drop(guard);
                let _ = tx.send(result);
            });

        match spawned {
            Ok(_) => PendingCall {
                state: PendingState::Running { rx },
                deadline,
                started: Instant::now(),
            },
            // The closure (and its guard) was dropped, so the slot is free again.
            Err(e) => PendingCall::ready(Err(e.into())),
        }
    }
}

enum PendingState<T> {
    Ready(Result<T, SourceError>),
    Running {
        rx: mpsc::Receiver<Result<T, SourceError>>,
    },
}

/// Handle to an in-flight call.
pub struct PendingCall<T> {
    state: PendingState<T>,
    deadline: Instant,
    started: Instant,
}

impl<T> PendingCall<T> {
    fn ready(result: Result<T, SourceError>) -> Self {
        let now = Instant::now();
        Self {
            state: PendingState::Ready(result),
            deadline: now,
            started: now,
        }
    }

    /// Block until the call returns or the deadline passes.
    pub fn wait(self) -> Result<T, SourceError> {
        match self.state {
            PendingState::Ready(result) => result,
            PendingState::Running { rx } => {
                let remaining = self.deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(remaining) {
                    Ok(result) => result,
                    Err(mpsc::RecvTimeoutError::Timeout) => Err(SourceError::Timeout(
                        self.deadline
                            .saturating_duration_since(self.started)
                            .as_millis() as u64,
                    )),
                    Err(mpsc::RecvTimeoutError::Disconnected) => Err(SourceError::Panicked),
                }
            }
        }
    }
}

/// Convenience for callers that only have a timeout.
pub fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout
}

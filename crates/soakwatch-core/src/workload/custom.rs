//! Caller-supplied workload.

use super::{Workload, WorkloadError, WorkloadKind};
use crate::intensity::WorkloadSpec;
use crate::stop::StopSignal;

type CustomFn =
    dyn Fn(&WorkloadSpec, &StopSignal) -> Result<String, WorkloadError> + Send + Sync;

/// Wraps a closure so it runs under the same timing and failure contract
/// as the built-in workloads.
pub struct CustomWorkload {
    name: String,
    body: Box<CustomFn>,
}

impl CustomWorkload {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&WorkloadSpec, &StopSignal) -> Result<String, WorkloadError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    /// A workload that does nothing and always succeeds.
    pub fn noop() -> Self {
        Self::new("noop", |_, _| Ok("idle".to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Workload for CustomWorkload {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Custom
    }

    fn execute(&self, spec: &WorkloadSpec, stop: &StopSignal) -> Result<String, WorkloadError> {
        (self.body)(spec, stop)
    }
}

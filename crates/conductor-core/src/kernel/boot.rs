use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::kernel::constants::BOOT_COMPLETED_MARKER_VALUE;

/// Synchronous view of the system readiness state.
///
/// Used once, before the first startup pass, so that a readiness signal that
/// was broadcast before the orchestrator existed is not waited for forever.
pub trait ReadinessProbe: Send + Sync + Debug {
    fn boot_completed(&self) -> bool;
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticReadiness(pub bool);

impl ReadinessProbe for StaticReadiness {
    fn boot_completed(&self) -> bool {
        self.0
    }
}

/// Probe reading a marker file that the platform sets to `"1"` when booted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFileProbe {
    path: PathBuf,
}

impl MarkerFileProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadinessProbe for MarkerFileProbe {
    fn boot_completed(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(contents) => contents.trim() == BOOT_COMPLETED_MARKER_VALUE,
            Err(e) => {
                // A missing marker just means "not yet".
                log::debug!("Readiness marker {} unreadable: {}", self.path.display(), e);
                false
            }
        }
    }
}

/// Monotonic `false -> true` record of the readiness signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootPhaseTracker {
    completed: bool,
}

impl BootPhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Apply the readiness signal. Returns `true` only on the first call.
    pub fn mark_completed(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        true
    }

    /// Adopt completion reported by `probe`, if any. Returns `true` when the
    /// tracker flipped because of this call.
    pub fn adopt_if_ready(&mut self, probe: &dyn ReadinessProbe) -> bool {
        if self.completed || !probe.boot_completed() {
            return false;
        }
        log::info!("Boot already completed before the readiness signal was observed");
        self.mark_completed()
    }
}

//! Slow-start diagnostics.
//!
//! Purely observational: nothing here changes control flow. Durations above
//! the trace threshold produce a timing record (and a boot event line when a
//! boot event log is configured); durations above the warn threshold also
//! produce a warning naming the service.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::kernel::constants::{BOOT_TIMING_TARGET, DEFAULT_TRACE_AFTER_MS, DEFAULT_WARN_AFTER_MS};

/// Which lifecycle step a timing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedStep {
    /// Construction plus `start()`.
    Start,
    /// Everything done for one slot while processing the readiness signal.
    BootCompleted,
}

/// How a measured duration was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimingSeverity {
    Normal,
    Traced,
    Slow,
}

/// One measured lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTiming {
    pub service: String,
    pub step: TimedStep,
    pub elapsed: Duration,
    pub severity: TimingSeverity,
}

/// Append-only text sink for boot milestones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootEventLog {
    path: PathBuf,
}

impl BootEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. I/O failures are logged and otherwise ignored.
    pub fn append(&self, line: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| {
                writeln!(file, "{}", line)?;
                file.flush()
            });
        if let Err(e) = result {
            log::error!("Failed to write boot event to {}: {}", self.path.display(), e);
        }
    }
}

/// Thresholds plus sinks for per-service timings.
#[derive(Debug, Clone)]
pub struct StartupDiagnostics {
    warn_after: Duration,
    trace_after: Duration,
    boot_events: Option<BootEventLog>,
    timings: Vec<ServiceTiming>,
}

impl Default for StartupDiagnostics {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_WARN_AFTER_MS),
            Duration::from_millis(DEFAULT_TRACE_AFTER_MS),
        )
    }
}

impl StartupDiagnostics {
    pub fn new(warn_after: Duration, trace_after: Duration) -> Self {
        Self {
            warn_after,
            trace_after,
            boot_events: None,
            timings: Vec::new(),
        }
    }

    pub fn with_boot_event_log(mut self, log: BootEventLog) -> Self {
        self.boot_events = Some(log);
        self
    }

    pub fn warn_after(&self) -> Duration {
        self.warn_after
    }

    pub fn trace_after(&self) -> Duration {
        self.trace_after
    }

    pub fn classify(&self, elapsed: Duration) -> TimingSeverity {
        if elapsed > self.warn_after {
            TimingSeverity::Slow
        } else if elapsed > self.trace_after {
            TimingSeverity::Traced
        } else {
            TimingSeverity::Normal
        }
    }

    /// Record a boot milestone that is not tied to one service.
    pub fn milestone(&self, message: &str) {
        log::info!(target: BOOT_TIMING_TARGET, "{}", message);
        if let Some(events) = &self.boot_events {
            events.append(message);
        }
    }

    /// Record the duration of one lifecycle step and return its classification.
    pub fn record(&mut self, service: &str, step: TimedStep, elapsed: Duration) -> TimingSeverity {
        let severity = self.classify(elapsed);
        let millis = elapsed.as_millis();
        match step {
            TimedStep::Start => {
                if severity == TimingSeverity::Slow {
                    log::warn!("Initialization of {} took {} ms", service, millis);
                }
                if severity >= TimingSeverity::Traced {
                    let line = format!("running {} took {} ms", service, millis);
                    log::info!(target: BOOT_TIMING_TARGET, "{}", line);
                    if let Some(events) = &self.boot_events {
                        events.append(&line);
                    }
                } else {
                    log::debug!(target: BOOT_TIMING_TARGET, "running {} took {} ms", service, millis);
                }
            }
            TimedStep::BootCompleted => {
                log::debug!(target: BOOT_TIMING_TARGET, "bootcomplete {} took {} ms", service, millis);
            }
        }
        self.timings.push(ServiceTiming {
            service: service.to_string(),
            step,
            elapsed,
            severity,
        });
        severity
    }

    /// Every timing recorded so far, oldest first.
    pub fn timings(&self) -> &[ServiceTiming] {
        &self.timings
    }

    /// Timings classified as slow.
    pub fn slow_services(&self) -> impl Iterator<Item = &ServiceTiming> {
        self.timings
            .iter()
            .filter(|t| t.severity == TimingSeverity::Slow)
    }
}

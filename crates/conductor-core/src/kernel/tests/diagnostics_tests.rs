use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use crate::kernel::diagnostics::{BootEventLog, StartupDiagnostics, TimedStep, TimingSeverity};

#[test]
fn test_classification_thresholds() {
    let diagnostics = StartupDiagnostics::default();
    assert_eq!(diagnostics.warn_after(), Duration::from_millis(1000));
    assert_eq!(diagnostics.trace_after(), Duration::from_millis(30));

    assert_eq!(diagnostics.classify(Duration::from_millis(30)), TimingSeverity::Normal);
    assert_eq!(diagnostics.classify(Duration::from_millis(31)), TimingSeverity::Traced);
    assert_eq!(diagnostics.classify(Duration::from_millis(1000)), TimingSeverity::Traced);
    assert_eq!(diagnostics.classify(Duration::from_millis(1001)), TimingSeverity::Slow);
}

#[test]
fn test_records_are_kept_in_order() {
    let mut diagnostics = StartupDiagnostics::new(Duration::from_millis(100), Duration::from_millis(10));
    diagnostics.record("a", TimedStep::Start, Duration::from_millis(1));
    diagnostics.record("b", TimedStep::Start, Duration::from_millis(500));
    diagnostics.record("a", TimedStep::BootCompleted, Duration::from_millis(20));

    let names: Vec<_> = diagnostics.timings().iter().map(|t| (t.service.as_str(), t.step)).collect();
    assert_eq!(
        names,
        vec![("a", TimedStep::Start), ("b", TimedStep::Start), ("a", TimedStep::BootCompleted)]
    );
    assert_eq!(diagnostics.slow_services().count(), 1);
}

#[test]
fn test_boot_event_log_receives_traced_starts_only() {
    let dir = tempdir().expect("Failed to create temporary directory");
    let path = dir.path().join("bootevent");
    let mut diagnostics = StartupDiagnostics::default().with_boot_event_log(BootEventLog::new(&path));

    diagnostics.milestone("Starting services");
    diagnostics.record("fast", TimedStep::Start, Duration::from_millis(5));
    diagnostics.record("medium", TimedStep::Start, Duration::from_millis(45));
    diagnostics.record("medium", TimedStep::BootCompleted, Duration::from_millis(45));

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines, vec!["Starting services", "running medium took 45 ms"]);
}

#[test]
fn test_unwritable_boot_event_log_is_not_fatal() {
    let dir = tempdir().expect("Failed to create temporary directory");
    // A directory cannot be opened for appending
    let log = BootEventLog::new(dir.path());
    log.append("ignored");
    assert_eq!(log.path(), dir.path());
}

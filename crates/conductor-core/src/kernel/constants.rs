/// Application name
pub const APP_NAME: &str = "Conductor";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log target used for per-service timing records
pub const BOOT_TIMING_TARGET: &str = "conductor::boot_timing";

/// A `start()` hook slower than this is reported at warning level (milliseconds)
pub const DEFAULT_WARN_AFTER_MS: u64 = 1000;

/// A hook slower than this produces a timing record and a boot event line (milliseconds)
pub const DEFAULT_TRACE_AFTER_MS: u64 = 30;

/// Separator between the application process name and a sub-process suffix
pub const SUBPROCESS_SEPARATOR: char = ':';

/// Value written to the readiness marker once the system finished booting
pub const BOOT_COMPLETED_MARKER_VALUE: &str = "1";

/// Services that must run before the readiness signal arrives.
pub const DEFAULT_BASE_SERVICES: &[&str] = &[
    "dependency",
    "command-queue",
    "keyguard",
    "system-bars",
];

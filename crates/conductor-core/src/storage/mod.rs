pub mod config;
pub mod error;

/// Re-export key types
pub use config::{ConfigFormat, DiagnosticsConfig, OrchestratorConfig};
pub use error::ConfigError;

// Test module declaration
#[cfg(test)]
mod tests;

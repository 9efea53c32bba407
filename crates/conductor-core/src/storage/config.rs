use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::kernel::boot::MarkerFileProbe;
use crate::kernel::component::{ExecutionScope, ProcessContext};
use crate::kernel::constants::{DEFAULT_BASE_SERVICES, DEFAULT_TRACE_AFTER_MS, DEFAULT_WARN_AFTER_MS};
use crate::kernel::descriptor::{DescriptorTable, ServiceCatalog};
use crate::kernel::diagnostics::{BootEventLog, StartupDiagnostics};
use crate::kernel::error::{BoxError, Result as KernelResult};
use crate::kernel::orchestrator::ServiceOrchestrator;
use crate::storage::error::ConfigError;

/// On-disk encodings an [`OrchestratorConfig`] can be read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    Json,
    #[cfg(feature = "yaml-config")]
    Yaml,
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Canonical extension, also used to label parse errors.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            #[cfg(feature = "yaml-config")]
            Self::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            Self::Toml => "toml",
        }
    }

    /// Pick the format from `path`'s extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Some(Self::Yaml),
            #[cfg(feature = "toml-config")]
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Slow-start thresholds and the optional boot event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub warn_after_ms: u64,
    pub trace_after_ms: u64,
    pub boot_event_log: Option<PathBuf>,
    pub boot_event_log_enabled: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            warn_after_ms: DEFAULT_WARN_AFTER_MS,
            trace_after_ms: DEFAULT_TRACE_AFTER_MS,
            boot_event_log: None,
            boot_event_log_enabled: true,
        }
    }
}

impl DiagnosticsConfig {
    pub fn build(&self) -> StartupDiagnostics {
        let diagnostics = StartupDiagnostics::new(
            Duration::from_millis(self.warn_after_ms),
            Duration::from_millis(self.trace_after_ms),
        );
        match (&self.boot_event_log, self.boot_event_log_enabled) {
            (Some(path), true) => diagnostics.with_boot_event_log(BootEventLog::new(path)),
            _ => diagnostics,
        }
    }
}

/// Everything needed to build and start an orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Name of the main application process; `<name>:<suffix>` marks a helper
    pub app_process_name: String,
    /// User whose process gets the primary, boot-gated scope
    pub primary_user_id: u32,
    /// Ordered service names for the primary scope
    pub primary_services: Vec<String>,
    /// Ordered service names for secondary scopes
    pub secondary_services: Vec<String>,
    /// BASE allow-list: services started before boot completion
    pub base_services: Vec<String>,
    /// File that reads `1` once the system has booted
    pub readiness_marker: Option<PathBuf>,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            app_process_name: "conductor".to_string(),
            primary_user_id: 0,
            primary_services: Vec::new(),
            secondary_services: Vec::new(),
            base_services: DEFAULT_BASE_SERVICES.iter().map(|s| s.to_string()).collect(),
            readiness_marker: None,
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Load and validate a configuration file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedConfigFormat(path.to_path_buf()))?;
        let data = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(e, "read", path))?;
        let config = Self::deserialize(&data, format)?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse `data` without validating it.
    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let parsed: Result<Self, BoxError> = match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(Into::into),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(Into::into),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(Into::into),
        };
        parsed.map_err(|source| ConfigError::DeserializationError {
            format: format.extension().to_string(),
            source,
        })
    }

    pub fn serialize(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        let rendered: Result<String, BoxError> = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(Into::into),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(Into::into),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(Into::into),
        };
        rendered.map_err(|source| ConfigError::SerializationError {
            format: format.extension().to_string(),
            source,
        })
    }

    /// Reject configurations that can never start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary_services.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "primary_services".to_string(),
                reason: "at least one service is required".to_string(),
            });
        }
        check_unique("primary_services", &self.primary_services)?;
        check_unique("secondary_services", &self.secondary_services)?;
        if self.diagnostics.trace_after_ms > self.diagnostics.warn_after_ms {
            return Err(ConfigError::InvalidValue {
                key: "diagnostics.trace_after_ms".to_string(),
                reason: format!(
                    "{} exceeds warn_after_ms ({})",
                    self.diagnostics.trace_after_ms, self.diagnostics.warn_after_ms
                ),
            });
        }
        Ok(())
    }

    /// Service names configured for `scope`. Auxiliary processes run none.
    pub fn services_for(&self, scope: ExecutionScope) -> &[String] {
        match scope {
            ExecutionScope::Primary => &self.primary_services,
            ExecutionScope::Secondary => &self.secondary_services,
            ExecutionScope::Auxiliary => &[],
        }
    }

    pub fn detect_scope(&self, process_name: &str, user_id: u32) -> ExecutionScope {
        ExecutionScope::detect(process_name, &self.app_process_name, user_id, self.primary_user_id)
    }

    /// Build an orchestrator for the given process using this configuration.
    pub fn build_orchestrator(
        &self,
        catalog: ServiceCatalog,
        process_name: &str,
        user_id: u32,
    ) -> ServiceOrchestrator {
        let scope = self.detect_scope(process_name, user_id);
        let process = ProcessContext::new(process_name, user_id, scope);
        let orchestrator = ServiceOrchestrator::new(process, catalog)
            .with_base_services(self.base_services.iter().cloned())
            .with_diagnostics(self.diagnostics.build());
        match &self.readiness_marker {
            Some(marker) => orchestrator.with_readiness_probe(MarkerFileProbe::new(marker)),
            None => orchestrator,
        }
    }

    /// Phase-tagged descriptor table for `scope`.
    pub fn descriptor_table(&self, scope: ExecutionScope) -> KernelResult<DescriptorTable> {
        DescriptorTable::from_names(self.services_for(scope).iter().cloned(), &self.base_services)
    }
}

fn check_unique(key: &str, names: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    match names.iter().find(|name| !seen.insert(name.as_str())) {
        Some(duplicate) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("service '{}' is listed more than once", duplicate),
        }),
        None => Ok(()),
    }
}

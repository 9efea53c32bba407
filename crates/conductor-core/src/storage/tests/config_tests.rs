use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;

use crate::kernel::component::ExecutionScope;
use crate::kernel::constants::DEFAULT_BASE_SERVICES;
use crate::kernel::descriptor::Phase;
use crate::kernel::error::Error;
use crate::kernel::tests::support::{catalog_for, entries, journal};
use crate::storage::config::{ConfigFormat, DiagnosticsConfig, OrchestratorConfig};
use crate::storage::error::ConfigError;

fn write(dir: &Path, file: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(file);
    fs::write(&path, contents).unwrap();
    path
}

fn sample() -> OrchestratorConfig {
    OrchestratorConfig {
        primary_services: vec!["dependency".into(), "status-bar".into(), "recents".into()],
        secondary_services: vec!["notifications".into()],
        base_services: vec!["dependency".into(), "status-bar".into()],
        ..OrchestratorConfig::default()
    }
}

#[test]
fn test_defaults() {
    let config = OrchestratorConfig::default();
    assert_eq!(config.app_process_name, "conductor");
    assert_eq!(config.primary_user_id, 0);
    assert_eq!(config.base_services, DEFAULT_BASE_SERVICES.to_vec());
    assert_eq!(config.diagnostics, DiagnosticsConfig::default());
    assert!(config.readiness_marker.is_none());
}

#[test]
fn test_load_json_fills_missing_fields() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "conductor.json",
        r#"{ "primary_services": ["dependency", "recents"], "diagnostics": { "warn_after_ms": 500 } }"#,
    );

    let config = OrchestratorConfig::load(&path).unwrap();
    assert_eq!(config.primary_services, vec!["dependency", "recents"]);
    assert_eq!(config.diagnostics.warn_after_ms, 500);
    assert_eq!(config.diagnostics.trace_after_ms, 30);
    assert_eq!(config.base_services, DEFAULT_BASE_SERVICES.to_vec());
}

#[cfg(feature = "toml-config")]
#[test]
fn test_load_toml() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "conductor.toml",
        r#"
app_process_name = "shell"
primary_user_id = 7
primary_services = ["keyguard", "recents"]
base_services = ["keyguard"]

[diagnostics]
trace_after_ms = 10
"#,
    );

    let config = OrchestratorConfig::load(&path).unwrap();
    assert_eq!(config.app_process_name, "shell");
    assert_eq!(config.primary_user_id, 7);
    assert_eq!(config.base_services, vec!["keyguard"]);
    assert_eq!(config.diagnostics.trace_after_ms, 10);
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_load_yaml() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "conductor.yml",
        "primary_services:\n  - recents\nsecondary_services:\n  - notifications\nreadiness_marker: /tmp/booted\n",
    );

    let config = OrchestratorConfig::load(&path).unwrap();
    assert_eq!(config.secondary_services, vec!["notifications"]);
    assert_eq!(config.readiness_marker.as_deref(), Some(Path::new("/tmp/booted")));
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let result = OrchestratorConfig::load(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn test_load_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "conductor.ini", "primary_services = a");
    let result = OrchestratorConfig::load(&path);
    assert!(matches!(result, Err(ConfigError::UnsupportedConfigFormat(_))));
}

#[test]
fn test_load_malformed_json() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "conductor.json", "{ primary_services: ");
    match OrchestratorConfig::load(&path) {
        Err(ConfigError::DeserializationError { format, .. }) => assert_eq!(format, "json"),
        other => panic!("expected DeserializationError, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_empty_primary_list() {
    let config = OrchestratorConfig::default();
    match config.validate() {
        Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "primary_services"),
        other => panic!("expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_duplicates() {
    let mut config = sample();
    config.secondary_services = vec!["a".into(), "b".into(), "a".into()];
    match config.validate() {
        Err(ConfigError::InvalidValue { key, reason }) => {
            assert_eq!(key, "secondary_services");
            assert!(reason.contains("'a'"));
        }
        other => panic!("expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_inverted_thresholds() {
    let mut config = sample();
    config.diagnostics.trace_after_ms = 2000;
    assert!(config.validate().is_err());
    config.diagnostics.trace_after_ms = config.diagnostics.warn_after_ms;
    assert!(config.validate().is_ok());
}

#[test]
fn test_serialize_json_reloads_identically() {
    let config = sample();
    let text = config.serialize(ConfigFormat::Json).unwrap();
    assert_eq!(OrchestratorConfig::deserialize(&text, ConfigFormat::Json).unwrap(), config);
}

#[test]
fn test_format_from_path() {
    assert_eq!(ConfigFormat::from_path(Path::new("a.JSON")), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_path(Path::new("a")), None);
    #[cfg(feature = "yaml-config")]
    assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), Some(ConfigFormat::Yaml));
}

#[test]
fn test_services_for_scope() {
    let config = sample();
    assert_eq!(config.services_for(ExecutionScope::Primary).len(), 3);
    assert_eq!(config.services_for(ExecutionScope::Secondary), ["notifications".to_string()]);
    assert!(config.services_for(ExecutionScope::Auxiliary).is_empty());
}

#[test]
fn test_detect_scope_uses_configured_identity() {
    let config = OrchestratorConfig {
        app_process_name: "shell".into(),
        primary_user_id: 5,
        ..sample()
    };
    assert_eq!(config.detect_scope("shell", 5), ExecutionScope::Primary);
    assert_eq!(config.detect_scope("shell", 0), ExecutionScope::Secondary);
    assert_eq!(config.detect_scope("shell:screenshot", 0), ExecutionScope::Auxiliary);
}

#[test]
fn test_descriptor_table_tags_phases() {
    let table = sample().descriptor_table(ExecutionScope::Primary).unwrap();
    let phases: Vec<Phase> = table.iter().map(|d| d.phase()).collect();
    assert_eq!(phases, vec![Phase::Base, Phase::Base, Phase::Deferred]);
}

#[test]
fn test_descriptor_table_for_auxiliary_scope_is_rejected() {
    let result = sample().descriptor_table(ExecutionScope::Auxiliary);
    assert!(matches!(result, Err(Error::InvalidDescriptorTable { .. })));
}

#[test]
fn test_diagnostics_config_builds_thresholds() {
    let diagnostics = DiagnosticsConfig {
        warn_after_ms: 200,
        trace_after_ms: 20,
        ..DiagnosticsConfig::default()
    }
    .build();
    assert_eq!(diagnostics.warn_after(), Duration::from_millis(200));
    assert_eq!(diagnostics.trace_after(), Duration::from_millis(20));
}

#[tokio::test]
async fn test_build_orchestrator_honours_readiness_marker() {
    let dir = tempdir().unwrap();
    let marker = write(dir.path(), "booted", "1\n");
    let config = OrchestratorConfig {
        readiness_marker: Some(marker),
        ..sample()
    };
    let journal = journal();
    let catalog = catalog_for(&["dependency", "status-bar", "recents"], &journal);

    let mut orchestrator = config.build_orchestrator(catalog, "conductor", 0);
    assert_eq!(orchestrator.scope(), ExecutionScope::Primary);
    let table = config.descriptor_table(orchestrator.scope()).unwrap();
    orchestrator.start(table).await.unwrap();

    assert!(orchestrator.is_boot_completed());
    assert_eq!(orchestrator.created_count(), 3);
    assert_eq!(
        entries(&journal),
        vec![
            "start:dependency",
            "boot:dependency",
            "start:status-bar",
            "boot:status-bar",
            "start:recents",
            "boot:recents"
        ]
    );
}

#[tokio::test]
async fn test_build_orchestrator_for_helper_process() {
    let config = sample();
    let journal = journal();
    let mut orchestrator = config.build_orchestrator(catalog_for(&["recents"], &journal), "conductor:screenshot", 10);

    assert_eq!(orchestrator.scope(), ExecutionScope::Auxiliary);
    let table = config.descriptor_table(ExecutionScope::Primary).unwrap();
    orchestrator.start(table).await.unwrap();
    assert_eq!(orchestrator.created_count(), 0);
}

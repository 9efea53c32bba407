use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::kernel::descriptor::DescriptorTable;
use crate::plugin_system::traits::{OverlayPlugin, PluginContext};

/// Toolkit-agnostic configuration value forwarded to services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// BCP 47 language tag, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Screen density, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_dpi: Option<u32>,
    /// Any other key the host wants to pass through
    #[serde(default, flatten)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_density(mut self, density_dpi: u32) -> Self {
        self.density_dpi = Some(density_dpi);
        self
    }

    /// Get an extra value, deserialized into `T`
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.extras
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Set an extra value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.extras.insert(key.to_string(), value);
        Ok(())
    }
}

/// Everything the control loop can be asked to do.
pub enum ControlEvent {
    /// Run the startup pass for the orchestrator's scope
    StartServices(DescriptorTable),
    /// The system readiness signal; may be delivered more than once
    BootCompleted,
    /// Configuration has changed
    ConfigurationChanged(Configuration),
    /// The system locale has changed
    LocaleChanged { locale: String },
    /// An overlay plugin became available
    PluginConnected {
        plugin: Arc<dyn OverlayPlugin>,
        context: PluginContext,
    },
    /// An overlay plugin went away
    PluginDisconnected { plugin: Arc<dyn OverlayPlugin> },
    /// Stop the control loop
    Shutdown,
}

impl ControlEvent {
    /// Get the name of this event
    pub fn name(&self) -> &'static str {
        match self {
            ControlEvent::StartServices(_) => "services.start",
            ControlEvent::BootCompleted => "boot.completed",
            ControlEvent::ConfigurationChanged(_) => "config.change",
            ControlEvent::LocaleChanged { .. } => "locale.change",
            ControlEvent::PluginConnected { .. } => "plugin.connected",
            ControlEvent::PluginDisconnected { .. } => "plugin.disconnected",
            ControlEvent::Shutdown => "application.shutdown",
        }
    }
}

impl fmt::Debug for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlEvent::StartServices(table) => {
                f.debug_tuple("StartServices").field(&table.names()).finish()
            }
            ControlEvent::BootCompleted => f.write_str("BootCompleted"),
            ControlEvent::ConfigurationChanged(config) => {
                f.debug_tuple("ConfigurationChanged").field(config).finish()
            }
            ControlEvent::LocaleChanged { locale } => f
                .debug_struct("LocaleChanged")
                .field("locale", locale)
                .finish(),
            ControlEvent::PluginConnected { plugin, context } => f
                .debug_struct("PluginConnected")
                .field("plugin", &plugin.id())
                .field("context", context)
                .finish(),
            ControlEvent::PluginDisconnected { plugin } => f
                .debug_struct("PluginDisconnected")
                .field("plugin", &plugin.id())
                .finish(),
            ControlEvent::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Result of handling one control event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Keep processing events
    Continue,
    /// The loop should stop
    Stop,
}

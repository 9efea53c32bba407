use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::event::dispatcher::EventSender;
use crate::event::error::EventSystemError;

/// Opaque reference to a surface owned by the primary UI service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceHandle {
    pub id: u64,
    pub name: String,
}

impl SurfaceHandle {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Where a connected plugin was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginContext {
    pub package: String,
    pub version: Option<String>,
}

impl PluginContext {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: None,
        }
    }
}

/// An optional component that draws over the primary surfaces.
pub trait OverlayPlugin: Send + Sync + Debug {
    /// Stable identity, used for set membership.
    fn id(&self) -> &str;

    /// Hand the plugin the surfaces it may attach to.
    fn setup(&self, status_bar_window: &SurfaceHandle, navigation_bar_view: &SurfaceHandle);

    /// Whether the plugin wants the status bar held open while connected.
    fn hold_status_bar_open(&self) -> bool;

    /// Forwarded collapse/expand intent from the window-state capability.
    fn set_collapse_desired(&self, collapse_desired: bool);
}

/// Capability: the primary UI service and the surfaces it exposes.
pub trait PrimaryUiService: Send + Sync {
    fn status_bar_window(&self) -> SurfaceHandle;
    fn navigation_bar_view(&self) -> SurfaceHandle;
}

/// Callback receiving collapse intents from the window-state capability.
pub type CollapseListener = Box<dyn Fn(bool) + Send + Sync>;

/// Capability: window-state management for the primary surface.
pub trait WindowStateManager: Send + Sync {
    /// Replace the collapse-intent listener.
    fn set_state_listener(&self, listener: CollapseListener);

    /// Keep the surface open on behalf of overlay plugins.
    fn set_force_plugin_open(&self, force_open: bool);
}

/// Capability: the host that discovers overlay plugins and reports them.
pub trait PluginHost: Send + Sync {
    /// Start reporting overlay plugins to `listener`. Multiple plugins may be
    /// connected at once.
    fn add_plugin_listener(&self, listener: PluginListener);
}

/// Handle a [`PluginHost`] uses to report plugins; every report is queued
/// onto the control loop.
#[derive(Clone)]
pub struct PluginListener {
    sender: EventSender,
}

impl Debug for PluginListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginListener").finish_non_exhaustive()
    }
}

impl PluginListener {
    pub fn new(sender: EventSender) -> Self {
        Self { sender }
    }

    pub fn on_plugin_connected(
        &self,
        plugin: Arc<dyn OverlayPlugin>,
        context: PluginContext,
    ) -> Result<(), EventSystemError> {
        self.sender.plugin_connected(plugin, context)
    }

    pub fn on_plugin_disconnected(&self, plugin: Arc<dyn OverlayPlugin>) -> Result<(), EventSystemError> {
        self.sender.plugin_disconnected(plugin)
    }
}

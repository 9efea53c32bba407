use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::kernel::registry::SharedCapabilityRegistry;
use crate::plugin_system::traits::{
    CollapseListener, OverlayPlugin, PluginContext, PrimaryUiService, WindowStateManager,
};

/// Connected overlay plugins that asked to hold the status bar open, by id.
type OverlaySet = BTreeMap<String, Arc<dyn OverlayPlugin>>;

/// Attaches overlay plugins to the primary UI service and keeps the
/// window-state capability's "force open" flag equal to `!overlays.is_empty()`.
pub struct PluginAttachmentTracker {
    capabilities: SharedCapabilityRegistry,
    // Shared with the collapse listener installed on the window-state capability
    overlays: Arc<RwLock<OverlaySet>>,
    listener_installed: AtomicBool,
}

impl fmt::Debug for PluginAttachmentTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginAttachmentTracker")
            .field("overlays", &self.overlay_ids())
            .finish()
    }
}

impl PluginAttachmentTracker {
    pub fn new(capabilities: SharedCapabilityRegistry) -> Self {
        Self {
            capabilities,
            overlays: Arc::new(RwLock::new(BTreeMap::new())),
            listener_installed: AtomicBool::new(false),
        }
    }

    fn overlays(&self) -> RwLockReadGuard<'_, OverlaySet> {
        self.overlays.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn overlays_mut(&self) -> RwLockWriteGuard<'_, OverlaySet> {
        self.overlays.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_plugin_connected(&self, plugin: Arc<dyn OverlayPlugin>, context: &PluginContext) {
        log::info!("Overlay plugin '{}' connected from '{}'", plugin.id(), context.package);

        match self.capabilities.get::<dyn PrimaryUiService>() {
            Some(ui) => plugin.setup(&ui.status_bar_window(), &ui.navigation_bar_view()),
            None => log::debug!(
                "No primary UI service registered; overlay plugin '{}' left unattached",
                plugin.id()
            ),
        }

        if !plugin.hold_status_bar_open() {
            return;
        }

        let first_member = {
            let mut overlays = self.overlays_mut();
            let was_empty = overlays.is_empty();
            overlays.insert(plugin.id().to_string(), plugin);
            was_empty
        };

        let Some(window_state) = self.capabilities.get::<dyn WindowStateManager>() else {
            log::warn!("No window-state manager registered; cannot hold the status bar open");
            return;
        };
        // Also covers a window-state manager that appeared after the set filled.
        if first_member || !self.listener_installed.load(Ordering::SeqCst) {
            window_state.set_state_listener(self.collapse_listener());
            self.listener_installed.store(true, Ordering::SeqCst);
        }
        window_state.set_force_plugin_open(self.force_open());
    }

    /// Removing a plugin that was never connected is a no-op apart from
    /// re-pushing the current flag.
    pub fn on_plugin_disconnected(&self, plugin: &dyn OverlayPlugin) {
        if self.overlays_mut().remove(plugin.id()).is_some() {
            log::info!("Overlay plugin '{}' disconnected", plugin.id());
        } else {
            log::debug!("Overlay plugin '{}' disconnected but was not holding the status bar", plugin.id());
        }

        match self.capabilities.get::<dyn WindowStateManager>() {
            Some(window_state) => window_state.set_force_plugin_open(self.force_open()),
            None => log::debug!("No window-state manager registered; force-open not updated"),
        }
    }

    /// Listener forwarding collapse intents to every current overlay.
    fn collapse_listener(&self) -> CollapseListener {
        let overlays = Arc::clone(&self.overlays);
        Box::new(move |collapse_desired| {
            let members: Vec<Arc<dyn OverlayPlugin>> = overlays
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .cloned()
                .collect();
            for overlay in members {
                overlay.set_collapse_desired(collapse_desired);
            }
        })
    }

    /// Always derived from the set, never toggled.
    pub fn force_open(&self) -> bool {
        !self.overlays().is_empty()
    }

    pub fn overlay_ids(&self) -> Vec<String> {
        self.overlays().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.overlays().len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays().is_empty()
    }
}

//! Fake plugin-host collaborators.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::plugin_system::traits::{
    CollapseListener, OverlayPlugin, PluginHost, PluginListener, PrimaryUiService, SurfaceHandle,
    WindowStateManager,
};

#[derive(Debug)]
pub struct FakeOverlay {
    id: String,
    hold: bool,
    pub setups: Mutex<Vec<(SurfaceHandle, SurfaceHandle)>>,
    pub collapse_requests: Mutex<Vec<bool>>,
}

impl FakeOverlay {
    pub fn new(id: &str, hold: bool) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            hold,
            setups: Mutex::new(Vec::new()),
            collapse_requests: Mutex::new(Vec::new()),
        })
    }

    pub fn setup_count(&self) -> usize {
        self.setups.lock().unwrap().len()
    }

    pub fn collapse_requests(&self) -> Vec<bool> {
        self.collapse_requests.lock().unwrap().clone()
    }
}

impl OverlayPlugin for FakeOverlay {
    fn id(&self) -> &str {
        &self.id
    }

    fn setup(&self, status_bar_window: &SurfaceHandle, navigation_bar_view: &SurfaceHandle) {
        self.setups
            .lock()
            .unwrap()
            .push((status_bar_window.clone(), navigation_bar_view.clone()));
    }

    fn hold_status_bar_open(&self) -> bool {
        self.hold
    }

    fn set_collapse_desired(&self, collapse_desired: bool) {
        self.collapse_requests.lock().unwrap().push(collapse_desired);
    }
}

pub struct FakePrimaryUi;

impl PrimaryUiService for FakePrimaryUi {
    fn status_bar_window(&self) -> SurfaceHandle {
        SurfaceHandle::new(1, "status_bar_window")
    }

    fn navigation_bar_view(&self) -> SurfaceHandle {
        SurfaceHandle::new(2, "navigation_bar_view")
    }
}

#[derive(Default)]
pub struct FakeWindowState {
    pushes: Mutex<Vec<bool>>,
    listener: Mutex<Option<CollapseListener>>,
    installs: AtomicUsize,
}

impl FakeWindowState {
    /// Last value pushed, `None` if never pushed.
    pub fn force_open(&self) -> Option<bool> {
        self.pushes.lock().unwrap().last().copied()
    }

    pub fn pushes(&self) -> Vec<bool> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn listener_installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    /// Simulate the window manager reporting a collapse intent.
    pub fn emit_collapse(&self, collapse: bool) {
        if let Some(listener) = self.listener.lock().unwrap().as_ref() {
            listener(collapse);
        }
    }
}

impl WindowStateManager for FakeWindowState {
    fn set_state_listener(&self, listener: CollapseListener) {
        self.installs.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = Some(listener);
    }

    fn set_force_plugin_open(&self, force_open: bool) {
        self.pushes.lock().unwrap().push(force_open);
    }
}

/// Keeps the listener it is given so tests can report plugins through it.
#[derive(Default)]
pub struct FakePluginHost {
    pub listeners: Mutex<Vec<PluginListener>>,
}

impl FakePluginHost {
    pub fn listener(&self) -> Option<PluginListener> {
        self.listeners.lock().unwrap().first().cloned()
    }
}

impl PluginHost for FakePluginHost {
    fn add_plugin_listener(&self, listener: PluginListener) {
        self.listeners.lock().unwrap().push(listener);
    }
}

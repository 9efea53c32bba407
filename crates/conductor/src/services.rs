//! Headless services shipped with the `conductor` binary.
//!
//! They stand in for real system services: each one logs its lifecycle
//! hooks, and a few of them publish the capabilities other parts of the
//! orchestrator look up (primary UI surfaces, window state, locale
//! resources, the overlay plugin host).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use conductor_core::kernel::{BoxError, LocaleResourceRegenerator};
use conductor_core::plugin_system::{
    CollapseListener, OverlayPlugin, PluginContext, PluginHost, PluginListener, PrimaryUiService,
    SurfaceHandle, WindowStateManager,
};
use conductor_core::{Configuration, OrchestratorConfig, ServiceCatalog, ServiceComponent, ServiceContext};
use log::{debug, info, warn};

pub const STATUS_BAR: &str = "status-bar";
pub const NOTIFICATIONS: &str = "notifications";
pub const PLUGIN_HOST: &str = "plugin-host";

/// Services with no behaviour beyond logging their hooks.
const PLAIN_SERVICES: &[&str] = &[
    "dependency",
    "command-queue",
    "keyguard",
    "system-bars",
    "recents",
    "volume",
    "power",
    "screenshot",
];

/// Catalog of every service this binary knows how to build.
pub fn catalog() -> ServiceCatalog {
    let mut catalog = ServiceCatalog::new();
    for &name in PLAIN_SERVICES {
        catalog.register(name, move |ctx| {
            let service: Arc<dyn ServiceComponent> = Arc::new(HeadlessService::new(name, ctx));
            Ok(service)
        });
    }
    catalog
        .with(STATUS_BAR, |ctx| {
            let status_bar = Arc::new(StatusBarService::default());
            ctx.capabilities().put::<dyn PrimaryUiService>(status_bar.clone());
            ctx.capabilities().put::<dyn WindowStateManager>(status_bar.clone());
            let service: Arc<dyn ServiceComponent> = status_bar;
            Ok(service)
        })
        .with(NOTIFICATIONS, |ctx| {
            let notifications = Arc::new(NotificationService::default());
            ctx.capabilities()
                .put::<dyn LocaleResourceRegenerator>(notifications.clone());
            let service: Arc<dyn ServiceComponent> = notifications;
            Ok(service)
        })
        .with(PLUGIN_HOST, |ctx| {
            let host = Arc::new(DemoPluginHost);
            ctx.capabilities().put::<dyn PluginHost>(host.clone());
            let service: Arc<dyn ServiceComponent> = host;
            Ok(service)
        })
}

/// Names [`catalog`] can build, sorted.
pub fn known_services() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PLAIN_SERVICES.to_vec();
    names.extend([STATUS_BAR, NOTIFICATIONS, PLUGIN_HOST]);
    names.sort_unstable();
    names
}

/// Configuration used when no file is given on the command line.
pub fn default_config() -> OrchestratorConfig {
    let primary = [
        "dependency",
        "command-queue",
        PLUGIN_HOST,
        "keyguard",
        STATUS_BAR,
        NOTIFICATIONS,
        "recents",
        "volume",
        "power",
    ];
    OrchestratorConfig {
        primary_services: primary.iter().map(|s| s.to_string()).collect(),
        secondary_services: vec![STATUS_BAR.to_string(), NOTIFICATIONS.to_string()],
        base_services: vec![
            "dependency".to_string(),
            "command-queue".to_string(),
            PLUGIN_HOST.to_string(),
            "keyguard".to_string(),
            STATUS_BAR.to_string(),
        ],
        ..OrchestratorConfig::default()
    }
}

#[derive(Debug)]
struct HeadlessService {
    name: &'static str,
    user_id: u32,
}

impl HeadlessService {
    fn new(name: &'static str, ctx: &ServiceContext) -> Self {
        Self {
            name,
            user_id: ctx.process().user_id,
        }
    }
}

#[async_trait]
impl ServiceComponent for HeadlessService {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self) -> Result<(), BoxError> {
        info!("{} started for user {}", self.name, self.user_id);
        Ok(())
    }

    async fn on_boot_completed(&self) -> Result<(), BoxError> {
        debug!("{} observed boot completion", self.name);
        Ok(())
    }

    async fn on_configuration_changed(&self, config: &Configuration) {
        debug!("{} received configuration {:?}", self.name, config);
    }
}

/// Owns the primary surfaces and the force-open flag overlays rely on.
#[derive(Default)]
struct StatusBarService {
    force_open: AtomicBool,
    collapse_listener: Mutex<Option<CollapseListener>>,
}

impl std::fmt::Debug for StatusBarService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBarService")
            .field("force_open", &self.force_open.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ServiceComponent for StatusBarService {
    fn name(&self) -> &str {
        STATUS_BAR
    }

    async fn start(&self) -> Result<(), BoxError> {
        info!("Status bar attached to {}", self.status_bar_window().name);
        Ok(())
    }

    async fn on_configuration_changed(&self, config: &Configuration) {
        if let Some(dpi) = config.density_dpi {
            info!("Status bar relayout for {} dpi", dpi);
        }
        // A relayout collapses the panel; let overlays know.
        let listener = self
            .collapse_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(listener) = listener.as_ref() {
            listener(true);
        }
    }
}

impl PrimaryUiService for StatusBarService {
    fn status_bar_window(&self) -> SurfaceHandle {
        SurfaceHandle::new(1, "status_bar_window")
    }

    fn navigation_bar_view(&self) -> SurfaceHandle {
        SurfaceHandle::new(2, "navigation_bar_view")
    }
}

impl WindowStateManager for StatusBarService {
    fn set_state_listener(&self, listener: CollapseListener) {
        *self
            .collapse_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    fn set_force_plugin_open(&self, force_open: bool) {
        if self.force_open.swap(force_open, Ordering::SeqCst) != force_open {
            info!("Status bar force-open for plugins: {}", force_open);
        }
    }
}

#[derive(Debug, Default)]
struct NotificationService {
    locale: Mutex<Option<String>>,
}

#[async_trait]
impl ServiceComponent for NotificationService {
    fn name(&self) -> &str {
        NOTIFICATIONS
    }

    async fn start(&self) -> Result<(), BoxError> {
        info!("Notification channels created");
        Ok(())
    }

    async fn on_configuration_changed(&self, config: &Configuration) {
        let current = self.locale.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if config.locale.is_some() && config.locale != current {
            debug!("Channel names still use locale {:?}; waiting for a locale change", current);
        }
    }
}

impl LocaleResourceRegenerator for NotificationService {
    fn regenerate(&self, locale: &str) -> Result<(), BoxError> {
        if locale.trim().is_empty() {
            return Err("empty locale tag".into());
        }
        *self.locale.lock().unwrap_or_else(PoisonError::into_inner) = Some(locale.to_string());
        info!("Notification channel names regenerated for '{}'", locale);
        Ok(())
    }
}

/// Reports a single built-in overlay as soon as a listener subscribes.
#[derive(Debug)]
struct DemoPluginHost;

#[async_trait]
impl ServiceComponent for DemoPluginHost {
    fn name(&self) -> &str {
        PLUGIN_HOST
    }

    async fn start(&self) -> Result<(), BoxError> {
        info!("Plugin host ready");
        Ok(())
    }
}

impl PluginHost for DemoPluginHost {
    fn add_plugin_listener(&self, listener: PluginListener) {
        let overlay: Arc<dyn OverlayPlugin> = Arc::new(DemoOverlay);
        if let Err(e) = listener.on_plugin_connected(overlay, PluginContext::new("conductor.demo")) {
            warn!("Could not report demo overlay: {}", e);
        }
    }
}

#[derive(Debug)]
struct DemoOverlay;

impl OverlayPlugin for DemoOverlay {
    fn id(&self) -> &str {
        "demo-overlay"
    }

    fn setup(&self, status_bar_window: &SurfaceHandle, navigation_bar_view: &SurfaceHandle) {
        info!(
            "Demo overlay attached to '{}' and '{}'",
            status_bar_window.name, navigation_bar_view.name
        );
    }

    fn hold_status_bar_open(&self) -> bool {
        true
    }

    fn set_collapse_desired(&self, collapse_desired: bool) {
        debug!("Demo overlay collapse desired: {}", collapse_desired);
    }
}

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::event::dispatcher::EventSender;
use crate::event::types::{Configuration, ControlEvent, EventResult};
use crate::kernel::boot::{BootPhaseTracker, ReadinessProbe, StaticReadiness};
use crate::kernel::component::{
    ExecutionScope, LocaleResourceRegenerator, ProcessContext, ServiceComponent, ServiceContext,
};
use crate::kernel::constants;
use crate::kernel::descriptor::{DescriptorTable, Phase, ServiceCatalog, ServiceDescriptor};
use crate::kernel::diagnostics::{StartupDiagnostics, TimedStep};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::registry::SharedCapabilityRegistry;
use crate::plugin_system::overlay::PluginAttachmentTracker;
use crate::plugin_system::traits::{OverlayPlugin, PluginContext, PluginHost, PluginListener};

/// Owns the service slots of one process scope and drives their lifecycle.
///
/// All methods take `&mut self`; the [`ControlLoop`](crate::event::ControlLoop)
/// is the only caller in a running process, which serialises every event.
pub struct ServiceOrchestrator {
    process: Arc<ProcessContext>,
    capabilities: SharedCapabilityRegistry,
    catalog: ServiceCatalog,
    base_services: Vec<String>,
    readiness: Box<dyn ReadinessProbe>,
    boot: BootPhaseTracker,
    table: Option<DescriptorTable>,
    // One slot per descriptor; `None` means NotCreated
    slots: Vec<Option<Arc<dyn ServiceComponent>>>,
    started: bool,
    diagnostics: StartupDiagnostics,
    plugins: Option<PluginAttachmentTracker>,
    plugin_host_subscribed: bool,
    events: Option<EventSender>,
}

impl fmt::Debug for ServiceOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceOrchestrator")
            .field("scope", &self.process.scope)
            .field("started", &self.started)
            .field("boot_completed", &self.boot.is_completed())
            .field("services", &self.table.as_ref().map(DescriptorTable::names))
            .field("created", &self.created_count())
            .finish_non_exhaustive()
    }
}

impl ServiceOrchestrator {
    /// Creates an orchestrator for `process`, resolving services through `catalog`.
    pub fn new(process: ProcessContext, catalog: ServiceCatalog) -> Self {
        log::info!(
            "Creating {} v{} orchestrator for {} scope (process '{}', user {})",
            constants::APP_NAME,
            constants::APP_VERSION,
            process.scope,
            process.process_name,
            process.user_id
        );
        Self {
            process: Arc::new(process),
            capabilities: SharedCapabilityRegistry::new(),
            catalog,
            base_services: constants::DEFAULT_BASE_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            readiness: Box::new(StaticReadiness(false)),
            boot: BootPhaseTracker::new(),
            table: None,
            slots: Vec::new(),
            started: false,
            diagnostics: StartupDiagnostics::default(),
            plugins: None,
            plugin_host_subscribed: false,
            events: None,
        }
    }

    /// Replace the BASE allow-list.
    pub fn with_base_services<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_services = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_readiness_probe(mut self, probe: impl ReadinessProbe + 'static) -> Self {
        self.readiness = Box::new(probe);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: StartupDiagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Used by the control loop so the plugin host can be handed a listener.
    pub(crate) fn attach_event_sender(&mut self, sender: EventSender) {
        self.events = Some(sender);
    }

    pub fn scope(&self) -> ExecutionScope {
        self.process.scope
    }

    pub fn process(&self) -> &ProcessContext {
        &self.process
    }

    pub fn capabilities(&self) -> &SharedCapabilityRegistry {
        &self.capabilities
    }

    pub fn base_services(&self) -> &[String] {
        &self.base_services
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_boot_completed(&self) -> bool {
        self.boot.is_completed()
    }

    pub fn descriptors(&self) -> Option<&DescriptorTable> {
        self.table.as_ref()
    }

    /// Service slots in descriptor order; `None` for services not created yet.
    pub fn services(&self) -> &[Option<Arc<dyn ServiceComponent>>] {
        &self.slots
    }

    /// The running instance for the descriptor named `name`, if created.
    pub fn service(&self, name: &str) -> Option<Arc<dyn ServiceComponent>> {
        let table = self.table.as_ref()?;
        let index = table.iter().position(|d| d.name() == name)?;
        self.slots.get(index).cloned().flatten()
    }

    pub fn created_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn diagnostics(&self) -> &StartupDiagnostics {
        &self.diagnostics
    }

    pub fn plugin_tracker(&self) -> Option<&PluginAttachmentTracker> {
        self.plugins.as_ref()
    }

    /// Pure lookup; `None` when nothing provides capability `T`.
    pub fn get_capability<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.get::<T>()
    }

    /// Tag configured names with their phase using this orchestrator's
    /// BASE allow-list.
    pub fn resolve_table<I, S>(&self, names: I) -> Result<DescriptorTable>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DescriptorTable::from_names(names, &self.base_services)
    }

    /// Run the startup pass appropriate for this orchestrator's scope.
    pub async fn start(&mut self, table: DescriptorTable) -> Result<()> {
        match self.process.scope {
            ExecutionScope::Primary => self.start_primary(table).await,
            ExecutionScope::Secondary => self.start_secondary(table).await,
            ExecutionScope::Auxiliary => {
                log::info!(
                    "Process '{}' is an auxiliary sub-process; no services are started",
                    self.process.process_name
                );
                Ok(())
            }
        }
    }

    /// Boot-gated startup for the primary scope. BASE services start now;
    /// DEFERRED services wait for the readiness signal unless it was already
    /// observed. A no-op once startup has run; refused after a failed pass.
    pub async fn start_primary(&mut self, table: DescriptorTable) -> Result<()> {
        self.require_scope(ExecutionScope::Primary, "start_primary")?;
        if !self.begin_startup()? {
            return Ok(());
        }
        self.catalog.verify(&table)?;
        self.boot.adopt_if_ready(self.readiness.as_ref());
        let descriptors = self.install_table(table);

        let boot_completed = self.boot.is_completed();
        self.diagnostics.milestone("Starting services");
        log::info!(
            "Starting services for user {} (boot completed: {})",
            self.process.user_id,
            boot_completed
        );

        for (index, descriptor) in descriptors.iter().enumerate() {
            if !boot_completed && descriptor.phase() != Phase::Base {
                log::debug!("Deferring '{}' until boot completes", descriptor.name());
                continue;
            }
            self.create_and_start(index, descriptor.name()).await?;
            if boot_completed {
                self.deliver_boot_completed(index).await?;
            }
        }

        self.attach_plugin_listener();
        self.started = true;
        log::info!("Service startup complete ({} of {} running)", self.created_count(), self.slots.len());
        Ok(())
    }

    /// Immediate startup for the secondary scope: everything starts, no
    /// readiness signal is expected. Re-entry behaves as in `start_primary`.
    pub async fn start_secondary(&mut self, table: DescriptorTable) -> Result<()> {
        self.require_scope(ExecutionScope::Secondary, "start_secondary")?;
        if !self.begin_startup()? {
            return Ok(());
        }
        self.catalog.verify(&table)?;
        let descriptors = self.install_table(table);

        self.diagnostics.milestone("Starting secondary services");
        log::info!("Starting secondary services for user {}", self.process.user_id);
        for (index, descriptor) in descriptors.iter().enumerate() {
            self.create_and_start(index, descriptor.name()).await?;
        }

        self.attach_plugin_listener();
        self.started = true;
        log::info!("Secondary service startup complete ({} running)", self.created_count());
        Ok(())
    }

    /// Apply the readiness signal. Duplicate deliveries are ignored. When
    /// startup already ran, missing services are created and started first,
    /// then every instance receives its post-boot hook, in descriptor order.
    pub async fn on_boot_completed(&mut self) -> Result<()> {
        self.require_scope(ExecutionScope::Primary, "on_boot_completed")?;
        if !self.boot.mark_completed() {
            log::debug!("Duplicate boot completed signal ignored");
            return Ok(());
        }
        log::info!("Boot completed");
        if !self.started {
            // The startup pass will see the flag and start everything.
            return Ok(());
        }

        let descriptors = self.installed_descriptors();
        for (index, descriptor) in descriptors.iter().enumerate() {
            if self.slots[index].is_none() {
                self.create_and_start(index, descriptor.name()).await?;
            }
        }
        // A plugin host may be one of the services created just now.
        self.attach_plugin_listener();
        for index in 0..self.slots.len() {
            self.deliver_boot_completed(index).await?;
        }
        Ok(())
    }

    /// Forward a configuration change to every created service. Ignored
    /// before the first startup pass.
    pub async fn on_configuration_changed(&mut self, config: &Configuration) {
        if !self.started {
            log::debug!("Configuration change before startup ignored");
            return;
        }
        for service in self.slots.iter().flatten() {
            service.on_configuration_changed(config).await;
        }
    }

    /// Regenerate locale-dependent resources. Ignored until boot completed.
    pub async fn on_locale_changed(&mut self, locale: &str) {
        if !self.boot.is_completed() {
            log::debug!("Locale change to '{}' before boot completion ignored", locale);
            return;
        }
        match self.capabilities.get::<dyn LocaleResourceRegenerator>() {
            Some(regenerator) => {
                if let Err(e) = regenerator.regenerate(locale) {
                    log::error!("Failed to regenerate resources for locale '{}': {}", locale, e);
                }
            }
            None => log::debug!("No locale resource regenerator registered"),
        }
    }

    pub fn on_plugin_connected(&mut self, plugin: Arc<dyn OverlayPlugin>, context: &PluginContext) {
        match &self.plugins {
            Some(tracker) => tracker.on_plugin_connected(plugin, context),
            None => log::debug!("Plugin '{}' connected before the plugin listener was registered", plugin.id()),
        }
    }

    pub fn on_plugin_disconnected(&mut self, plugin: &dyn OverlayPlugin) {
        match &self.plugins {
            Some(tracker) => tracker.on_plugin_disconnected(plugin),
            None => log::debug!("Plugin '{}' disconnected before the plugin listener was registered", plugin.id()),
        }
    }

    /// Handle one event from the control loop.
    pub async fn handle_event(&mut self, event: ControlEvent) -> Result<EventResult> {
        match event {
            ControlEvent::StartServices(table) => self.start(table).await?,
            ControlEvent::BootCompleted => {
                if self.process.scope == ExecutionScope::Primary {
                    self.on_boot_completed().await?;
                } else {
                    log::warn!("Boot completed signal ignored in {} scope", self.process.scope);
                }
            }
            ControlEvent::ConfigurationChanged(config) => self.on_configuration_changed(&config).await,
            ControlEvent::LocaleChanged { locale } => self.on_locale_changed(&locale).await,
            ControlEvent::PluginConnected { plugin, context } => self.on_plugin_connected(plugin, &context),
            ControlEvent::PluginDisconnected { plugin } => self.on_plugin_disconnected(plugin.as_ref()),
            ControlEvent::Shutdown => {
                log::info!("Shutdown requested");
                return Ok(EventResult::Stop);
            }
        }
        Ok(EventResult::Continue)
    }

    fn require_scope(&self, expected: ExecutionScope, operation: &'static str) -> Result<()> {
        if self.process.scope == expected {
            Ok(())
        } else {
            Err(Error::ScopeMismatch {
                operation,
                scope: self.process.scope.to_string(),
            })
        }
    }

    /// Decide whether a startup request should run. A completed startup
    /// makes later requests no-ops; a startup that failed part-way leaves
    /// running services behind and is never retried.
    fn begin_startup(&self) -> Result<bool> {
        if self.started {
            log::debug!("Services already started; ignoring repeated start request");
            return Ok(false);
        }
        if self.table.is_some() {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Start,
                service_name: None,
                message: "a previous startup pass failed; services cannot be started again".to_string(),
                source: None,
            });
        }
        Ok(true)
    }

    /// Install `table` with every slot NotCreated and return its descriptors.
    fn install_table(&mut self, table: DescriptorTable) -> Vec<ServiceDescriptor> {
        self.slots = vec![None; table.len()];
        let descriptors = table.iter().cloned().collect();
        self.table = Some(table);
        descriptors
    }

    fn installed_descriptors(&self) -> Vec<ServiceDescriptor> {
        self.table
            .iter()
            .flat_map(|table| table.iter().cloned())
            .collect()
    }

    fn service_context(&self) -> ServiceContext {
        ServiceContext::new(self.capabilities.clone(), Arc::clone(&self.process))
    }

    /// NotCreated -> Running for slot `index`. Any failure is fatal.
    async fn create_and_start(&mut self, index: usize, name: &str) -> Result<()> {
        let started_at = Instant::now();

        let service = self.catalog.instantiate(name, &self.service_context())?;
        log::debug!("Running: {}", name);
        service.start().await.map_err(|e| {
            Error::lifecycle(KernelLifecyclePhase::Start, name, "start() failed", Some(e))
        })?;
        self.slots[index] = Some(service);

        self.diagnostics.record(name, TimedStep::Start, elapsed_since(started_at));
        Ok(())
    }

    async fn deliver_boot_completed(&mut self, index: usize) -> Result<()> {
        let Some(service) = self.slots[index].clone() else {
            return Ok(());
        };
        let started_at = Instant::now();
        service.on_boot_completed().await.map_err(|e| {
            Error::lifecycle(
                KernelLifecyclePhase::BootCompleted,
                service.name(),
                "on_boot_completed() failed",
                Some(e),
            )
        })?;
        self.diagnostics
            .record(service.name(), TimedStep::BootCompleted, elapsed_since(started_at));
        Ok(())
    }

    /// Start tracking overlay plugins and, once a plugin host is available,
    /// subscribe to it through the control loop. Safe to call repeatedly; the
    /// host is subscribed at most once.
    fn attach_plugin_listener(&mut self) {
        if self.plugins.is_none() {
            self.plugins = Some(PluginAttachmentTracker::new(self.capabilities.clone()));
        }
        if self.plugin_host_subscribed {
            return;
        }

        let Some(host) = self.capabilities.get::<dyn PluginHost>() else {
            log::debug!("No plugin host registered yet; overlay plugins must be reported directly");
            return;
        };
        match &self.events {
            Some(sender) => {
                host.add_plugin_listener(PluginListener::new(sender.clone()));
                self.plugin_host_subscribed = true;
            }
            None => log::warn!("Plugin host present but no control loop is attached; overlay plugins will not be reported"),
        }
    }
}

fn elapsed_since(started_at: Instant) -> Duration {
    Instant::now().saturating_duration_since(started_at)
}

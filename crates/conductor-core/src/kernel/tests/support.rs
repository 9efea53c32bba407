//! Test doubles shared by the kernel, event and plugin tests.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::event::types::Configuration;
use crate::kernel::component::{ExecutionScope, ProcessContext, ServiceComponent};
use crate::kernel::descriptor::ServiceCatalog;
use crate::kernel::error::BoxError;

/// Ordered record of every hook invocation, e.g. `"start:a"`, `"boot:a"`.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub fn count(journal: &Journal, entry: &str) -> usize {
    journal.lock().unwrap().iter().filter(|e| *e == entry).count()
}

#[derive(Debug, Clone, Default)]
pub struct Behaviour {
    pub start_delay: Option<Duration>,
    pub fail_start: bool,
    pub fail_boot: bool,
}

#[derive(Debug)]
pub struct RecordingService {
    name: String,
    journal: Journal,
    behaviour: Behaviour,
}

impl RecordingService {
    pub fn new(name: &str, journal: &Journal, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            behaviour,
        }
    }

    fn log(&self, hook: &str) {
        self.journal.lock().unwrap().push(format!("{}:{}", hook, self.name));
    }
}

#[async_trait]
impl ServiceComponent for RecordingService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), BoxError> {
        self.log("start");
        if let Some(delay) = self.behaviour.start_delay {
            tokio::time::sleep(delay).await;
        }
        if self.behaviour.fail_start {
            return Err(format!("{} refused to start", self.name).into());
        }
        Ok(())
    }

    async fn on_boot_completed(&self) -> Result<(), BoxError> {
        self.log("boot");
        if self.behaviour.fail_boot {
            return Err(format!("{} failed after boot", self.name).into());
        }
        Ok(())
    }

    async fn on_configuration_changed(&self, config: &Configuration) {
        let locale = config.locale.clone().unwrap_or_default();
        self.journal
            .lock()
            .unwrap()
            .push(format!("config:{}:{}", self.name, locale));
    }
}

/// Register a [`RecordingService`] with default behaviour under `name`.
pub fn register_recording(catalog: &mut ServiceCatalog, name: &str, journal: &Journal) {
    register_with(catalog, name, journal, Behaviour::default());
}

pub fn register_with(catalog: &mut ServiceCatalog, name: &str, journal: &Journal, behaviour: Behaviour) {
    let journal = Arc::clone(journal);
    let service_name = name.to_string();
    catalog.register(name, move |_ctx| {
        let service: Arc<dyn ServiceComponent> =
            Arc::new(RecordingService::new(&service_name, &journal, behaviour.clone()));
        Ok(service)
    });
}

/// Catalog with one recording service per name.
pub fn catalog_for(names: &[&str], journal: &Journal) -> ServiceCatalog {
    let mut catalog = ServiceCatalog::new();
    for name in names {
        register_recording(&mut catalog, name, journal);
    }
    catalog
}

pub fn primary_process() -> ProcessContext {
    ProcessContext::new("conductor", 0, ExecutionScope::Primary)
}

pub fn secondary_process() -> ProcessContext {
    ProcessContext::new("conductor", 10, ExecutionScope::Secondary)
}

pub fn auxiliary_process() -> ProcessContext {
    ProcessContext::new("conductor:screenshot", 10, ExecutionScope::Auxiliary)
}

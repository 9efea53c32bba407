use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::kernel::component::{ServiceComponent, ServiceContext};
use crate::kernel::error::{BoxError, Error, Result};

/// Whether a service must run before the readiness signal or may wait for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Always-on, started even before boot completion.
    Base,
    /// Started once boot has completed.
    Deferred,
}

/// Static identity and phase of one managed service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    name: String,
    phase: Phase,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            phase,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.phase)
    }
}

/// Ordered, validated list of descriptors. Non-empty, names unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable {
    descriptors: Vec<ServiceDescriptor>,
}

impl DescriptorTable {
    /// Validate an already phased list of descriptors.
    pub fn new(descriptors: Vec<ServiceDescriptor>) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(Error::InvalidDescriptorTable {
                reason: "descriptor table is empty".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.name()) {
                return Err(Error::InvalidDescriptorTable {
                    reason: format!("service '{}' is listed more than once", descriptor.name()),
                });
            }
        }
        Ok(Self { descriptors })
    }

    /// Build a table from configured names, tagging every name found in
    /// `base_services` as [`Phase::Base`] and the rest as [`Phase::Deferred`].
    pub fn from_names<I, S>(names: I, base_services: &[String]) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptors = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                let phase = if base_services.iter().any(|base| *base == name) {
                    Phase::Base
                } else {
                    Phase::Deferred
                };
                ServiceDescriptor::new(name, phase)
            })
            .collect();
        Self::new(descriptors)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ServiceDescriptor> {
        self.descriptors.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceDescriptor> {
        self.descriptors.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(ServiceDescriptor::name).collect()
    }
}

impl<'a> IntoIterator for &'a DescriptorTable {
    type Item = &'a ServiceDescriptor;
    type IntoIter = std::slice::Iter<'a, ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

/// Builds one service from its injected context.
pub type ServiceFactory =
    Box<dyn Fn(&ServiceContext) -> std::result::Result<Arc<dyn ServiceComponent>, BoxError> + Send + Sync>;

/// Maps stable service names to the factories that build them.
#[derive(Default)]
pub struct ServiceCatalog {
    factories: HashMap<String, ServiceFactory>,
}

impl fmt::Debug for ServiceCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ServiceCatalog").field("services", &names).finish()
    }
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ServiceContext) -> std::result::Result<Arc<dyn ServiceComponent>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            log::warn!("Service factory for '{}' was registered twice; keeping the latest", name);
        }
    }

    /// Builder-style variant of [`ServiceCatalog::register`].
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ServiceContext) -> std::result::Result<Arc<dyn ServiceComponent>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Check that every descriptor of `table` can be resolved.
    pub fn verify(&self, table: &DescriptorTable) -> Result<()> {
        match table.iter().find(|d| !self.contains(d.name())) {
            Some(missing) => Err(Error::UnknownService {
                name: missing.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Build the service named `name`.
    pub fn instantiate(&self, name: &str, ctx: &ServiceContext) -> Result<Arc<dyn ServiceComponent>> {
        let factory = self.factories.get(name).ok_or_else(|| Error::UnknownService {
            name: name.to_string(),
        })?;
        factory(ctx).map_err(|source| Error::ServiceConstruction {
            name: name.to_string(),
            source,
        })
    }
}

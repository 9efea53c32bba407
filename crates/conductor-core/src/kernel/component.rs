use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::types::Configuration;
use crate::kernel::constants;
use crate::kernel::error::BoxError;
use crate::kernel::registry::SharedCapabilityRegistry;

/// Which execution scope an orchestrator (and the process hosting it) represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionScope {
    /// The primary principal: boot-gated, two-phase startup.
    Primary,
    /// A secondary principal: the readiness signal never arrives here, so
    /// everything starts immediately.
    Secondary,
    /// A helper sub-process of the application: starts nothing.
    Auxiliary,
}

impl ExecutionScope {
    /// Decide the scope of the current process.
    ///
    /// The primary user always gets the primary scope. For other users, a
    /// process named `<app_process_name>:<suffix>` is a helper sub-process and
    /// starts nothing; anything else is a secondary scope.
    pub fn detect(process_name: &str, app_process_name: &str, user_id: u32, primary_user_id: u32) -> Self {
        if user_id == primary_user_id {
            return ExecutionScope::Primary;
        }
        let is_subprocess = process_name
            .strip_prefix(app_process_name)
            .is_some_and(|rest| rest.starts_with(constants::SUBPROCESS_SEPARATOR));
        if is_subprocess {
            ExecutionScope::Auxiliary
        } else {
            ExecutionScope::Secondary
        }
    }
}

impl fmt::Display for ExecutionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionScope::Primary => write!(f, "primary"),
            ExecutionScope::Secondary => write!(f, "secondary"),
            ExecutionScope::Auxiliary => write!(f, "auxiliary"),
        }
    }
}

/// Facts about the hosting process, handed to every service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessContext {
    pub process_name: String,
    pub user_id: u32,
    pub scope: ExecutionScope,
}

impl ProcessContext {
    pub fn new(process_name: impl Into<String>, user_id: u32, scope: ExecutionScope) -> Self {
        Self {
            process_name: process_name.into(),
            user_id,
            scope,
        }
    }
}

/// What the orchestrator injects into a service when it is built.
#[derive(Clone)]
pub struct ServiceContext {
    capabilities: SharedCapabilityRegistry,
    process: Arc<ProcessContext>,
}

impl Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("process", &self.process)
            .finish_non_exhaustive()
    }
}

impl ServiceContext {
    pub fn new(capabilities: SharedCapabilityRegistry, process: Arc<ProcessContext>) -> Self {
        Self {
            capabilities,
            process,
        }
    }

    /// The capability registry shared by all services of this orchestrator.
    pub fn capabilities(&self) -> &SharedCapabilityRegistry {
        &self.capabilities
    }

    pub fn process(&self) -> &ProcessContext {
        &self.process
    }
}

/// Lifecycle contract every orchestrated service implements.
///
/// Hooks run inline on the control loop, one at a time. A hook that never
/// returns stalls the loop; there is no timeout.
#[async_trait]
pub trait ServiceComponent: Send + Sync + Debug {
    /// Stable identity, normally the descriptor name the service was built for.
    fn name(&self) -> &str;

    /// Called exactly once, right after construction.
    async fn start(&self) -> Result<(), BoxError>;

    /// Called exactly once after the readiness signal, for services of the
    /// primary scope.
    async fn on_boot_completed(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called for every configuration change once startup has run.
    async fn on_configuration_changed(&self, _config: &Configuration) {}
}

/// Capability: rebuilds resources whose text depends on the system locale,
/// such as user-visible notification channel names.
pub trait LocaleResourceRegenerator: Send + Sync {
    fn regenerate(&self, locale: &str) -> Result<(), BoxError>;
}

//! # Conductor Kernel
//!
//! The `kernel` module is the heart of `conductor-core`. It owns the ordered
//! set of long-lived services of one process and drives them through a
//! two-phase, boot-gated startup.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Service contract**: [`ServiceComponent`](component::ServiceComponent) with
//!   its `start`, `on_boot_completed` and `on_configuration_changed` hooks, and the
//!   [`ServiceContext`](component::ServiceContext) injected into every service.
//! - **Descriptors**: [`DescriptorTable`](descriptor::DescriptorTable) tags each
//!   configured name as BASE or DEFERRED; [`ServiceCatalog`](descriptor::ServiceCatalog)
//!   maps names to factories.
//! - **Capabilities**: [`SharedCapabilityRegistry`](registry::SharedCapabilityRegistry)
//!   lets services find each other by trait instead of by reference.
//! - **Readiness**: [`BootPhaseTracker`](boot::BootPhaseTracker) and the
//!   [`ReadinessProbe`](boot::ReadinessProbe) fast path.
//! - **Orchestration**: [`ServiceOrchestrator`](orchestrator::ServiceOrchestrator).
//! - **Diagnostics**: slow-start timing in the `diagnostics` submodule.
//! - **Error Handling**: kernel [`Error`](error::Error) and `Result` alias.
pub mod boot;
pub mod component;
pub mod constants;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod orchestrator;
pub mod registry;

pub use boot::{BootPhaseTracker, MarkerFileProbe, ReadinessProbe, StaticReadiness};
pub use component::{
    ExecutionScope, LocaleResourceRegenerator, ProcessContext, ServiceComponent, ServiceContext,
};
pub use descriptor::{DescriptorTable, Phase, ServiceCatalog, ServiceDescriptor, ServiceFactory};
pub use diagnostics::{BootEventLog, ServiceTiming, StartupDiagnostics, TimedStep, TimingSeverity};
pub use error::{BoxError, Error, KernelLifecyclePhase, Result};
pub use orchestrator::ServiceOrchestrator;
pub use registry::{CapabilityRegistry, SharedCapabilityRegistry};
// Test module declaration
#[cfg(test)]
pub(crate) mod tests;

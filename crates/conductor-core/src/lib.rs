pub mod event;
pub mod kernel;
pub mod plugin_system;
pub mod storage;

// Re-export key public types/traits for easier use by the binary and by services
pub use event::{ControlEvent, ControlLoop, EventSender, Configuration};
pub use kernel::error::Error as KernelError;
pub use kernel::{
    ExecutionScope, ProcessContext, ServiceCatalog, ServiceComponent, ServiceContext,
    ServiceOrchestrator, SharedCapabilityRegistry,
};
pub use plugin_system::{OverlayPlugin, PluginAttachmentTracker};
pub use storage::OrchestratorConfig;

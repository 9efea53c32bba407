//! Overlay plugins: the contracts plugins and surface providers implement,
//! and the tracker that attaches connected plugins to the primary UI service.
pub mod overlay;
pub mod traits;

pub use overlay::PluginAttachmentTracker;
pub use traits::{
    CollapseListener, OverlayPlugin, PluginContext, PluginHost, PluginListener, PrimaryUiService,
    SurfaceHandle, WindowStateManager,
};

// Test module declaration
#[cfg(test)]
pub(crate) mod tests;

//! Control events and the single-consumer loop that applies them.
pub mod dispatcher;
pub mod error;
pub mod types;

/// Re-export important types
pub use dispatcher::{ControlLoop, EventSender};
pub use error::EventSystemError;
pub use types::{Configuration, ControlEvent, EventResult};

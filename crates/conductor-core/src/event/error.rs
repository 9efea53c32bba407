//! # Conductor Event System Errors
//!
//! Defines error types specific to the control loop: delivering an event
//! into the queue after the loop has gone away.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventSystemError {
    #[error("Control loop is closed; event '{event_name}' was not delivered")]
    LoopClosed { event_name: &'static str },
}

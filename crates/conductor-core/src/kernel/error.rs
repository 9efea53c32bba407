//! # Conductor Kernel Errors
//!
//! Defines error types specific to the orchestration kernel.
//!
//! This module includes [`Error`], the primary enum encompassing the failures
//! the kernel treats as fatal: unresolvable service identities, service
//! constructors or `start()` hooks that fail, malformed descriptor tables and
//! operations invoked in the wrong execution scope. Duplicate signals and
//! absent capabilities are not errors.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::event::error::EventSystemError;
use crate::storage::error::ConfigError;

/// Boxed error returned by service constructors and lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the orchestration kernel.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase} for service '{}': {message}", service_name.as_deref().unwrap_or("<none>"))]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        service_name: Option<String>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The descriptor table names a service the catalog cannot build.
    #[error("Unknown service identity '{name}': no factory registered in the service catalog")]
    UnknownService { name: String },

    /// A registered factory failed to build its service.
    #[error("Failed to construct service '{name}': {source}")]
    ServiceConstruction {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The descriptor table is empty or contains duplicate names.
    #[error("Invalid descriptor table: {reason}")]
    InvalidDescriptorTable { reason: String },

    /// An operation was invoked on an orchestrator built for another scope.
    #[error("Operation '{operation}' is not available in the {scope} execution scope")]
    ScopeMismatch {
        operation: &'static str,
        scope: String,
    },

    /// Control loop error
    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// The service hook that was running when a lifecycle error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("start")]
    Start,
    #[error("boot completed")]
    BootCompleted,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    /// Wraps a failing lifecycle hook of a named service.
    pub fn lifecycle(
        phase: KernelLifecyclePhase,
        service_name: impl Into<String>,
        message: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        Error::KernelLifecycleError {
            phase,
            service_name: Some(service_name.into()),
            message: message.into(),
            source,
        }
    }

    /// Returns true for errors that come from static configuration rather than
    /// from a service misbehaving at runtime.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownService { .. }
                | Error::InvalidDescriptorTable { .. }
                | Error::Config(_)
        )
    }
}

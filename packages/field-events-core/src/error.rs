//! Dispatch error types.

use thiserror::Error;

use crate::phase::Phase;

/// Errors raised by change computation, registration and configuration.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Snapshot missing or not a field mapping
    #[error("Invalid {which} snapshot: {reason}")]
    InvalidSnapshot {
        which: &'static str,
        reason: String,
    },

    /// Unknown phase name
    #[error("Invalid phase '{0}'")]
    InvalidPhase(String),

    /// Handler name does not follow `<prefix><Field>`
    #[error("Invalid handler name '{0}'")]
    InvalidHandlerName(String),

    /// One or more handlers failed during a dispatch pass
    #[error("{} handler(s) failed during {phase}", failures.len())]
    HandlersFailed {
        phase: Phase,
        failures: Vec<HandlerFailure>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DispatchError {
    pub(crate) fn missing_snapshot(which: &'static str) -> Self {
        DispatchError::InvalidSnapshot {
            which,
            reason: "snapshot is absent".to_string(),
        }
    }
}

/// Error returned (or panic caught) inside a handler.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Handler reported a failure
    #[error("{0}")]
    Failed(String),

    /// Handler returned an underlying error
    #[error("{0}")]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// Handler panicked
    #[error("Handler panic: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// A handler failure tagged with the field and handler that produced it.
#[derive(Debug)]
pub struct HandlerFailure {
    /// Changed field the handler was resolved for
    pub field: String,
    /// Convention name of the handler, e.g. `onChangeStatus`
    pub handler: String,
    /// The error itself
    pub error: HandlerError,
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.handler, self.field, self.error)
    }
}

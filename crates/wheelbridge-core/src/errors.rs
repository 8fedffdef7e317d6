//! Bridge error taxonomy.
//!
//! Rate limiting and deduplication are deliberately absent: they are
//! successful no-ops, reported through [`crate::Admission`].

use std::time::Duration;

use thiserror::Error;

/// Most characters of client-supplied text echoed back in an error.
pub const ECHO_LIMIT: usize = 64;

/// `text` cut to [`ECHO_LIMIT`] characters, marked with `...` when cut.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(ECHO_LIMIT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_owned(),
    }
}

/// A payload that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The message was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// The message was JSON but not an object.
    #[error("expected a JSON object")]
    NotAnObject,
    /// A required field was absent.
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    /// A field was present with an unusable value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A free-text utterance matched no intent.
    #[error("no movement intent recognised in '{0}'")]
    Unrecognized(String),
}

impl InputError {
    /// An utterance that matched no intent, echoing at most [`ECHO_LIMIT`]
    /// characters of it.
    pub fn unrecognized(text: &str) -> Self {
        Self::Unrecognized(excerpt(text))
    }
}

/// The actuator did not confirm a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActuationError {
    /// The driver did not answer within the dispatch timeout.
    #[error("actuator timed out after {0:?}")]
    Timeout(Duration),
    /// The driver reported a failure.
    #[error("actuator failure: {0}")]
    Failure(String),
    /// The bridge is shutting down and no longer actuates.
    #[error("actuator halted")]
    Halted,
}

/// Every failure the bridge reports to a client or logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Bad payload shape; recovered locally, reported to the sender only.
    #[error(transparent)]
    MalformedInput(#[from] InputError),
    /// The actuator did not confirm; the connection stays open.
    #[error(transparent)]
    Actuation(#[from] ActuationError),
    /// The client channel is gone; terminal for that session only.
    #[error("transport closed")]
    TransportClosed,
    /// Some initialisation commands failed; the service still runs.
    #[error("startup degraded: {failed} of {total} initialisation commands failed")]
    StartupDegraded {
        /// Failed command count.
        failed: usize,
        /// Attempted command count.
        total: usize,
    },
}

impl BridgeError {
    /// Stable machine-readable code carried in failure envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::Actuation(ActuationError::Timeout(_)) => "ACTUATION_TIMEOUT",
            Self::Actuation(ActuationError::Failure(_)) => "ACTUATION_FAILURE",
            Self::Actuation(ActuationError::Halted) => "ACTUATOR_HALTED",
            Self::TransportClosed => "TRANSPORT_CLOSED",
            Self::StartupDegraded { .. } => "STARTUP_DEGRADED",
        }
    }
}

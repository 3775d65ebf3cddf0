use thiserror::Error;

/// Canonical error type for configuration and run-lifecycle faults.
///
/// Per-request failures never appear here: network errors and timeouts are
/// carried as data on [`RequestResult`](crate::result::RequestResult), and a
/// faulting check predicate becomes a failed
/// [`CheckOutcome`](crate::check::CheckOutcome). A run that has started
/// always finishes and produces a summary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Schedule or run configuration is malformed. Fatal, the run never starts.
    #[error("invalid schedule: {message}")]
    InvalidSchedule {
        /// Human-readable description of the malformed field.
        message: String,
    },

    /// Configuration sources could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Operation violates the orchestrator state machine.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Human-readable explanation of the invalid transition.
        message: String,
    },

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },
}

impl EngineError {
    /// Creates an `InvalidSchedule` variant.
    #[must_use]
    pub fn invalid_schedule(message: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            message: message.into(),
        }
    }

    /// Creates an `InvalidState` variant.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenient result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

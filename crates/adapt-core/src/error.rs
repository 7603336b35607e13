//! Unified error hierarchy for the adaptation engine.
//!
//! Every failure surfaced by the control loop is convertible to
//! [`AdaptError`] via `From` implementations. Errors are classified as
//! recoverable (the loop logs and continues with the next cycle) or
//! non-recoverable (startup must abort).

use thiserror::Error;

use crate::types::{ModelId, VersionId};

// ============================================================================
// SUB-ERRORS
// ============================================================================

/// Configuration errors.
///
/// A malformed configuration is fatal for the owning process; it is
/// never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration field is missing.
    #[error("Missing configuration field: {0}")]
    MissingField(String),

    /// A field value is outside its allowed range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The configuration payload could not be parsed.
    #[error("Unparseable configuration: {0}")]
    Parse(String),
}

/// Storage-backend errors shared by all store traits.
///
/// Implementations live outside this crate; the trait contracts here
/// only fix the failure vocabulary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("I/O error ({context}): {message}")]
    Io {
        /// What the store was doing when the failure occurred
        context: String,
        /// OS-level message
        message: String,
    },

    /// Persisted payload could not be serialized or deserialized.
    #[error("Serialization error ({context}): {message}")]
    Serde {
        /// What the store was doing when the failure occurred
        context: String,
        /// Parser message
        message: String,
    },

    /// A referenced artifact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Wrap an I/O error with its operation context.
    pub fn io(context: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Wrap a serde_json error with its operation context.
    pub fn serde(context: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::Serde {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

/// Opaque failure reported by the training collaborator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TrainingError(pub String);

impl TrainingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Executor errors.
///
/// These are caught at the cycle boundary, logged, and recorded as a
/// `Failed` audit event; they never crash the loop.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Writing the active-model pointer failed.
    #[error("Failed to update active-model pointer to {model}: {reason}")]
    PointerWrite {
        /// Intended new active model
        model: ModelId,
        /// Underlying failure
        reason: String,
    },

    /// Copying/activating a version artifact failed.
    #[error("Failed to activate version {version}: {reason}")]
    Activation {
        /// The version that could not be activated
        version: VersionId,
        /// Underlying failure
        reason: String,
    },

    /// The training collaborator reported a failure.
    #[error("Retraining of {family} failed: {reason}")]
    Training {
        /// Model family being retrained
        family: ModelId,
        /// Collaborator-provided message
        reason: String,
    },
}

// ============================================================================
// TOP-LEVEL UNIFIED ERROR TYPE
// ============================================================================

/// Top-level unified error type for the adaptation engine.
#[derive(Debug, Error)]
pub enum AdaptError {
    /// Configuration error. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage-backend error. Recoverable; the cycle is skipped.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Executor error. Recoverable; recorded as a failed audit event.
    #[error("Execution error: {0}")]
    Execute(#[from] ExecuteError),

    /// Input validation error (NaN metrics, empty windows, etc.).
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AdaptError {
    /// Whether the loop may continue after this error.
    ///
    /// Recoverable errors are swallowed at the cycle boundary; the
    /// next cycle proceeds normally. Non-recoverable errors must abort
    /// the owning process.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Store(_) | Self::Execute(_) | Self::Validation(_) => true,
        }
    }
}

/// Result alias used throughout the engine.
pub type AdaptResult<T> = Result<T, AdaptError>;

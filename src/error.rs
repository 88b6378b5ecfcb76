//! Error types for the payslip engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! and the stable [`ErrorKind`] taxonomy every failure maps onto.

use thiserror::Error;

use crate::store::StoreError;

/// The stable classification of every engine failure.
///
/// Callers (the HTTP layer in particular) decide how to present a failure
/// from its kind alone; the message is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-policy input.
    InvalidInput,
    /// The request collides with existing state.
    Conflict,
    /// A referenced entity does not exist.
    NotFound,
    /// Persistence or transaction failure not attributable to the caller.
    InternalFailure,
}

/// The main error type for the payslip engine.
///
/// # Example
///
/// ```
/// use payslip_engine::error::{EngineError, ErrorKind};
///
/// let error = EngineError::invalid_input("hours must be > 0 and <= 3");
/// assert_eq!(error.kind(), ErrorKind::InvalidInput);
/// assert_eq!(error.to_string(), "Invalid input: hours must be > 0 and <= 3");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input failed validation before any write happened.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// A description of what was wrong with the input.
        message: String,
    },

    /// The request conflicts with data that already exists.
    #[error("Conflict: {message}")]
    Conflict {
        /// A description of the conflict.
        message: String,
    },

    /// A referenced entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "attendance period").
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// An internal invariant was broken.
    #[error("Internal error: {message}")]
    Internal {
        /// A description of the failure.
        message: String,
    },

    /// The persistence layer rejected an operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for an [`EngineError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Shorthand for an [`EngineError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for an [`EngineError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidInput { .. } => ErrorKind::InvalidInput,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Store(
                StoreError::UniqueViolation { .. } | StoreError::SerializationFailure,
            ) => ErrorKind::Conflict,
            EngineError::Internal { .. }
            | EngineError::Store(_)
            | EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. } => ErrorKind::InternalFailure,
        }
    }

    /// Returns the violated constraint when this is a uniqueness violation.
    pub fn violated_constraint(&self) -> Option<&'static str> {
        match self {
            EngineError::Store(StoreError::UniqueViolation { constraint }) => Some(*constraint),
            _ => None,
        }
    }

    /// Whether a concurrent transaction forced this one to abort.
    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, EngineError::Store(StoreError::SerializationFailure))
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

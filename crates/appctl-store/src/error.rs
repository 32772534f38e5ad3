//! Store error types.
//!
//! Absence is not an error for reads (`get` returns `Ok(None)`); every
//! variant here is a failed interaction with the backing API.

use std::fmt;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The targeted object does not exist.
    #[error("{kind} {key} not found")]
    NotFound {
        /// Kind of the missing object.
        kind: String,
        /// `namespace/name` of the missing object.
        key: String,
    },

    /// Attempted to create an object whose key is already taken.
    #[error("{kind} {key} already exists")]
    AlreadyExists {
        /// Kind of the existing object.
        kind: String,
        /// `namespace/name` of the existing object.
        key: String,
    },

    /// A write targeted a stale version of the object.
    #[error("conflict writing {kind} {key}: {message}")]
    Conflict {
        /// Kind of the object.
        kind: String,
        /// `namespace/name` of the object.
        key: String,
        /// Backend description of the conflict.
        message: String,
    },

    /// The call was abandoned because the process is shutting down.
    #[error("{operation} cancelled")]
    Cancelled {
        /// The operation that was cancelled.
        operation: String,
    },

    /// The object handed to the store cannot be stored as-is.
    #[error("invalid object: {message}")]
    Invalid {
        /// Why the object was rejected.
        message: String,
    },

    /// The backing API answered with an error status.
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code.
        code: u16,
        /// Message returned by the API.
        message: String,
    },

    /// Failed to reach the backing API.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Failed to (de)serialize an object.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal store error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, key: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.to_string(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(kind: impl Into<String>, key: impl ToString) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            key: key.to_string(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(
        kind: impl Into<String>,
        key: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Creates a new `Cancelled` error.
    #[must_use]
    pub fn cancelled(operation: impl ToString) -> Self {
        Self::Cancelled {
            operation: operation.to_string(),
        }
    }

    /// Creates a new `Invalid` error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Creates a new `Api` error.
    #[must_use]
    pub fn api(code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a stale-version conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if the call was cancelled by shutdown.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } | Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::Invalid { .. } => ErrorCategory::Validation,
            Self::Api { .. } | Self::Connection { .. } => ErrorCategory::Infrastructure,
            Self::Serialization(_) | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of store errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Object not found.
    NotFound,
    /// Conflict (version or existence).
    Conflict,
    /// Cancelled by shutdown.
    Cancelled,
    /// Rejected object.
    Validation,
    /// API or connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

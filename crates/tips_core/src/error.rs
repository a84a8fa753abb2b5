//! Error types for tips core.

use std::fmt;
use thiserror::Error;

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// The kind of named resource an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A topic.
    Topic,
    /// A subscription within a topic.
    Subscription,
    /// A snapshot within a subscription.
    Snapshot,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Topic => "topic",
            Self::Subscription => "subscription",
            Self::Snapshot => "snapshot",
        };
        f.write_str(s)
    }
}

/// Transport-agnostic error category.
///
/// Callers that render errors into their own vocabulary (HTTP status codes,
/// exit codes, ...) should match on this rather than on [`BrokerError`]
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unknown topic, subscription or snapshot.
    NotFound,
    /// Duplicate creation where uniqueness is required.
    AlreadyExists,
    /// Empty name, non-positive limit, empty batch and similar.
    InvalidArgument,
    /// Unexpected failure inside the broker.
    Internal,
}

/// Errors that can occur in broker operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// A named resource does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// The kind of resource.
        kind: ResourceKind,
        /// The name that was looked up.
        name: String,
    },

    /// A named resource already exists.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists {
        /// The kind of resource.
        kind: ResourceKind,
        /// The conflicting name.
        name: String,
    },

    /// An argument was rejected.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// Unexpected internal failure.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl BrokerError {
    /// Creates a not found error.
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::AlreadyExists,
            Self::InvalidArgument { .. } => ErrorCategory::InvalidArgument,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns true if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BrokerError::not_found(ResourceKind::Topic, "t1");
        assert_eq!(err.to_string(), "topic 't1' not found");

        let err = BrokerError::already_exists(ResourceKind::Snapshot, "shot");
        assert_eq!(err.to_string(), "snapshot 'shot' already exists");
    }

    #[test]
    fn error_categories() {
        assert_eq!(
            BrokerError::not_found(ResourceKind::Subscription, "s").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            BrokerError::invalid_argument("limit").category(),
            ErrorCategory::InvalidArgument
        );
        assert_eq!(BrokerError::internal("boom").category(), ErrorCategory::Internal);
        assert!(BrokerError::not_found(ResourceKind::Topic, "t").is_not_found());
        assert!(!BrokerError::internal("x").is_not_found());
    }
}

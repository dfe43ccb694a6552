//! Error types for rulevault operations.
//!
//! Two layers of errors exist. [`StoreError`] is what a [`NodeStore`] reports;
//! [`RepositoryError`] is what callers of the item layer see. Absence of a
//! property ([`StoreError::PropertyNotFound`]) is never surfaced to callers:
//! the item layer turns it into `None` or an empty list.
//!
//! [`NodeStore`]: crate::traits::NodeStore

use thiserror::Error;
use tracing::error;

use crate::types::{NodeId, NodeKind};

/// Result type alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for node store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a node store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No node exists with this identifier.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// The node exists but does not carry the property.
    #[error("property '{property}' not found on node {node}")]
    PropertyNotFound { node: NodeId, property: String },

    /// A structural child (such as the frozen content of a version) is missing.
    #[error("child '{child}' not found under node {node}")]
    ChildNotFound { node: NodeId, child: String },

    /// The property exists but holds a value of another type.
    #[error("property '{property}' on node {node} is not a {expected}")]
    ValueType {
        node: NodeId,
        property: String,
        expected: &'static str,
    },

    /// Write attempted on a checked-in head node.
    #[error("node {0} is checked in; check it out before writing")]
    CheckedIn(NodeId),

    /// Check-in attempted while the node still has unsaved writes.
    #[error("node {0} has unsaved changes")]
    UnsavedChanges(NodeId),

    /// The operation does not apply to this kind of node.
    #[error("{kind} node {node} cannot be {operation}")]
    InvalidKind {
        node: NodeId,
        kind: NodeKind,
        operation: &'static str,
    },

    /// The store has no versioning capability.
    #[error("versioning is not supported by this node store")]
    VersioningUnsupported,

    /// Stored data violates a structural invariant.
    #[error("corrupted node {node}: {message}")]
    Corrupted { node: NodeId, message: String },

    /// A mutex guarding store state was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Record (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure inside the persistence backend.
    #[error("backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Create a backend error wrapping its cause.
    pub fn backend(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a property-not-found error.
    pub fn property_not_found(node: NodeId, property: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            node,
            property: property.into(),
        }
    }

    /// Whether this error only signals that a property does not exist.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::PropertyNotFound { .. })
    }
}

/// Turns property absence into `None`, leaving every other failure intact.
pub trait OptionalExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for StoreResult<T> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_absence() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Main error type for repository operations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The caller invoked an operation that is not allowed on this item.
    #[error("Usage error: {message}")]
    Usage { message: String, code: ErrorCode },

    /// The node store lacks a capability the operation needs.
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<StoreError>,
    },

    /// The node store failed.
    #[error("Store error: {message}")]
    Store {
        message: String,
        code: ErrorCode,
        #[source]
        source: StoreError,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Usage (USE_xxx)
    UseReadOnlyVersion,
    UseVersioningUnsupported,

    // Store (STORE_xxx)
    StoreOperationFailed,
    StoreCorrupted,
    StoreLockPoisoned,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValInvalidVersionNumber,
    ValFormatMismatch,

    // Configuration
    Configuration,

    // IO
    Io,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UseReadOnlyVersion => "USE_001",
            ErrorCode::UseVersioningUnsupported => "USE_002",
            ErrorCode::StoreOperationFailed => "STORE_001",
            ErrorCode::StoreCorrupted => "STORE_002",
            ErrorCode::StoreLockPoisoned => "STORE_003",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValInvalidVersionNumber => "VAL_002",
            ErrorCode::ValFormatMismatch => "VAL_003",
            ErrorCode::Configuration => "CFG_001",
            ErrorCode::Io => "IO_001",
        }
    }
}

impl RepositoryError {
    /// Create a usage error for a mutation of read-only history.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            code: ErrorCode::UseReadOnlyVersion,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error with a code and suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        code: ErrorCode,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Wrap a node store failure, logging it at the point of capture.
    ///
    /// A store without versioning support is reported as
    /// [`RepositoryError::UnsupportedOperation`] rather than a data error.
    pub fn store(context: &str, err: StoreError) -> Self {
        error!(error = %err, context, "node store failure");
        match err {
            StoreError::VersioningUnsupported => Self::UnsupportedOperation {
                message: format!(
                    "{context}: the node store does not support versioning"
                ),
                code: ErrorCode::UseVersioningUnsupported,
                source: Some(err),
            },
            StoreError::LockPoisoned(_) => Self::Store {
                message: format!("{context}: {err}"),
                code: ErrorCode::StoreLockPoisoned,
                source: err,
            },
            StoreError::Corrupted { .. } | StoreError::ChildNotFound { .. } => Self::Store {
                message: format!("{context}: {err}"),
                code: ErrorCode::StoreCorrupted,
                source: err,
            },
            _ => Self::Store {
                message: format!("{context}: {err}"),
                code: ErrorCode::StoreOperationFailed,
                source: err,
            },
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Usage { code, .. } => *code,
            Self::UnsupportedOperation { code, .. } => *code,
            Self::Store { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::Io(_) => ErrorCode::Io,
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Usage and capability errors indicate a programming mistake and never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => matches!(
                source,
                StoreError::Backend { .. } | StoreError::LockPoisoned(_)
            ),
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Usage { .. } => Some("Load the head version of the item before modifying it"),
            Self::UnsupportedOperation { .. } => {
                Some("Configure a node store with versioning support")
            }
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Configuration(_) => Some("Please check your repository configuration file"),
            _ => None,
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        Self::store("node store operation", err)
    }
}

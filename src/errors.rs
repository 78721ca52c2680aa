use std::borrow::Cow;

use thiserror::Error;

/// Top-level error type returned by Platemates store adapters.
///
/// The aggregation pipeline itself is pure and non-throwing; every variant
/// here originates at the store boundary. Read paths that feed the live
/// engine catch these and log instead of propagating (fail-soft reads),
/// while user-initiated writes surface them to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored document could not be decoded into its record type.
    #[error("malformed record: {0}")]
    Decode(#[from] serde_json::Error),

    /// Target record was not found when performing a mutation.
    #[error("record not found")]
    NotFound { entity_id: Option<String> },

    /// Invalid input supplied to a store operation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Catch-all for backend failures with no richer classification.
    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl StoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Collection of validation issues encountered while preparing a record.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result alias for store-facing operations.
pub type StoreResult<T> = Result<T, StoreError>;

//! Error types for the knowledge-base core.
//!
//! Mirrors the granularity of a domain-per-subsystem `thiserror` hierarchy:
//! each subsystem gets its own leaf enum, and [`Error`] wraps them. Callers
//! that only need a coarse category (for example an HTTP layer choosing a
//! status code) can call [`Error::kind`] instead of matching every variant.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification, independent of which subsystem raised it.
///
/// This is the `{InvalidInput, NotFound, DimensionMismatch,
/// DependencyUnavailable, Cancelled, DeadlineExceeded, Conflict, Fatal}`
/// taxonomy: a small, stable surface for callers that branch on category
/// rather than on leaf variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad UUID, empty mandatory field, malformed request.
    InvalidInput,
    /// Tenant/campaign/product missing after resolution.
    NotFound,
    /// Vector dimension mismatch during insert (search never raises this kind).
    DimensionMismatch,
    /// Embedder or external store failure.
    DependencyUnavailable,
    /// Context was cancelled before completion.
    Cancelled,
    /// Context deadline elapsed before completion.
    DeadlineExceeded,
    /// Publish/rollback contention on the single-published invariant.
    Conflict,
    /// Unreachable internal invariant breach.
    Fatal,
}

/// Top-level error type for the knowledge-base core.
#[derive(Error, Debug)]
pub enum Error {
    /// Vector adapter errors (insert/search/delete on the in-memory index).
    #[error("vector adapter error: {0}")]
    Vector(#[from] VectorError),

    /// Ingestion pipeline errors (parsing, normalizing, chunking, embedding, storing).
    #[error("ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    /// Retrieval router errors (intent classification, keyword/semantic lookup).
    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Drift detection errors.
    #[error("drift error: {0}")]
    Drift(#[from] DriftError),

    /// Purge errors.
    #[error("purge error: {0}")]
    Purge(#[from] PurgeError),

    /// Reference storage errors (the shipped `rusqlite`-backed repository implementation).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration validation errors.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input failed validation before any subsystem touched it.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of what was invalid.
        message: String,
    },

    /// A tenant/product/campaign could not be resolved.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// A dependency (embedder, external store) was unavailable.
    #[error("dependency unavailable: {message}")]
    DependencyUnavailable {
        /// Description of the unavailable dependency.
        message: String,
    },

    /// The operation was cancelled by its caller.
    #[error("cancelled: {message}")]
    Cancelled {
        /// Description of what was cancelled.
        message: String,
    },

    /// The operation's deadline elapsed before it completed.
    #[error("deadline exceeded: {message}")]
    DeadlineExceeded {
        /// Description of what timed out.
        message: String,
    },

    /// A single-writer invariant was contended (publish/rollback).
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// An internal invariant was violated. Should never happen.
    #[error("internal invariant breach: {message}")]
    Fatal {
        /// Description of the invariant that broke.
        message: String,
    },
}

impl Error {
    /// Classifies this error into the coarse [`ErrorKind`] taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Fatal { .. } => ErrorKind::Fatal,
            Self::Vector(VectorError::DimensionMismatch { .. }) => ErrorKind::DimensionMismatch,
            Self::Vector(_) => ErrorKind::Fatal,
            Self::Ingestion(_) | Self::Storage(_) => ErrorKind::DependencyUnavailable,
            Self::Retrieval(_) => ErrorKind::DependencyUnavailable,
            Self::Drift(_) | Self::Purge(_) => ErrorKind::DependencyUnavailable,
            Self::Config(_) => ErrorKind::InvalidInput,
        }
    }

    /// True if this error is recoverable via a fallback path (keyword-only
    /// results, partial batch aggregation, incomplete chunk persistence).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DependencyUnavailable | ErrorKind::Cancelled | ErrorKind::DeadlineExceeded
        )
    }
}

/// Vector adapter errors.
///
/// Per the spec, dimension mismatch during `Search` never produces an error
/// (it returns an empty result so keyword fallback stays viable) — this
/// variant is only raised by `Insert`.
#[derive(Error, Debug)]
pub enum VectorError {
    /// Insert rejected a vector whose dimension differs from the adapter's
    /// adopted dimension and from every currently stored vector.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the adapter currently has adopted.
        expected: usize,
        /// Dimension of the rejected vector.
        actual: usize,
    },

    /// The adapter was closed and can no longer be used.
    #[error("vector adapter is closed")]
    Closed,
}

/// Ingestion pipeline errors.
#[derive(Error, Debug)]
pub enum IngestionError {
    /// Markdown could not be parsed into frontmatter/tables/sections.
    #[error("markdown parse error: {0}")]
    ParseFailed(String),

    /// A spec table row was malformed (wrong column count, missing category).
    #[error("malformed spec row at line {line}: {reason}")]
    MalformedRow {
        /// Source line number (1-based) of the offending row.
        line: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// The embedder failed for an entire batch after exhausting retries.
    #[error("embedding batch failed after {attempts} attempts: {reason}")]
    EmbeddingBatchFailed {
        /// Number of attempts made.
        attempts: u32,
        /// Last observed failure reason.
        reason: String,
    },

    /// Publish/rollback could not find the target campaign.
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    /// Publish/rollback contention: another writer holds the single-writer lock.
    #[error(
        "publish conflict for (tenant={tenant}, product={product}, locale={locale}, trim={trim}, market={market})"
    )]
    PublishConflict {
        /// Tenant id.
        tenant: String,
        /// Product id.
        product: String,
        /// Locale.
        locale: String,
        /// Trim.
        trim: String,
        /// Market.
        market: String,
    },
}

/// Retrieval router errors.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// No embedder was configured and semantic search was required.
    #[error("no embedder configured")]
    NoEmbedder,

    /// The intent hint on the request was not a recognized intent.
    #[error("unrecognized intent hint: {0}")]
    UnrecognizedIntentHint(String),

    /// A structured batch request referenced zero spec names.
    #[error("structured batch request had no spec names")]
    EmptyBatchRequest,
}

/// Drift detection errors.
#[derive(Error, Debug)]
pub enum DriftError {
    /// The drift repository could not be queried.
    #[error("drift query failed: {0}")]
    QueryFailed(String),
}

/// Purge errors.
#[derive(Error, Debug)]
pub enum PurgeError {
    /// A table delete failed mid-purge. The purge stops at the first failing
    /// table to preserve referential order; tables before it are already committed.
    #[error("purge failed at table '{table}': {reason}")]
    TableFailed {
        /// Name of the table being purged when the failure occurred.
        table: String,
        /// Underlying failure reason.
        reason: String,
    },
}

/// Reference storage (the shipped `rusqlite`-backed implementation) errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Storage not initialized.
    #[error("store not initialized; call init() first")]
    NotInitialized,

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configured value was out of its valid range.
    #[error("invalid configuration for '{field}': {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// Why it's invalid.
        reason: String,
    },
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<regex::Error> for IngestionError {
    fn from(err: regex::Error) -> Self {
        Self::ParseFailed(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::DeadlineExceeded {
            message: "operation exceeded its configured timeout".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_classifies_correctly() {
        let err = Error::InvalidInput {
            message: "empty tenant_id".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn dependency_unavailable_is_recoverable() {
        let err = Error::DependencyUnavailable {
            message: "embedder timed out".to_string(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn vector_dimension_mismatch_classifies_as_dimension_mismatch() {
        let err: Error = VectorError::DimensionMismatch {
            expected: 768,
            actual: 1024,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn vector_closed_classifies_as_fatal() {
        let err: Error = VectorError::Closed.into();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn cancelled_and_deadline_are_recoverable() {
        assert!(
            Error::Cancelled {
                message: "ctx done".into()
            }
            .is_recoverable()
        );
        assert!(
            Error::DeadlineExceeded {
                message: "ctx done".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn conflict_is_not_recoverable_via_fallback() {
        let err = Error::Conflict {
            message: "already published".into(),
        };
        assert!(!err.is_recoverable());
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::NotInitialized;
        assert!(err.to_string().contains("init()"));
    }

    #[test]
    fn ingestion_publish_conflict_display() {
        let err = IngestionError::PublishConflict {
            tenant: "t1".into(),
            product: "p1".into(),
            locale: "en-US".into(),
            trim: "base".into(),
            market: "US".into(),
        };
        assert!(err.to_string().contains("t1"));
    }

    #[test]
    fn from_rusqlite_error() {
        let err: Error = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }
}

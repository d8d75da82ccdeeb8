//! Dynamic configuration structs.
//!
//! Per the Design Notes, "Dynamic configuration" is a struct enumerating
//! recognized options with explicit defaults — not a generic key/value bag.
//! Loading these from a file or environment is an external collaborator's
//! job; this module only defines and validates the shapes.

use crate::error::{ConfigError, Result};
use std::time::Duration;

/// Router-level configuration (`§9` "Dynamic configuration").
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Maximum semantic chunks returned by a single query (default 10; the
    /// router halves this to 3 when the best semantic score is poor).
    pub max_chunks: usize,
    /// Whether structured (keyword) lookup runs before semantic fallback.
    pub structured_first: bool,
    /// Whether semantic search runs when structured lookup found nothing.
    pub semantic_fallback: bool,
    /// Minimum classifier confidence to trust the classified intent; below
    /// this, intent is treated as `Unknown`.
    pub intent_confidence_threshold: f64,
    /// Minimum `KeywordConfidence` to treat structured facts as sufficient
    /// without also attaching semantic context.
    pub keyword_confidence_threshold: f64,
    /// Whether to read/write the response cache.
    pub cache_results: bool,
    /// Cache entry time-to-live.
    pub cache_ttl: Duration,
    /// Minimum confidence for an `Availability` of `Found`.
    pub min_availability_confidence: f64,
    /// Optional second threshold for `Availability::Partial`. Defaults to
    /// `0.5 * min_availability_confidence` (Open Question resolution, see
    /// DESIGN.md) when not set.
    pub min_partial_confidence: Option<f64>,
    /// Number of workers in the structured-batch worker pool.
    pub batch_processing_workers: usize,
    /// Aggregate timeout for a structured-batch fan-out.
    pub batch_processing_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_chunks: 10,
            structured_first: true,
            semantic_fallback: true,
            intent_confidence_threshold: 0.5,
            keyword_confidence_threshold: 0.4,
            cache_results: true,
            cache_ttl: Duration::from_secs(300),
            min_availability_confidence: 0.6,
            min_partial_confidence: None,
            batch_processing_workers: 8,
            batch_processing_timeout: Duration::from_secs(10),
        }
    }
}

impl RouterConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the max semantic chunks.
    #[must_use]
    pub const fn with_max_chunks(mut self, n: usize) -> Self {
        self.max_chunks = n;
        self
    }

    /// Sets the intent confidence threshold.
    #[must_use]
    pub const fn with_intent_confidence_threshold(mut self, t: f64) -> Self {
        self.intent_confidence_threshold = t;
        self
    }

    /// Sets the keyword confidence threshold.
    #[must_use]
    pub const fn with_keyword_confidence_threshold(mut self, t: f64) -> Self {
        self.keyword_confidence_threshold = t;
        self
    }

    /// Sets whether to use the response cache.
    #[must_use]
    pub const fn with_cache_results(mut self, enabled: bool) -> Self {
        self.cache_results = enabled;
        self
    }

    /// Sets the minimum availability confidence for `Found`.
    #[must_use]
    pub const fn with_min_availability_confidence(mut self, c: f64) -> Self {
        self.min_availability_confidence = c;
        self
    }

    /// Sets the batch worker pool size.
    #[must_use]
    pub const fn with_batch_processing_workers(mut self, n: usize) -> Self {
        self.batch_processing_workers = n;
        self
    }

    /// Resolves the `Partial` confidence threshold, defaulting to half of
    /// `min_availability_confidence` when not explicitly configured.
    #[must_use]
    pub fn resolved_min_partial_confidence(&self) -> f64 {
        self.min_partial_confidence
            .unwrap_or(0.5 * self.min_availability_confidence)
    }

    /// Validates this configuration, returning a descriptive error for the
    /// first invalid field found.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.intent_confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "intent_confidence_threshold".to_string(),
                reason: "must be within [0, 1]".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.keyword_confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "keyword_confidence_threshold".to_string(),
                reason: "must be within [0, 1]".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.min_availability_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "min_availability_confidence".to_string(),
                reason: "must be within [0, 1]".to_string(),
            }
            .into());
        }
        if self.batch_processing_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_processing_workers".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.max_chunks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_chunks".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Ingestion-pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Sliding-window chunk size (characters) for narrative (`global`) chunks.
    pub chunk_size: usize,
    /// Sliding-window overlap (characters) for narrative chunks.
    pub chunk_overlap: usize,
    /// Number of chunks per embedding batch (50-100, default 75).
    pub embedding_batch_size: usize,
    /// Maximum retry attempts for a failed embedding batch.
    pub max_embedding_retries: u32,
    /// Base backoff between embedding batch retries.
    pub retry_backoff_base: Duration,
    /// Maximum number of ingestion jobs processed concurrently.
    pub max_concurrent_jobs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            chunk_overlap: 150,
            embedding_batch_size: 75,
            max_embedding_retries: 3,
            retry_backoff_base: Duration::from_millis(200),
            max_concurrent_jobs: 4,
        }
    }
}

impl PipelineConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size".to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue {
                field: "chunk_overlap".to_string(),
                reason: "must be less than chunk_size".to_string(),
            }
            .into());
        }
        if !(50..=100).contains(&self.embedding_batch_size) {
            return Err(ConfigError::InvalidValue {
                field: "embedding_batch_size".to_string(),
                reason: "must be within [50, 100]".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Drift/purge configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftConfig {
    /// A published campaign older than this (by `effective_from`) is stale.
    pub freshness_threshold: Duration,
    /// Retention window: purge deletes rows older than `now - retention`.
    pub retention: Duration,
    /// Lineage/drift-alert grace period multiplier applied on top of `retention`.
    pub grace_period_multiplier: u32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            freshness_threshold: Duration::from_secs(30 * 24 * 3600),
            retention: Duration::from_secs(365 * 24 * 3600),
            grace_period_multiplier: 2,
        }
    }
}

impl DriftConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The grace-period cutoff used for lineage events and resolved drift alerts.
    #[must_use]
    pub fn grace_retention(&self) -> Duration {
        self.retention * self.grace_period_multiplier
    }
}

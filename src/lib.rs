//! # brochure-kb
//!
//! Hybrid structured/semantic retrieval core for a per-tenant,
//! multi-campaign product-brochure knowledge base.
//!
//! A caller ingests Markdown brochures per tenant/product/campaign-variant;
//! the ingestion pipeline normalizes, chunks, and embeds them into a
//! structured spec view plus a vector index. The retrieval router then
//! answers natural-language questions (or caller-supplied spec-name
//! batches) by blending keyword-first structured lookup with vector
//! fallback, ranked and grouped per tenant-scoped policy.
//!
//! ## Modules
//!
//! - [`model`]: tenant-scoped domain entities
//! - [`repository`]: capability interfaces for storage/search collaborators
//! - [`vector`]: in-memory cosine-similarity vector index
//! - [`embedding`]: the embedding capability interface and its reference implementation
//! - [`keyword`]: keyword extraction and spec-name normalization
//! - [`intent`]: rule-based intent classification
//! - [`router`]: the retrieval router (ranking, grouping, confidence)
//! - [`batch`]: structured batch mode over a caller-supplied spec-name list
//! - [`cache`]: the process-wide response cache
//! - [`ingestion`]: the Markdown ingestion pipeline
//! - [`drift`]: the drift runner
//! - [`purge`]: the retention purger
//! - [`storage`]: the `SQLite`-backed reference implementation of every repository trait
//! - [`cli`]: the thin demonstration command-line front end

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod drift;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod intent;
pub mod keyword;
pub mod model;
pub mod purge;
pub mod repository;
pub mod router;
pub mod storage;
pub mod vector;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export embedding types
pub use embedding::{DEFAULT_DIMENSION, Embedder, HashEmbedder, cosine_similarity};

// Re-export vector adapter types
pub use vector::{InMemoryVectorAdapter, SearchHit, VectorAdapter, VectorAttributes, VectorFilter};

// Re-export keyword/intent types
pub use intent::{ClassifiedIntent, Intent};
pub use keyword::{Keyword, NormalizedSpecName, SpecNormalizer, extract_keywords};

// Re-export router types
pub use router::{
    Availability, RequestFilters, RequestMode, RetrievalRequest, RetrievalResponse, Router, SemanticChunkResult,
    SpecAvailabilityEntry, StructuredFact,
};

// Re-export batch mode types
pub use batch::{BatchMode, BatchRequest, BatchResult, process_structured_specs};

// Re-export cache types
pub use cache::ResponseCache;

// Re-export drift/purge types
pub use drift::{DriftReport, Severity};
pub use purge::{PurgeCounts, PurgeReport};

// Re-export configuration types
pub use config::{DriftConfig, PipelineConfig, RouterConfig};

// Re-export ingestion pipeline types
pub use ingestion::chunker::{build_faq_chunks, build_feature_chunks, build_spec_row_chunks, build_usp_chunks};
pub use ingestion::dedup::{NormalizedRow, canonicalize_fields, canonicalize_row_text, content_hash, dedup_within_document};
pub use ingestion::markdown::{Frontmatter, ParsedDocument, RawBullet, RawFaq, RawSpecRow};
pub use ingestion::publish::{CampaignWriter, PublishKeyRef, Publisher};
pub use ingestion::{IngestRequest, Pipeline};

// Re-export storage types
pub use storage::SqliteStore;

//! Domain entities for the knowledge base.
//!
//! Every entity below carries a `tenant_id` (Invariant 1: "every
//! `SpecValue`, `KnowledgeChunk`, `FeatureBlock`, `USP`, `CampaignVariant`
//! carries a non-null `tenant_id`; all read paths must filter by it").

mod campaign;
mod chunk;
mod document;
mod feature;
mod job;
mod product;
mod spec;
mod tenant;

pub use campaign::{CampaignStatus, CampaignVariant, CampaignVariantId};
pub use chunk::{ChunkId, ChunkMetadata, ChunkType, CompletionStatus, KnowledgeChunk, Visibility};
pub use document::{DocumentSource, DocumentSourceId};
pub use feature::{FeatureBlock, Usp};
pub use job::{
    DriftAlert, DriftAlertKind, DriftAlertStatus, IngestionJob, IngestionJobId, JobState, LineageAction, LineageEvent,
};
pub use product::{Product, ProductId};
pub use spec::{SpecCategory, SpecCategoryId, SpecItem, SpecItemId, SpecValue, SpecValueId, SpecValueStatus};
pub use tenant::{Tenant, TenantId};

/// Returns the current unix timestamp in seconds.
///
/// Centralized so every entity's `created_at`/`updated_at` uses the same
/// clock source (teacher's `current_timestamp()` convention).
#[must_use]
pub fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

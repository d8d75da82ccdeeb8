//! Knowledge chunk: the addressable unit of retrievable text.

use super::{CampaignVariantId, ProductId, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Strongly-typed knowledge chunk identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    /// Generates a new random chunk id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of content a chunk holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// Narrative sliding-window chunk over bulleted sections.
    Global,
    /// One chunk per normalized 5-column spec table row.
    SpecRow,
    /// A unique-selling-point line.
    Usp,
    /// A bulleted feature line.
    Feature,
    /// A frequently-asked-question entry.
    Faq,
}

/// Retrieval visibility scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible only to the ingesting caller/session.
    Private,
    /// Visible to any caller within the owning tenant.
    TenantOnly,
    /// Visible to any caller (still tenant-scoped by Invariant 1).
    Public,
}

/// Whether a chunk's embedding completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// `embedding_vector` is present with the model's declared dimension.
    Complete,
    /// The row exists but embedding failed; eligible for retry.
    Incomplete,
}

/// Metadata carried on a chunk. For `spec_row` chunks, the four required
/// keys (Invariant 6) are always present; other chunk types leave them empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Top-level category, e.g. `"Exterior"`. Required for `spec_row`.
    pub parent_category: Option<String>,
    /// Sub-category, e.g. `"Colors"`. Required for `spec_row`.
    pub sub_category: Option<String>,
    /// The normalized spec name, e.g. `"Horsepower"`. Required for `spec_row`.
    pub specification_type: Option<String>,
    /// The value text. Required for `spec_row`.
    pub value: Option<String>,
    /// Ids of the `SpecValue` rows this chunk was derived from. Required for `spec_row`.
    pub parsed_spec_ids: Vec<super::SpecValueId>,
    /// Free-form additional metadata captured from the brochure's fifth column.
    pub additional_metadata: Option<BTreeMap<String, String>>,
}

impl ChunkMetadata {
    /// Builds the required metadata for a `spec_row` chunk (Invariant 6).
    #[must_use]
    pub fn spec_row(
        parent_category: impl Into<String>,
        sub_category: impl Into<String>,
        specification_type: impl Into<String>,
        value: impl Into<String>,
        parsed_spec_ids: Vec<super::SpecValueId>,
    ) -> Self {
        Self {
            parent_category: Some(parent_category.into()),
            sub_category: Some(sub_category.into()),
            specification_type: Some(specification_type.into()),
            value: Some(value.into()),
            parsed_spec_ids,
            additional_metadata: None,
        }
    }

    /// True if all four `spec_row`-required keys are present (Invariant 6).
    #[must_use]
    pub fn has_required_spec_row_keys(&self) -> bool {
        self.parent_category.is_some()
            && self.sub_category.is_some()
            && self.specification_type.is_some()
            && self.value.is_some()
    }
}

/// An addressable unit of retrievable text with optional embedding and
/// category metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk id.
    pub id: ChunkId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The product this chunk describes.
    pub product_id: ProductId,
    /// The campaign variant this chunk belongs to, if scoped to one.
    pub campaign_variant_id: Option<CampaignVariantId>,
    /// What kind of content this chunk holds.
    pub chunk_type: ChunkType,
    /// The chunk's text.
    pub text: String,
    /// Structured metadata.
    pub metadata: ChunkMetadata,
    /// Stable digest of the chunk's canonical textual form, used for
    /// cross-campaign dedup (Invariant 3) and hash-mismatch drift detection.
    pub content_hash: Option<String>,
    /// Embedding completion state (Invariant 4).
    pub completion_status: CompletionStatus,
    /// Name of the embedding model used, if embedded.
    pub embedding_model: Option<String>,
    /// Version of the embedding model/config used, if embedded.
    pub embedding_version: Option<String>,
    /// The embedding vector itself, if `completion_status == Complete`.
    pub embedding_vector: Option<Vec<f32>>,
    /// Source document identifier, if known.
    pub source_doc: Option<String>,
    /// Source page number, if known.
    pub source_page: Option<u32>,
    /// Retrieval visibility scope.
    pub visibility: Visibility,
    /// Creation timestamp (unix seconds).
    pub created_at: i64,
}

impl KnowledgeChunk {
    /// Creates a new, not-yet-embedded chunk.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        product_id: ProductId,
        campaign_variant_id: Option<CampaignVariantId>,
        chunk_type: ChunkType,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: ChunkId::new(),
            tenant_id,
            product_id,
            campaign_variant_id,
            chunk_type,
            text: text.into(),
            metadata: ChunkMetadata::default(),
            content_hash: None,
            completion_status: CompletionStatus::Incomplete,
            embedding_model: None,
            embedding_version: None,
            embedding_vector: None,
            source_doc: None,
            source_page: None,
            visibility: Visibility::TenantOnly,
            created_at: super::current_timestamp(),
        }
    }

    /// True if, per Invariant 4, the embedding is present with the expected dimension.
    #[must_use]
    pub fn is_complete_with_dimension(&self, dimension: usize) -> bool {
        self.completion_status == CompletionStatus::Complete
            && self
                .embedding_vector
                .as_ref()
                .is_some_and(|v| v.len() == dimension)
    }
}

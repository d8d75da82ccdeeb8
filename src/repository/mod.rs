//! Capability interfaces consumed by the router, batch processor, and
//! ingestion pipeline. Production wires these to an external store; tests
//! use the in-memory mocks defined alongside each trait's test module.
//!
//! Per the design notes, inheritance/duck typing in the source system
//! becomes these capability interfaces: swap an in-memory implementation
//! for tests against an external-store implementation for production
//! without touching callers.

use crate::error::Result;
use crate::model::{
    CampaignVariant, CampaignVariantId, ChunkId, DriftAlert, IngestionJob, KnowledgeChunk, LineageEvent, ProductId,
    SpecValue, SpecValueId, TenantId,
};
use async_trait::async_trait;

/// One row of the structured spec view: a denormalized projection of
/// `SpecValue` joined with its category and item display name, suited to
/// keyword search.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecViewRow {
    /// Id of the backing `SpecValue`, used for deterministic tie-breaks.
    pub spec_value_id: SpecValueId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The product this spec value describes.
    pub product_id: ProductId,
    /// The campaign variant this spec value belongs to.
    pub campaign_variant_id: CampaignVariantId,
    /// Spec category name.
    pub category: String,
    /// Spec item display name.
    pub name: String,
    /// The value as text.
    pub value_text: String,
    /// The value as a number, if numeric.
    pub value_numeric: Option<f64>,
    /// Unit of measure, if any.
    pub unit: Option<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Source document identifier, if known.
    pub source_doc: Option<String>,
    /// Source page number, if known.
    pub source_page: Option<u32>,
}

/// Read-only keyword search over the structured spec view (§6).
#[async_trait]
pub trait SpecViewRepository: Send + Sync {
    /// Returns up to `limit` rows for `tenant_id` whose category, name, or
    /// value text contains `keyword` (substring match; see §1 Non-goals —
    /// no full-text search beyond this).
    async fn search_by_keyword(&self, tenant_id: TenantId, keyword: &str, limit: usize) -> Result<Vec<SpecViewRow>>;
}

/// Campaign variant lookups (§6).
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Fetches a campaign variant by id.
    async fn get_campaign(&self, id: CampaignVariantId) -> Result<Option<CampaignVariant>>;

    /// Fetches the latest `published` variant for
    /// `(tenant, product, locale, trim, market)`.
    async fn get_latest_published_campaign(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        locale: &str,
        trim: &str,
        market: &str,
    ) -> Result<Option<CampaignVariant>>;

    /// Fetches the latest `published` variant for a given trim, irrespective
    /// of locale/market — used by the campaign fallback handler (§7 `NotFound`).
    async fn get_campaign_by_trim(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        trim: &str,
    ) -> Result<Option<CampaignVariant>>;
}

/// Knowledge chunk lookups consumed by the router and the retry path (§6).
#[async_trait]
pub trait KnowledgeChunkRepository: Send + Sync {
    /// Returns all embedded chunks for `tenant_id` restricted to `product_ids`.
    async fn get_with_embeddings_by_tenant_and_products(
        &self,
        tenant_id: TenantId,
        product_ids: &[ProductId],
    ) -> Result<Vec<KnowledgeChunk>>;

    /// Returns chunks persisted with `completion_status = incomplete`,
    /// eligible for a later embedding retry.
    async fn find_incomplete_chunks(&self, tenant_id: TenantId) -> Result<Vec<KnowledgeChunk>>;

    /// Fetches a single chunk by id, regardless of completion status.
    ///
    /// Used by the router to resolve a vector-search hit's text and
    /// metadata (§4.4).
    async fn get_chunk_by_id(&self, chunk_id: ChunkId) -> Result<Option<KnowledgeChunk>>;
}

/// Open drift alert lookups (§6).
#[async_trait]
pub trait DriftAlertRepository: Send + Sync {
    /// Returns all alerts with `status = open` for `tenant_id`.
    async fn get_open_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<DriftAlert>>;
}

/// Append-only lineage event sink (§6). Only the event contract is referenced
/// here; the audit/lineage writer itself is an external collaborator.
#[async_trait]
pub trait LineageRepository: Send + Sync {
    /// Appends one lineage event.
    async fn append(&self, event: LineageEvent) -> Result<()>;
}

/// A pre-computed comparison row, produced by the comparison materializer
/// (an external collaborator; only its store contract is referenced here).
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Products being compared.
    pub product_ids: Vec<ProductId>,
    /// Campaign variant scope, if any.
    pub campaign_variant_id: Option<CampaignVariantId>,
    /// Rendered comparison summary.
    pub summary: String,
    /// When this comparison was materialized (unix seconds).
    pub generated_at: i64,
}

/// Read-only lookup of pre-computed comparisons (§4.4 Comparison intent; §9
/// Open Questions — materialization and fallback handling are out of core scope).
#[async_trait]
pub trait ComparisonRepository: Send + Sync {
    /// Returns any pre-computed comparisons covering exactly `product_ids`
    /// for `tenant_id`.
    async fn get_precomputed(&self, tenant_id: TenantId, product_ids: &[ProductId]) -> Result<Vec<ComparisonRow>>;
}

/// Write-side storage contract consumed by the ingestion pipeline. Named
/// `ChunkWriter` per the capability-interface list, but also covers the
/// adjacent spec-value and job bookkeeping writes a store must provide.
#[async_trait]
pub trait ChunkWriter: Send + Sync {
    /// Inserts or replaces a knowledge chunk.
    async fn upsert_chunk(&self, chunk: KnowledgeChunk) -> Result<()>;

    /// Inserts or replaces a spec value row.
    async fn upsert_spec_value(&self, spec_value: SpecValue) -> Result<()>;

    /// Persists the current state of an ingestion job.
    async fn save_job(&self, job: IngestionJob) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockSpecView {
        rows: Vec<SpecViewRow>,
    }

    #[async_trait]
    impl SpecViewRepository for MockSpecView {
        async fn search_by_keyword(&self, tenant_id: TenantId, keyword: &str, limit: usize) -> Result<Vec<SpecViewRow>> {
            Ok(self
                .rows
                .iter()
                .filter(|r| r.tenant_id == tenant_id && r.name.to_lowercase().contains(&keyword.to_lowercase()))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn mock_spec_view_filters_by_tenant_and_keyword() {
        let tenant = TenantId::new();
        let other_tenant = TenantId::new();
        let product = ProductId::new();
        let campaign = CampaignVariantId::new();
        let row = SpecViewRow {
            spec_value_id: SpecValueId::new(),
            tenant_id: tenant,
            product_id: product,
            campaign_variant_id: campaign,
            category: "Engine".to_string(),
            name: "Horsepower".to_string(),
            value_text: "200 hp".to_string(),
            value_numeric: Some(200.0),
            unit: Some("hp".to_string()),
            confidence: 0.9,
            source_doc: None,
            source_page: None,
        };
        let other_row = SpecViewRow {
            tenant_id: other_tenant,
            ..row.clone()
        };
        let repo = MockSpecView {
            rows: vec![row, other_row],
        };

        let hits = repo.search_by_keyword(tenant, "horse", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tenant_id, tenant);
    }

    #[derive(Default)]
    struct MockLineage {
        events: Mutex<Vec<LineageEvent>>,
    }

    #[async_trait]
    impl LineageRepository for MockLineage {
        async fn append(&self, event: LineageEvent) -> Result<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn mock_lineage_appends_events() {
        let repo = MockLineage::default();
        let event = LineageEvent::new(
            TenantId::new(),
            crate::model::LineageAction::Created,
            "doc.md",
            "job-1",
            serde_json::json!({"count": 3}),
        );
        repo.append(event).await.unwrap();
        assert_eq!(repo.events.lock().unwrap().len(), 1);
    }
}

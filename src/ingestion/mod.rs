//! Ingestion Pipeline (§4.8): `Ingest(req)` — a staged pipeline over one
//! brochure document, with explicit per-job states (queued → parsing →
//! normalizing → chunking → embedding → storing → lineage → done|failed).

pub mod chunker;
pub mod dedup;
pub mod embed;
pub mod markdown;
pub mod publish;

use crate::config::PipelineConfig;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::keyword::SpecNormalizer;
use crate::model::{
    CampaignVariantId, IngestionJob, JobState, LineageAction, LineageEvent, ProductId, SpecItemId, SpecValue,
    SpecValueId, SpecValueStatus, TenantId,
};
use crate::repository::{ChunkWriter, LineageRepository};
use crate::vector::{VectorAdapter, VectorAttributes};
use dedup::NormalizedRow;
use markdown::RawSpecRow;
use serde_json::json;
use std::sync::Arc;
use std::sync::LazyLock;
use uuid::Uuid;

/// One ingestion request: a single brochure document scoped to a
/// tenant/product/campaign-variant.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The product this brochure describes.
    pub product_id: ProductId,
    /// The campaign variant these facts/chunks belong to.
    pub campaign_variant_id: CampaignVariantId,
    /// Raw Markdown document text.
    pub markdown: String,
    /// Source document identifier (uri, filename), if known.
    pub source_doc: Option<String>,
    /// Operator/job identifier recorded on lineage events.
    pub operator: String,
}

/// The ingestion pipeline: parses, normalizes, dedups, chunks, embeds, and
/// stores one document, emitting lineage as it goes.
pub struct Pipeline {
    writer: Arc<dyn ChunkWriter>,
    lineage: Arc<dyn LineageRepository>,
    vector_adapter: Arc<dyn VectorAdapter>,
    embedder: Arc<dyn Embedder>,
    config: PipelineConfig,
    normalizer: SpecNormalizer,
}

impl Pipeline {
    /// Builds a pipeline over its storage, vector, and embedding collaborators.
    #[must_use]
    pub fn new(
        writer: Arc<dyn ChunkWriter>,
        lineage: Arc<dyn LineageRepository>,
        vector_adapter: Arc<dyn VectorAdapter>,
        embedder: Arc<dyn Embedder>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            writer,
            lineage,
            vector_adapter,
            embedder,
            config,
            normalizer: SpecNormalizer::new(),
        }
    }

    /// Runs the full staged pipeline for `req`, returning the completed (or
    /// failed) job record. Partial embedding failures never abort the job
    /// (§4.8); only a parse failure does.
    pub async fn ingest(&self, req: IngestRequest) -> Result<IngestionJob> {
        let mut job = IngestionJob::new(req.tenant_id);
        self.writer.save_job(job.clone()).await?;

        job.advance(JobState::Parsing);
        self.writer.save_job(job.clone()).await?;
        let parsed = match markdown::parse(&req.markdown) {
            Ok(parsed) => parsed,
            Err(err) => {
                job.fail(err.to_string());
                self.writer.save_job(job.clone()).await?;
                return Err(err);
            }
        };

        job.advance(JobState::Normalizing);
        self.writer.save_job(job.clone()).await?;
        let normalized: Vec<NormalizedRow> = parsed
            .spec_rows
            .iter()
            .map(|row| normalize_row(&self.normalizer, row, req.tenant_id))
            .collect();

        job.advance(JobState::Chunking);
        self.writer.save_job(job.clone()).await?;
        let deduped = dedup::dedup_within_document(normalized);
        let rows_with_ids: Vec<(NormalizedRow, SpecValueId)> = deduped.into_iter().map(|row| (row, SpecValueId::new())).collect();

        let mut chunks = chunker::build_spec_row_chunks(
            req.tenant_id,
            req.product_id,
            req.campaign_variant_id,
            &rows_with_ids,
            req.source_doc.as_deref(),
        );
        chunks.extend(chunker::build_feature_chunks(
            req.tenant_id,
            req.product_id,
            req.campaign_variant_id,
            &parsed.features,
            &self.config,
            req.source_doc.as_deref(),
        ));
        chunks.extend(chunker::build_usp_chunks(
            req.tenant_id,
            req.product_id,
            req.campaign_variant_id,
            &parsed.usps,
            &self.config,
            req.source_doc.as_deref(),
        ));
        chunks.extend(chunker::build_faq_chunks(
            req.tenant_id,
            req.product_id,
            req.campaign_variant_id,
            &parsed.faqs,
            &self.config,
            req.source_doc.as_deref(),
        ));

        job.advance(JobState::Embedding);
        self.writer.save_job(job.clone()).await?;
        let outcome = embed::embed_chunks(self.embedder.as_ref(), chunks, &self.config).await;
        job.chunks_complete = outcome.complete.len();
        job.chunks_incomplete = outcome.incomplete.len();

        job.advance(JobState::Storing);
        self.writer.save_job(job.clone()).await?;
        for (row, spec_value_id) in &rows_with_ids {
            let spec_value = build_spec_value(row, *spec_value_id, &req);
            self.writer.upsert_spec_value(spec_value).await?;
        }
        for chunk in outcome.complete {
            let vector = chunk.embedding_vector.clone();
            let chunk_id = chunk.id;
            let attrs = VectorAttributes {
                tenant_id: chunk.tenant_id,
                product_id: chunk.product_id,
                campaign_variant_id: chunk.campaign_variant_id,
                chunk_type: chunk.chunk_type,
                visibility: chunk.visibility,
                embedding_version: chunk.embedding_version.clone().unwrap_or_default(),
            };
            self.writer.upsert_chunk(chunk).await?;
            if let Some(vector) = vector {
                self.vector_adapter.insert(chunk_id, vector, attrs).await?;
            }
        }
        for chunk in outcome.incomplete {
            self.writer.upsert_chunk(chunk).await?;
        }

        job.advance(JobState::Lineage);
        self.writer.save_job(job.clone()).await?;
        let payload = json!({
            "spec_rows": rows_with_ids.len(),
            "chunks_complete": job.chunks_complete,
            "chunks_incomplete": job.chunks_incomplete,
        });
        let event = LineageEvent::new(
            req.tenant_id,
            LineageAction::Created,
            req.source_doc.clone().unwrap_or_else(|| job.id.0.to_string()),
            req.operator.clone(),
            payload,
        );
        self.lineage.append(event).await?;

        job.advance(JobState::Done);
        self.writer.save_job(job.clone()).await?;
        Ok(job)
    }
}

static NUMERIC_VALUE: LazyLock<Option<regex::Regex>> = LazyLock::new(|| regex::Regex::new(r"^(-?\d+(?:\.\d+)?)\s*(.*)$").ok());

/// Parses a leading numeric magnitude and trailing unit out of a value
/// string, e.g. `"300 hp"` → `(Some(300.0), Some("hp"))`.
#[must_use]
fn parse_numeric_value(text: &str) -> (Option<f64>, Option<String>) {
    let Some(re) = NUMERIC_VALUE.as_ref() else {
        return (None, None);
    };
    let Some(caps) = re.captures(text.trim()) else {
        return (None, None);
    };
    let numeric = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
    let unit = caps.get(2).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()).map(str::to_string);
    (numeric, unit)
}

fn normalize_row(normalizer: &SpecNormalizer, row: &RawSpecRow, tenant_id: TenantId) -> NormalizedRow {
    let normalized_name = normalizer.normalize(&row.specification);
    let (value_numeric, unit) = parse_numeric_value(&row.value);
    let canonical_text = dedup::canonicalize_row_text(&row.parent_category, &normalized_name.canonical, &row.value, unit.as_deref());
    let content_hash = dedup::content_hash(tenant_id, &canonical_text);

    NormalizedRow {
        parent_category: row.parent_category.clone(),
        sub_category: row.sub_category.clone(),
        specification: normalized_name.canonical,
        value_text: row.value.clone(),
        value_numeric,
        unit,
        additional_metadata: row.additional_metadata.clone(),
        source_page: None,
        content_hash,
    }
}

fn build_spec_value(row: &NormalizedRow, spec_value_id: SpecValueId, req: &IngestRequest) -> SpecValue {
    SpecValue {
        id: spec_value_id,
        tenant_id: req.tenant_id,
        spec_item_id: SpecItemId(Uuid::new_v4()),
        product_id: req.product_id,
        campaign_variant_id: req.campaign_variant_id,
        category: row.parent_category.clone(),
        name: row.specification.clone(),
        value_text: row.value_text.clone(),
        value_numeric: row.value_numeric,
        unit: row.unit.clone(),
        confidence: 1.0,
        explanation: None,
        explanation_failed: false,
        status: SpecValueStatus::Active,
        version: 1,
        source_doc: req.source_doc.clone(),
        source_page: row.source_page,
        effective_from: crate::model::current_timestamp(),
        effective_through: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::model::{ChunkId, ChunkType, IngestionJob as _IngestionJob, KnowledgeChunk, ProductId, VectorFilter, Visibility};
    use crate::vector::InMemoryVectorAdapter;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockStore {
        chunks: Mutex<Vec<KnowledgeChunk>>,
        spec_values: Mutex<Vec<SpecValue>>,
        jobs: Mutex<Vec<IngestionJob>>,
    }

    #[async_trait]
    impl ChunkWriter for MockStore {
        async fn upsert_chunk(&self, chunk: KnowledgeChunk) -> Result<()> {
            self.chunks.lock().unwrap().push(chunk);
            Ok(())
        }
        async fn upsert_spec_value(&self, spec_value: SpecValue) -> Result<()> {
            self.spec_values.lock().unwrap().push(spec_value);
            Ok(())
        }
        async fn save_job(&self, job: IngestionJob) -> Result<()> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
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

    const DOC: &str = "---\nproduct: Explorer\nlocale: en-US\nmarket: US\ntrim: Limited\n---\n\n## Specifications\n\n| Category | Sub-Category | Specification | Value | Additional Metadata |\n|---|---|---|---|---|\n| Engine | Powertrain | Horsepower | 300 hp | |\n\n## Key Features\n\n- Panoramic sunroof\n\n## USPs\n\n- Best-in-class cargo space\n";

    #[tokio::test]
    async fn ingest_runs_to_done_and_stores_everything() {
        let store = Arc::new(MockStore::default());
        let lineage = Arc::new(MockLineage::default());
        let vector_adapter = Arc::new(InMemoryVectorAdapter::new());
        let embedder = Arc::new(HashEmbedder::new(32));
        let pipeline = Pipeline::new(store.clone(), lineage.clone(), vector_adapter.clone(), embedder, PipelineConfig::new());

        let req = IngestRequest {
            tenant_id: TenantId::new(),
            product_id: ProductId::new(),
            campaign_variant_id: CampaignVariantId::new(),
            markdown: DOC.to_string(),
            source_doc: Some("explorer-2026.md".to_string()),
            operator: "ingest-job-1".to_string(),
        };

        let job = pipeline.ingest(req).await.unwrap();
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.chunks_complete, 3); // spec_row + feature + usp
        assert_eq!(job.chunks_incomplete, 0);
        assert_eq!(store.spec_values.lock().unwrap().len(), 1);
        assert_eq!(store.chunks.lock().unwrap().len(), 3);
        assert_eq!(lineage.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ingest_fails_job_on_malformed_table() {
        let store = Arc::new(MockStore::default());
        let lineage = Arc::new(MockLineage::default());
        let vector_adapter = Arc::new(InMemoryVectorAdapter::new());
        let embedder = Arc::new(HashEmbedder::new(32));
        let pipeline = Pipeline::new(store.clone(), lineage, vector_adapter, embedder, PipelineConfig::new());

        let bad = "| Category | Sub-Category | Specification | Value | Additional Metadata |\n|---|---|---|---|---|\n| Engine |\n";
        let req = IngestRequest {
            tenant_id: TenantId::new(),
            product_id: ProductId::new(),
            campaign_variant_id: CampaignVariantId::new(),
            markdown: bad.to_string(),
            source_doc: None,
            operator: "ingest-job-2".to_string(),
        };

        assert!(pipeline.ingest(req).await.is_err());
        let jobs = store.jobs.lock().unwrap();
        assert_eq!(jobs.last().unwrap().state, JobState::Failed);
    }

    #[test]
    fn parses_numeric_and_unit_from_value() {
        assert_eq!(parse_numeric_value("300 hp"), (Some(300.0), Some("hp".to_string())));
        assert_eq!(parse_numeric_value("Red"), (None, None));
        assert_eq!(parse_numeric_value("18.5 cu ft"), (Some(18.5), Some("cu ft".to_string())));
    }

    #[tokio::test]
    async fn stored_complete_chunks_are_searchable_via_vector_adapter() {
        let store = Arc::new(MockStore::default());
        let lineage = Arc::new(MockLineage::default());
        let vector_adapter = Arc::new(InMemoryVectorAdapter::new());
        let embedder = Arc::new(HashEmbedder::new(32));
        let pipeline = Pipeline::new(store, lineage, vector_adapter.clone(), embedder.clone(), PipelineConfig::new());

        let tenant_id = TenantId::new();
        let req = IngestRequest {
            tenant_id,
            product_id: ProductId::new(),
            campaign_variant_id: CampaignVariantId::new(),
            markdown: DOC.to_string(),
            source_doc: None,
            operator: "ingest-job-3".to_string(),
        };
        pipeline.ingest(req).await.unwrap();

        let query = embedder.embed_single("Horsepower 300 hp").await.unwrap();
        let hits = vector_adapter
            .search(&query, 5, &VectorFilter::for_tenant(tenant_id))
            .await
            .unwrap();
        assert!(!hits.is_empty());
    }

    #[allow(dead_code)]
    fn unused_import_anchor(_: ChunkId, _: ChunkType, _: Visibility) {}
}

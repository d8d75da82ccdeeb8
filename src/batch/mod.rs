//! Structured Batch Mode (§4.5): `ProcessStructuredSpecs` fans a
//! caller-supplied list of spec names out to a bounded worker pool, then
//! aggregates per-spec availability, facts, and chunks.

use crate::error::Result;
use crate::keyword::{self, SpecNormalizer};
use crate::model::{CampaignVariantId, ProductId, TenantId};
use crate::router::{
    Availability, RequestFilters, RequestMode, RetrievalRequest, Router, SemanticChunkResult, SpecAvailabilityEntry,
    StructuredFact,
};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;

/// How the batch's caller wants its result rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Only the structured availability/facts/chunks are returned.
    Structured,
    /// Also produce a human-readable summary (§4.5 "In `hybrid` mode").
    Hybrid,
}

/// A structured batch request: a caller-supplied list of spec names.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Product scope.
    pub product_ids: Vec<ProductId>,
    /// Campaign variant scope, if any.
    pub campaign_variant_id: Option<CampaignVariantId>,
    /// Caller-supplied spec names, e.g. `["horsepower", "trunk capacity"]`.
    pub spec_names: Vec<String>,
    /// Rendering mode.
    pub mode: BatchMode,
}

/// The aggregated result of a structured batch run.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Per-spec availability classification, in request order.
    pub availability: Vec<SpecAvailabilityEntry>,
    /// Union of matched facts, deduped by `category:name:value`.
    pub structured_facts: Vec<StructuredFact>,
    /// Union of matched chunks, deduped by chunk id.
    pub semantic_chunks: Vec<SemanticChunkResult>,
    /// Human-readable summary, present only in [`BatchMode::Hybrid`].
    pub summary: Option<String>,
}

struct SubResult {
    spec_name: String,
    facts: Vec<StructuredFact>,
    chunks: Vec<SemanticChunkResult>,
    best_confidence: f64,
    alternative_names: Vec<String>,
}

/// `ProcessStructuredSpecs(req)` (§4.5).
pub async fn process_structured_specs(router: &Router, req: &BatchRequest) -> Result<BatchResult> {
    let normalizer = SpecNormalizer::new();
    let workers = router.config().batch_processing_workers;
    let timeout = router.config().batch_processing_timeout;

    let sub_requests: Vec<(String, Vec<String>)> = req
        .spec_names
        .iter()
        .map(|name| {
            let normalized = normalizer.normalize(name);
            (normalized.canonical, normalized.alternatives)
        })
        .collect();

    let parallel_run = run_pool(router, req, &sub_requests, workers);
    let results = match tokio::time::timeout(timeout, parallel_run).await {
        Ok(results) => results,
        Err(_) => run_sequential(router, req, &sub_requests).await,
    };

    let min_found = router.config().min_availability_confidence;
    let min_partial = router.config().resolved_min_partial_confidence();
    Ok(aggregate(req, results, min_found, min_partial))
}

/// Runs each sub-request with at most `workers` in flight concurrently
/// (§4.5 "a worker pool of `BatchProcessingWorkers`"). Cooperative bounded
/// concurrency over the shared `router` reference, rather than OS threads —
/// suspension points (repository/embedder/vector calls) are where workers
/// actually interleave.
async fn run_pool(router: &Router, req: &BatchRequest, sub_requests: &[(String, Vec<String>)], workers: usize) -> Vec<SubResult> {
    stream::iter(sub_requests.iter().cloned())
        .map(|(canonical, alternatives)| {
            let sub_req = build_sub_request(req, &canonical);
            async move { run_one(router, &sub_req, canonical, alternatives).await }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await
}

async fn run_sequential(router: &Router, req: &BatchRequest, sub_requests: &[(String, Vec<String>)]) -> Vec<SubResult> {
    let mut results = Vec::with_capacity(sub_requests.len());
    for (canonical, alternatives) in sub_requests {
        let sub_req = build_sub_request(req, canonical);
        results.push(run_one(router, &sub_req, canonical.clone(), alternatives.clone()).await);
    }
    results
}

fn build_sub_request(req: &BatchRequest, canonical: &str) -> RetrievalRequest {
    RetrievalRequest {
        tenant_id: req.tenant_id,
        product_ids: req.product_ids.clone(),
        campaign_variant_id: req.campaign_variant_id,
        question: canonical.to_string(),
        intent_hint: Some("spec_lookup".to_string()),
        conversation_context: vec![],
        filters: RequestFilters::default(),
        max_chunks: None,
        include_lineage: false,
        requested_specs: vec![],
        request_mode: RequestMode::Structured,
        competitor_names: vec![],
    }
}

async fn run_one(router: &Router, sub_req: &RetrievalRequest, canonical: String, alternatives: Vec<String>) -> SubResult {
    let keywords = keyword::extract_keywords(&sub_req.question);
    let (facts, _kw_confidence) = router.query_structured_specs(sub_req, &keywords).await.unwrap_or_default();

    let mut chunks = Vec::new();
    if facts.is_empty() {
        if let Ok((c, _)) = router.query_semantic_chunks(sub_req, &sub_req.filters, &keywords).await {
            chunks = c;
        }
    }

    let best_fact_confidence = facts.iter().map(|f| f.confidence).fold(0.0_f64, f64::max);
    let best_chunk_score = chunks.iter().map(|c| f64::from(c.score)).fold(0.0_f64, f64::max);
    let best_confidence = best_fact_confidence.max(best_chunk_score);

    SubResult {
        spec_name: canonical,
        facts,
        chunks,
        best_confidence,
        alternative_names: alternatives,
    }
}

fn aggregate(req: &BatchRequest, results: Vec<SubResult>, min_found: f64, min_partial: f64) -> BatchResult {
    let mut availability = Vec::with_capacity(results.len());
    let mut fact_map: HashMap<String, StructuredFact> = HashMap::new();
    let mut chunk_map: HashMap<crate::model::ChunkId, SemanticChunkResult> = HashMap::new();

    let mut found_names = Vec::new();
    let mut partial_names = Vec::new();
    let mut unavailable_names = Vec::new();

    for result in results {
        let status = if result.best_confidence >= min_found {
            found_names.push((result.spec_name.clone(), result.alternative_names.clone()));
            Availability::Found
        } else if result.best_confidence >= min_partial {
            partial_names.push((result.spec_name.clone(), result.alternative_names.clone()));
            Availability::Partial
        } else {
            unavailable_names.push((result.spec_name.clone(), result.alternative_names.clone()));
            Availability::Unavailable
        };

        let matched_specs: Vec<_> = result.facts.iter().map(|f| f.spec_value_id).collect();
        let matched_chunks: Vec<_> = result.chunks.iter().map(|c| c.chunk_id).collect();

        availability.push(SpecAvailabilityEntry {
            spec_name: result.spec_name,
            status,
            matched_specs,
            matched_chunks,
            confidence: result.best_confidence,
            alternative_names: result.alternative_names,
        });

        for fact in result.facts {
            let key = format!("{}:{}:{}", fact.category.to_lowercase(), fact.name.to_lowercase(), fact.value_text.to_lowercase());
            fact_map.entry(key).or_insert(fact);
        }
        for chunk in result.chunks {
            chunk_map.entry(chunk.chunk_id).or_insert(chunk);
        }
    }

    let summary = match req.mode {
        BatchMode::Structured => None,
        BatchMode::Hybrid => Some(render_summary(&found_names, &partial_names, &unavailable_names)),
    };

    BatchResult {
        availability,
        structured_facts: fact_map.into_values().collect(),
        semantic_chunks: chunk_map.into_values().collect(),
        summary,
    }
}

fn render_summary(
    found: &[(String, Vec<String>)],
    partial: &[(String, Vec<String>)],
    unavailable: &[(String, Vec<String>)],
) -> String {
    let mut lines = Vec::new();
    for (label, group) in [("Found", found), ("Partial", partial), ("Unavailable", unavailable)] {
        if group.is_empty() {
            continue;
        }
        lines.push(format!("{label}:"));
        for (name, alternatives) in group {
            if alternatives.is_empty() {
                lines.push(format!("  - {name}"));
            } else {
                let shown: Vec<&String> = alternatives.iter().take(3).collect();
                let alt_list = shown.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
                lines.push(format!("  - {name} (also known as: {alt_list})"));
            }
        }
    }
    lines.join("\n")
}

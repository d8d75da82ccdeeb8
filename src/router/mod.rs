//! The Retrieval Router (§4.4): intent routing, keyword-first structured
//! lookup, vector fallback, confidence, and caching.

pub mod confidence;
pub mod grouping;
pub mod ranking;

use crate::cache::ResponseCache;
use crate::config::RouterConfig;
use crate::embedding::Embedder;
use crate::error::{Result, RetrievalError};
use crate::intent::{self, Intent};
use crate::keyword::{self, Keyword};
use crate::model::{CampaignVariantId, ChunkId, ChunkType, KnowledgeChunk, ProductId, SpecValueId, TenantId, Visibility};
use crate::repository::{ComparisonRepository, ComparisonRow, KnowledgeChunkRepository, SpecViewRepository, SpecViewRow};
use crate::vector::{VectorAdapter, VectorFilter};
use std::sync::Arc;
use std::time::Instant;

/// A matched structured fact. Shares its shape with [`SpecViewRow`] — the
/// wire response surfaces the same fields the spec view indexes.
pub type StructuredFact = SpecViewRow;

/// One returned semantic chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticChunkResult {
    /// The source chunk's id.
    pub chunk_id: ChunkId,
    /// The chunk's type.
    pub chunk_type: ChunkType,
    /// The chunk's text.
    pub text: String,
    /// Cosine similarity score against the query embedding.
    pub score: f32,
    /// Parent category, for `spec_row` chunks.
    pub parent_category: Option<String>,
    /// Sub-category, for `spec_row` chunks.
    pub sub_category: Option<String>,
    /// Normalized spec name, for `spec_row` chunks.
    pub specification_type: Option<String>,
    /// Value text, for `spec_row` chunks.
    pub value: Option<String>,
    /// Ids of the `SpecValue` rows this chunk derives from.
    pub parsed_spec_ids: Vec<SpecValueId>,
    /// Retrieval visibility scope.
    pub visibility: Visibility,
}

/// Availability classification for one requested spec (§4.5, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Best match's confidence met `MinAvailabilityConfidence`.
    Found,
    /// Best match's confidence met the (lower) partial threshold.
    Partial,
    /// No sufficiently confident match was found.
    Unavailable,
}

/// One entry of `spec_availability` in the response (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct SpecAvailabilityEntry {
    /// The requested spec name, verbatim.
    pub spec_name: String,
    /// Availability classification.
    pub status: Availability,
    /// Ids of the matched `SpecValue` rows.
    pub matched_specs: Vec<SpecValueId>,
    /// Ids of the matched chunks.
    pub matched_chunks: Vec<ChunkId>,
    /// Confidence of the best match, or `0.0` if unavailable.
    pub confidence: f64,
    /// Alternative/variant names for the requested spec.
    pub alternative_names: Vec<String>,
}

/// How a request should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// A free-text question.
    NaturalLanguage,
    /// A list of `requested_specs` with no free text.
    Structured,
    /// Both a question and `requested_specs`; produces a human-readable summary.
    Hybrid,
}

/// Filters carried on a retrieval request.
#[derive(Debug, Clone, Default)]
pub struct RequestFilters {
    /// Restrict to these spec categories.
    pub categories: Vec<String>,
    /// Restrict to these chunk types.
    pub chunk_types: Vec<ChunkType>,
    /// Restrict `spec_row` chunks to this normalized spec name.
    pub specification_type: Option<String>,
}

/// The wire retrieval request (§6).
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Product scope.
    pub product_ids: Vec<ProductId>,
    /// Campaign variant scope, if any.
    pub campaign_variant_id: Option<CampaignVariantId>,
    /// The free-text question.
    pub question: String,
    /// An explicit intent hint, bypassing classification.
    pub intent_hint: Option<String>,
    /// Prior turns of conversation, for future context use.
    pub conversation_context: Vec<String>,
    /// Request-level filters.
    pub filters: RequestFilters,
    /// Maximum semantic chunks to return; defaults to the router config.
    pub max_chunks: Option<usize>,
    /// Whether to attach lineage events to the response.
    pub include_lineage: bool,
    /// Caller-supplied spec names for structured batch mode (§4.5).
    pub requested_specs: Vec<String>,
    /// How the request should be interpreted.
    pub request_mode: RequestMode,
    /// Known competitor names, used by the comparison intent family.
    pub competitor_names: Vec<String>,
}

impl RetrievalRequest {
    /// Creates a natural-language request with no filters or batch specs.
    #[must_use]
    pub fn new(tenant_id: TenantId, question: impl Into<String>) -> Self {
        Self {
            tenant_id,
            product_ids: vec![],
            campaign_variant_id: None,
            question: question.into(),
            intent_hint: None,
            conversation_context: vec![],
            filters: RequestFilters::default(),
            max_chunks: None,
            include_lineage: false,
            requested_specs: vec![],
            request_mode: RequestMode::NaturalLanguage,
            competitor_names: vec![],
        }
    }
}

/// The wire retrieval response (§6).
#[derive(Debug, Clone)]
pub struct RetrievalResponse {
    /// Classified (or hinted) intent.
    pub intent: Intent,
    /// Wall-clock latency of this query, in milliseconds.
    pub latency_ms: u64,
    /// Matched structured facts.
    pub structured_facts: Vec<StructuredFact>,
    /// Matched semantic chunks, ordered by group then rank.
    pub semantic_chunks: Vec<SemanticChunkResult>,
    /// Pre-computed comparisons, for the comparison intent.
    pub comparisons: Vec<ComparisonRow>,
    /// Lineage events, if requested.
    pub lineage: Option<Vec<crate::model::LineageEvent>>,
    /// Per-spec availability, for structured batch mode.
    pub spec_availability: Option<Vec<SpecAvailabilityEntry>>,
    /// Blended overall confidence in `[0, 1]`.
    pub overall_confidence: f64,
    /// Human-readable summary, for hybrid mode.
    pub summary: Option<String>,
    /// True if vector search contributed to this response (cache write gate).
    pub used_vector_search: bool,
}

/// Orchestrates intent routing, keyword search, vector fallback,
/// ranking/filtering, grouping, confidence, and caching.
pub struct Router {
    config: RouterConfig,
    spec_view: Arc<dyn SpecViewRepository>,
    vector_adapter: Arc<dyn VectorAdapter>,
    chunks: Arc<dyn KnowledgeChunkRepository>,
    embedder: Option<Arc<dyn Embedder>>,
    comparisons: Option<Arc<dyn ComparisonRepository>>,
    cache: ResponseCache,
}

impl Router {
    /// Builds a router over the given repositories.
    #[must_use]
    pub fn new(
        config: RouterConfig,
        spec_view: Arc<dyn SpecViewRepository>,
        vector_adapter: Arc<dyn VectorAdapter>,
        chunks: Arc<dyn KnowledgeChunkRepository>,
        embedder: Option<Arc<dyn Embedder>>,
        comparisons: Option<Arc<dyn ComparisonRepository>>,
    ) -> Self {
        Self {
            cache: ResponseCache::new(config.cache_ttl),
            config,
            spec_view,
            vector_adapter,
            chunks,
            embedder,
            comparisons,
        }
    }

    /// This router's configuration, for collaborators like the batch processor.
    #[must_use]
    pub(crate) const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Entry point (§4.4 `Query(req)`). Structured-batch requests
    /// (`requested_specs` non-empty) are expected to go through
    /// [`crate::batch::process_structured_specs`] instead, which calls back
    /// into [`Self::query_structured_specs`] / [`Self::query_semantic_chunks`]
    /// per spec sub-request.
    pub async fn query(&self, req: &RetrievalRequest) -> Result<RetrievalResponse> {
        let start = Instant::now();

        if !req.requested_specs.is_empty() {
            return Err(RetrievalError::EmptyBatchRequest.into());
        }

        let classified = intent::resolve(
            &req.question,
            req.intent_hint.as_deref(),
            &req.competitor_names,
            self.config.intent_confidence_threshold,
        );

        if self.config.cache_results
            && let Some(cached) = self.cache.get(req).await
        {
            let mut response = cached;
            response.latency_ms = elapsed_ms(start);
            return Ok(response);
        }

        let keywords = keyword::extract_keywords(&req.question);
        let mut used_vector_search = false;
        let mut structured_facts = Vec::new();
        let mut semantic_chunks = Vec::new();
        let mut comparisons = Vec::new();

        match classified.intent {
            Intent::UspLookup => {
                let mut filters = req.filters.clone();
                filters.chunk_types = vec![ChunkType::Usp];
                let (chunks, _) = self.query_semantic_chunks(req, &filters, &keywords).await?;
                semantic_chunks = chunks;
                used_vector_search = true;
            }
            Intent::Comparison => {
                if let Some(repo) = &self.comparisons {
                    comparisons = repo.get_precomputed(req.tenant_id, &req.product_ids).await?;
                }
                let (chunks, _) = self.query_semantic_chunks(req, &req.filters, &keywords).await?;
                semantic_chunks = chunks;
                used_vector_search = true;
            }
            Intent::SpecLookup | Intent::Unknown | Intent::Faq => {
                let (facts, kw_confidence) = self.query_structured_specs(req, &keywords).await?;
                structured_facts = facts;

                let should_fallback = structured_facts.is_empty() && self.config.semantic_fallback;
                let allow_extra_context =
                    !structured_facts.is_empty() && kw_confidence < self.config.keyword_confidence_threshold;

                if should_fallback || allow_extra_context {
                    let (mut chunks, _) = self.query_semantic_chunks(req, &req.filters, &keywords).await?;
                    if allow_extra_context && !should_fallback {
                        chunks.truncate(3);
                    }
                    semantic_chunks = chunks;
                    used_vector_search = true;
                }
            }
        }

        let max_fact_confidence = structured_facts.iter().map(|f| f.confidence).fold(None, |acc: Option<f64>, c| {
            Some(acc.map_or(c, |a: f64| a.max(c)))
        });
        #[allow(clippy::cast_precision_loss)]
        let mean_semantic_score = if semantic_chunks.is_empty() {
            None
        } else {
            Some(semantic_chunks.iter().map(|c| f64::from(c.score)).sum::<f64>() / semantic_chunks.len() as f64)
        };
        let overall_confidence = confidence::overall_confidence(max_fact_confidence, mean_semantic_score);

        let response = RetrievalResponse {
            intent: classified.intent,
            latency_ms: elapsed_ms(start),
            structured_facts,
            semantic_chunks,
            comparisons,
            lineage: None,
            spec_availability: None,
            overall_confidence,
            summary: None,
            used_vector_search,
        };

        if self.config.cache_results && used_vector_search {
            self.cache.put(req, response.clone()).await;
        }

        Ok(response)
    }

    /// `queryStructuredSpecs` (§4.4). Returns the ranked/filtered/capped
    /// facts plus the `KeywordConfidence` computed over them.
    pub(crate) async fn query_structured_specs(
        &self,
        req: &RetrievalRequest,
        keywords: &[Keyword],
    ) -> Result<(Vec<StructuredFact>, f64)> {
        if keywords.is_empty() {
            return Ok((vec![], 0.0));
        }

        let limit = if keywords.len() <= 1 { 50 } else { 100 };
        let mut merged: std::collections::HashMap<String, SpecViewRow> = std::collections::HashMap::new();

        for kw in keywords {
            for variant in keyword_variants(kw.text()) {
                let rows = self.spec_view.search_by_keyword(req.tenant_id, &variant, limit).await?;
                for row in rows {
                    if !req.product_ids.is_empty() && !req.product_ids.contains(&row.product_id) {
                        continue;
                    }
                    if let Some(cv) = req.campaign_variant_id
                        && row.campaign_variant_id != cv
                    {
                        continue;
                    }
                    let key = format!("{}|{}|{}", row.category.to_lowercase(), row.name.to_lowercase(), row.value_text.to_lowercase());
                    merged
                        .entry(key)
                        .and_modify(|existing| {
                            if row.confidence > existing.confidence {
                                *existing = row.clone();
                            }
                        })
                        .or_insert(row);
                }
            }
        }

        let rows: Vec<SpecViewRow> = merged.into_values().collect();
        let question_lower = req.question.to_lowercase();
        let ranked = ranking::rank_filter_and_cap(rows, keywords, &question_lower);
        let facts: Vec<StructuredFact> = ranked.iter().map(|(row, _)| row.clone()).collect();
        let kw_confidence = confidence::keyword_confidence(&facts, keywords, &question_lower);

        Ok((facts, kw_confidence))
    }

    /// `querySemanticChunks` (§4.4). Returns the chunks plus the best raw
    /// cosine score observed, for callers that need it (batch mode).
    pub(crate) async fn query_semantic_chunks(
        &self,
        req: &RetrievalRequest,
        filters: &RequestFilters,
        keywords: &[Keyword],
    ) -> Result<(Vec<SemanticChunkResult>, f32)> {
        let Some(embedder) = &self.embedder else {
            return Ok((vec![], 0.0));
        };

        let query_vector = embedder.embed_single(&req.question).await?;

        let mut vector_filter = VectorFilter::for_tenant(req.tenant_id);
        if !req.product_ids.is_empty() {
            vector_filter = vector_filter.with_products(req.product_ids.clone());
        }
        if let Some(cv) = req.campaign_variant_id {
            vector_filter = vector_filter.with_campaign(cv);
        }
        if !filters.chunk_types.is_empty() {
            vector_filter = vector_filter.with_chunk_types(filters.chunk_types.clone());
        }
        vector_filter = vector_filter.with_visibilities(vec![Visibility::TenantOnly, Visibility::Public]);

        let max_chunks = req.max_chunks.unwrap_or(self.config.max_chunks);
        let hits = self.vector_adapter.search(&query_vector, max_chunks.max(1), &vector_filter).await?;

        if hits.is_empty() {
            return Ok((vec![], 0.0));
        }

        let best_score = hits.iter().map(|h| h.score).fold(f32::MIN, f32::max);
        let (min_score, cap) = adaptive_threshold(best_score);

        let question_lower = req.question.to_lowercase();
        let mut results: Vec<SemanticChunkResult> = Vec::new();

        for hit in hits {
            if hit.score < min_score {
                continue;
            }
            let Some(chunk) = self.chunks.get_chunk_by_id(hit.chunk_id).await? else {
                continue;
            };
            let candidate = semantic_chunk_result(chunk, hit.score);

            let no_keyword_present = !keywords.iter().any(|k| candidate.text.to_lowercase().contains(k.text()));
            if no_keyword_present && f64::from(candidate.score) < 0.5 && !candidate.text.is_empty() {
                continue;
            }

            let _ = &question_lower;
            results.push(candidate);
        }

        results.truncate(cap);

        if results.iter().any(|r| r.chunk_type == ChunkType::SpecRow) {
            results = grouping::apply(results);
        }

        Ok((results, best_score))
    }
}

/// Builds a candidate result from a resolved chunk and its raw search score.
fn semantic_chunk_result(chunk: KnowledgeChunk, score: f32) -> SemanticChunkResult {
    SemanticChunkResult {
        chunk_id: chunk.id,
        chunk_type: chunk.chunk_type,
        text: chunk.text,
        score,
        parent_category: chunk.metadata.parent_category,
        sub_category: chunk.metadata.sub_category,
        specification_type: chunk.metadata.specification_type,
        value: chunk.metadata.value,
        parsed_spec_ids: chunk.metadata.parsed_spec_ids,
        visibility: chunk.visibility,
    }
}

/// Adaptive minimum score derived from the best observed score (§4.4), and
/// the accompanying result cap.
fn adaptive_threshold(best_score: f32) -> (f32, usize) {
    if best_score > 0.6 {
        (0.65 * best_score, 10)
    } else if best_score > 0.4 {
        (0.75 * best_score, 10)
    } else if best_score > 0.3 {
        (0.8 * best_score, 10)
    } else {
        (0.25, 3)
    }
}

/// Irregular-plural and color-spelling variants used to expand a keyword
/// before calling the spec view (§4.4 `queryStructuredSpecs`).
fn keyword_variants(keyword: &str) -> Vec<String> {
    let mut variants = vec![keyword.to_string()];

    const IRREGULAR: &[(&str, &str)] = &[("child", "children"), ("baby", "babies"), ("person", "people")];
    for (singular, plural) in IRREGULAR {
        if keyword == *singular {
            variants.push((*plural).to_string());
        } else if keyword == *plural {
            variants.push((*singular).to_string());
        }
    }

    if keyword.len() > 1 {
        if let Some(stripped) = keyword.strip_suffix('s') {
            variants.push(stripped.to_string());
        } else {
            variants.push(format!("{keyword}s"));
        }
    }

    match keyword {
        "color" => variants.push("colour".to_string()),
        "colour" => variants.push("color".to_string()),
        "colors" => variants.push("colours".to_string()),
        "colours" => variants.push("colors".to_string()),
        _ => {}
    }

    variants.sort();
    variants.dedup();
    variants
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_threshold_tiers() {
        assert_eq!(adaptive_threshold(0.8).1, 10);
        assert!((adaptive_threshold(0.8).0 - 0.52).abs() < 1e-6);
        assert_eq!(adaptive_threshold(0.2).1, 3);
    }

    #[test]
    fn keyword_variants_include_color_spelling() {
        let variants = keyword_variants("color");
        assert!(variants.contains(&"colour".to_string()));
    }

    #[test]
    fn keyword_variants_include_irregular_plural() {
        let variants = keyword_variants("child");
        assert!(variants.contains(&"children".to_string()));
    }
}

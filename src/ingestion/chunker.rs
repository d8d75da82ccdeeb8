//! Stage 4, `Chunk` (§4.8): `spec_row` chunks (one per normalized row) and
//! narrative chunks over bulleted features/USPs/FAQs, sliding-windowed per
//! `ChunkSize`/`ChunkOverlap`. Feature and USP lines carry a `Key Feature:`/
//! `USP:` retrieval-boost prefix.

use super::dedup::{canonicalize_fields, content_hash, NormalizedRow};
use super::markdown::{RawBullet, RawFaq};
use crate::config::PipelineConfig;
use crate::model::{CampaignVariantId, ChunkMetadata, ChunkType, KnowledgeChunk, ProductId, SpecValueId, TenantId, Visibility};

/// Builds one `spec_row` chunk per `(row, spec_value_id)` pair (Invariant 6:
/// all four required metadata keys are always set).
#[must_use]
pub fn build_spec_row_chunks(
    tenant_id: TenantId,
    product_id: ProductId,
    campaign_variant_id: CampaignVariantId,
    rows: &[(NormalizedRow, SpecValueId)],
    source_doc: Option<&str>,
) -> Vec<KnowledgeChunk> {
    rows.iter()
        .map(|(row, spec_value_id)| {
            let text = format!("{} / {}: {} is {}", row.parent_category, row.sub_category, row.specification, row.value_text);
            let mut chunk = KnowledgeChunk::new(tenant_id, product_id, Some(campaign_variant_id), ChunkType::SpecRow, text);
            chunk.metadata = ChunkMetadata::spec_row(
                row.parent_category.clone(),
                row.sub_category.clone(),
                row.specification.clone(),
                row.value_text.clone(),
                vec![*spec_value_id],
            );
            chunk.content_hash = Some(row.content_hash.clone());
            chunk.source_doc = source_doc.map(str::to_string);
            chunk.source_page = row.source_page;
            chunk.visibility = Visibility::TenantOnly;
            chunk
        })
        .collect()
}

/// Builds sliding-window narrative chunks for one labeled stream (features,
/// USPs, or FAQs), each carrying `chunk_type` and content-hashed text.
fn build_narrative_stream(
    tenant_id: TenantId,
    product_id: ProductId,
    campaign_variant_id: CampaignVariantId,
    chunk_type: ChunkType,
    lines: &[String],
    config: &PipelineConfig,
    source_doc: Option<&str>,
) -> Vec<KnowledgeChunk> {
    if lines.is_empty() {
        return Vec::new();
    }
    let joined = lines.join("\n");
    sliding_window(&joined, config.chunk_size, config.chunk_overlap)
        .into_iter()
        .map(|text| {
            let mut chunk = KnowledgeChunk::new(tenant_id, product_id, Some(campaign_variant_id), chunk_type, text.clone());
            let canonical = canonicalize_fields(&["narrative", chunk_type_label(chunk_type), &text]);
            chunk.content_hash = Some(content_hash(tenant_id, &canonical));
            chunk.source_doc = source_doc.map(str::to_string);
            chunk.visibility = Visibility::TenantOnly;
            chunk
        })
        .collect()
}

fn chunk_type_label(chunk_type: ChunkType) -> &'static str {
    match chunk_type {
        ChunkType::Feature => "feature",
        ChunkType::Usp => "usp",
        ChunkType::Faq => "faq",
        ChunkType::Global => "global",
        ChunkType::SpecRow => "spec_row",
    }
}

/// Builds the `Key Feature:`-prefixed feature chunk stream.
#[must_use]
pub fn build_feature_chunks(
    tenant_id: TenantId,
    product_id: ProductId,
    campaign_variant_id: CampaignVariantId,
    features: &[RawBullet],
    config: &PipelineConfig,
    source_doc: Option<&str>,
) -> Vec<KnowledgeChunk> {
    let lines: Vec<String> = features.iter().map(|f| format!("Key Feature: {}", f.body)).collect();
    build_narrative_stream(tenant_id, product_id, campaign_variant_id, ChunkType::Feature, &lines, config, source_doc)
}

/// Builds the `USP:`-prefixed USP chunk stream.
#[must_use]
pub fn build_usp_chunks(
    tenant_id: TenantId,
    product_id: ProductId,
    campaign_variant_id: CampaignVariantId,
    usps: &[RawBullet],
    config: &PipelineConfig,
    source_doc: Option<&str>,
) -> Vec<KnowledgeChunk> {
    let lines: Vec<String> = usps.iter().map(|u| format!("USP: {}", u.body)).collect();
    build_narrative_stream(tenant_id, product_id, campaign_variant_id, ChunkType::Usp, &lines, config, source_doc)
}

/// Builds the FAQ chunk stream, one `Q:`/`A:` pair per line entry.
#[must_use]
pub fn build_faq_chunks(
    tenant_id: TenantId,
    product_id: ProductId,
    campaign_variant_id: CampaignVariantId,
    faqs: &[RawFaq],
    config: &PipelineConfig,
    source_doc: Option<&str>,
) -> Vec<KnowledgeChunk> {
    let lines: Vec<String> = faqs.iter().map(|f| format!("Q: {} A: {}", f.question, f.answer)).collect();
    build_narrative_stream(tenant_id, product_id, campaign_variant_id, ChunkType::Faq, &lines, config, source_doc)
}

/// UTF-8-boundary-safe sliding window over `text`: windows of `size`
/// characters (bytes, snapped to the nearest valid boundary) with `overlap`
/// characters shared between consecutive windows.
fn sliding_window(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.len() <= size {
        return vec![text.to_string()];
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let target_end = (start + size).min(text.len());
        let end = snap_to_char_boundary(text, target_end);
        windows.push(text[start..end].to_string());
        if end >= text.len() {
            break;
        }
        let next_start = start + step;
        start = snap_to_char_boundary(text, next_start.min(end));
        if start == 0 {
            break;
        }
    }
    windows
}

fn snap_to_char_boundary(text: &str, mut pos: usize) -> usize {
    pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_returns_whole_text_when_short() {
        let windows = sliding_window("short text", 1200, 150);
        assert_eq!(windows, vec!["short text".to_string()]);
    }

    #[test]
    fn sliding_window_overlaps_consecutive_chunks() {
        let text = "a".repeat(100);
        let windows = sliding_window(&text, 40, 10);
        assert!(windows.len() > 1);
        for pair in windows.windows(2) {
            assert!(pair[0].len() <= 40);
        }
    }

    #[test]
    fn sliding_window_respects_utf8_boundaries() {
        let text = "é".repeat(50); // 2 bytes each
        let windows = sliding_window(&text, 7, 2);
        for w in &windows {
            assert!(w.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn feature_chunks_carry_key_feature_prefix() {
        let config = PipelineConfig::new();
        let features = vec![RawBullet {
            body: "Panoramic sunroof".to_string(),
            category: None,
        }];
        let chunks = build_feature_chunks(TenantId::new(), ProductId::new(), CampaignVariantId::new(), &features, &config, None);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Key Feature: Panoramic sunroof"));
        assert_eq!(chunks[0].chunk_type, ChunkType::Feature);
    }

    #[test]
    fn usp_chunks_carry_usp_prefix_and_type() {
        let config = PipelineConfig::new();
        let usps = vec![RawBullet {
            body: "Best-in-class cargo space".to_string(),
            category: None,
        }];
        let chunks = build_usp_chunks(TenantId::new(), ProductId::new(), CampaignVariantId::new(), &usps, &config, None);
        assert_eq!(chunks[0].chunk_type, ChunkType::Usp);
        assert!(chunks[0].text.starts_with("USP:"));
    }

    #[test]
    fn spec_row_chunks_have_required_metadata_keys() {
        let row = NormalizedRow {
            parent_category: "Engine".to_string(),
            sub_category: "Powertrain".to_string(),
            specification: "Horsepower".to_string(),
            value_text: "300 hp".to_string(),
            value_numeric: Some(300.0),
            unit: Some("hp".to_string()),
            additional_metadata: None,
            source_page: None,
            content_hash: "abc".to_string(),
        };
        let chunks = build_spec_row_chunks(
            TenantId::new(),
            ProductId::new(),
            CampaignVariantId::new(),
            &[(row, SpecValueId::new())],
            None,
        );
        assert!(chunks[0].metadata.has_required_spec_row_keys());
    }
}

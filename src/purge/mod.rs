//! Purger (§4.9, §3 Invariant 7): ordered, referential-integrity-respecting
//! deletion of everything strictly older than a retention cutoff.

use crate::config::DriftConfig;
use crate::error::Result;
use crate::model::TenantId;
use async_trait::async_trait;
use serde_json::json;

/// One row per table in the exact deletion order required by Invariant 7.
/// The purger calls these in this order and stops at the first table whose
/// delete fails, since later tables may reference earlier ones.
#[async_trait]
pub trait PurgeRepository: Send + Sync {
    /// Counts (and, unless `dry_run`, deletes) chunks older than `cutoff`.
    async fn purge_chunks(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes feature blocks older than `cutoff`.
    async fn purge_feature_blocks(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes spec values older than `cutoff`.
    async fn purge_spec_values(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes comparison rows older than `cutoff`.
    async fn purge_comparison_rows(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes draft or archived campaigns older than `cutoff`.
    /// Published campaigns are never eligible.
    async fn purge_campaigns(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes products with no published campaign, older than `cutoff`.
    async fn purge_products(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes document sources older than `cutoff`.
    async fn purge_document_sources(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes ingestion jobs older than `cutoff`.
    async fn purge_ingestion_jobs(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes lineage events older than `grace_cutoff`.
    async fn purge_lineage(&self, tenant_id: TenantId, grace_cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Counts/deletes resolved drift alerts older than `grace_cutoff`.
    /// Open alerts are never eligible.
    async fn purge_drift_alerts(&self, tenant_id: TenantId, grace_cutoff: i64, dry_run: bool) -> Result<usize>;
    /// Records a single audit event summarizing this purge run's per-table
    /// counts. Not called when `dry_run` (§4.9 "`--dry-run` computes counts
    /// without deletes").
    async fn record_audit_event(&self, tenant_id: TenantId, counts: &PurgeCounts) -> Result<()>;
}

/// Per-table row counts from one purge run, in the Invariant 7 order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    /// Chunks deleted/counted.
    pub chunks: usize,
    /// Feature blocks (and USPs) deleted/counted.
    pub feature_blocks: usize,
    /// Spec values deleted/counted.
    pub spec_values: usize,
    /// Comparison rows deleted/counted.
    pub comparison_rows: usize,
    /// Campaigns deleted/counted.
    pub campaigns: usize,
    /// Products deleted/counted.
    pub products: usize,
    /// Document sources deleted/counted.
    pub document_sources: usize,
    /// Ingestion jobs deleted/counted.
    pub ingestion_jobs: usize,
    /// Lineage events deleted/counted.
    pub lineage: usize,
    /// Drift alerts deleted/counted.
    pub drift_alerts: usize,
}

impl PurgeCounts {
    /// Sum across all tables, used in the audit event payload.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.chunks
            + self.feature_blocks
            + self.spec_values
            + self.comparison_rows
            + self.campaigns
            + self.products
            + self.document_sources
            + self.ingestion_jobs
            + self.lineage
            + self.drift_alerts
    }

    /// Renders these counts as a JSON payload, for use by `record_audit_event`
    /// implementations.
    #[must_use]
    pub fn to_json(self) -> serde_json::Value {
        json!({
            "chunks": self.chunks,
            "feature_blocks": self.feature_blocks,
            "spec_values": self.spec_values,
            "comparison_rows": self.comparison_rows,
            "campaigns": self.campaigns,
            "products": self.products,
            "document_sources": self.document_sources,
            "ingestion_jobs": self.ingestion_jobs,
            "lineage": self.lineage,
            "drift_alerts": self.drift_alerts,
            "total": self.total(),
        })
    }
}

/// The outcome of one purge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    /// Per-table counts, in Invariant 7 order.
    pub counts: PurgeCounts,
    /// True if this was a dry run (no rows actually deleted, no audit event).
    pub dry_run: bool,
}

/// Runs a purge for `tenant_id` against everything older than
/// `now - config.retention`, doubling the grace period for lineage and
/// resolved drift alerts (§4.9).
pub async fn run(tenant_id: TenantId, repo: &dyn PurgeRepository, config: &DriftConfig, dry_run: bool) -> Result<PurgeReport> {
    let now = crate::model::current_timestamp();
    let cutoff = now - i64::try_from(config.retention.as_secs()).unwrap_or(i64::MAX);
    let grace_cutoff = now - i64::try_from(config.grace_retention().as_secs()).unwrap_or(i64::MAX);

    let mut counts = PurgeCounts::default();
    counts.chunks = repo.purge_chunks(tenant_id, cutoff, dry_run).await?;
    counts.feature_blocks = repo.purge_feature_blocks(tenant_id, cutoff, dry_run).await?;
    counts.spec_values = repo.purge_spec_values(tenant_id, cutoff, dry_run).await?;
    counts.comparison_rows = repo.purge_comparison_rows(tenant_id, cutoff, dry_run).await?;
    counts.campaigns = repo.purge_campaigns(tenant_id, cutoff, dry_run).await?;
    counts.products = repo.purge_products(tenant_id, cutoff, dry_run).await?;
    counts.document_sources = repo.purge_document_sources(tenant_id, cutoff, dry_run).await?;
    counts.ingestion_jobs = repo.purge_ingestion_jobs(tenant_id, cutoff, dry_run).await?;
    counts.lineage = repo.purge_lineage(tenant_id, grace_cutoff, dry_run).await?;
    counts.drift_alerts = repo.purge_drift_alerts(tenant_id, grace_cutoff, dry_run).await?;

    if !dry_run {
        repo.record_audit_event(tenant_id, &counts).await?;
    }

    Ok(PurgeReport { counts, dry_run })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRepo {
        call_order: Mutex<Vec<&'static str>>,
        audit_events: AtomicUsize,
    }

    #[async_trait]
    impl PurgeRepository for RecordingRepo {
        async fn purge_chunks(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("chunks");
            Ok(3)
        }
        async fn purge_feature_blocks(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("feature_blocks");
            Ok(2)
        }
        async fn purge_spec_values(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("spec_values");
            Ok(5)
        }
        async fn purge_comparison_rows(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("comparison_rows");
            Ok(1)
        }
        async fn purge_campaigns(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("campaigns");
            Ok(1)
        }
        async fn purge_products(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("products");
            Ok(0)
        }
        async fn purge_document_sources(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("document_sources");
            Ok(1)
        }
        async fn purge_ingestion_jobs(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("ingestion_jobs");
            Ok(2)
        }
        async fn purge_lineage(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("lineage");
            Ok(4)
        }
        async fn purge_drift_alerts(&self, _t: TenantId, _c: i64, _d: bool) -> Result<usize> {
            self.call_order.lock().unwrap().push("drift_alerts");
            Ok(0)
        }
        async fn record_audit_event(&self, _t: TenantId, _counts: &PurgeCounts) -> Result<()> {
            self.audit_events.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn s7_purges_in_invariant_seven_order() {
        let repo = RecordingRepo::default();
        let config = DriftConfig::new();
        let report = run(TenantId::new(), &repo, &config, false).await.unwrap();

        let order = repo.call_order.lock().unwrap().clone();
        assert_eq!(
            order,
            vec![
                "chunks",
                "feature_blocks",
                "spec_values",
                "comparison_rows",
                "campaigns",
                "products",
                "document_sources",
                "ingestion_jobs",
                "lineage",
                "drift_alerts",
            ]
        );
        assert_eq!(report.counts.total(), 19);
        assert_eq!(repo.audit_events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dry_run_skips_audit_event() {
        let repo = RecordingRepo::default();
        let config = DriftConfig::new();
        let report = run(TenantId::new(), &repo, &config, true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(repo.audit_events.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn counts_to_json_includes_total() {
        let counts = PurgeCounts {
            chunks: 1,
            ..PurgeCounts::default()
        };
        let value = counts.to_json();
        assert_eq!(value["total"], 1);
    }
}

//! Ingestion job, lineage event, and drift alert entities.

use super::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Staged state of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, not yet started.
    Queued,
    /// Parsing Markdown into frontmatter/tables/sections.
    Parsing,
    /// Normalizing parsed records into the canonical spec model.
    Normalizing,
    /// Splitting normalized content into chunks.
    Chunking,
    /// Generating embeddings in batches.
    Embedding,
    /// Persisting rows, spec view, and vector index entries.
    Storing,
    /// Emitting lineage events.
    Lineage,
    /// Completed successfully.
    Done,
    /// Failed; `IngestionJob::failure_reason` carries the detail.
    Failed,
}

/// Strongly-typed ingestion job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngestionJobId(pub Uuid);

impl IngestionJobId {
    /// Generates a new random job id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IngestionJobId {
    fn default() -> Self {
        Self::new()
    }
}

/// The staged lifecycle record for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionJob {
    /// Unique job id.
    pub id: IngestionJobId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Current stage.
    pub state: JobState,
    /// Number of chunks that completed embedding.
    pub chunks_complete: usize,
    /// Number of chunks persisted as `incomplete` (embedding failed, retryable).
    pub chunks_incomplete: usize,
    /// Failure detail, set only when `state == Failed`.
    pub failure_reason: Option<String>,
    /// Creation timestamp (unix seconds).
    pub created_at: i64,
    /// Last update timestamp (unix seconds).
    pub updated_at: i64,
}

impl IngestionJob {
    /// Creates a freshly queued job.
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        let now = super::current_timestamp();
        Self {
            id: IngestionJobId::new(),
            tenant_id,
            state: JobState::Queued,
            chunks_complete: 0,
            chunks_incomplete: 0,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advances to `state`, bumping `updated_at`.
    pub fn advance(&mut self, state: JobState) {
        self.state = state;
        self.updated_at = super::current_timestamp();
    }

    /// Marks the job failed with `reason`. Per §4.8, partial embedding
    /// failures do not abort the job — this is reserved for failures that
    /// abort the whole pipeline (parse failure, store failure).
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.failure_reason = Some(reason.into());
        self.advance(JobState::Failed);
    }
}

/// What happened to a materialized artifact, for lineage purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageAction {
    /// The artifact was newly created.
    Created,
    /// The artifact was updated in place.
    Updated,
    /// The artifact replaced a prior version (publish/rollback).
    Replaced,
    /// The artifact was deleted (purge).
    Deleted,
}

/// One event per materialized artifact, emitted by the ingestion pipeline
/// and the purger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEvent {
    /// Unique event id.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// What happened.
    pub action: LineageAction,
    /// Identifier of the source artifact (document uri, job id, purge run id).
    pub source: String,
    /// Who/what triggered this event (ingestion job id, operator name, "purger").
    pub operator: String,
    /// Free-form batch counts and other context, serialized as JSON.
    pub payload: serde_json::Value,
    /// Creation timestamp (unix seconds).
    pub created_at: i64,
}

impl LineageEvent {
    /// Creates a new lineage event stamped with the current time.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        action: LineageAction,
        source: impl Into<String>,
        operator: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            action,
            source: source.into(),
            operator: operator.into(),
            payload,
            created_at: super::current_timestamp(),
        }
    }
}

/// What kind of drift was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftAlertKind {
    /// A published campaign's `effective_from` is older than the freshness threshold.
    StaleCampaign,
    /// A chunk's `content_hash` no longer matches the current canonical hash.
    HashMismatch,
    /// A campaign's chunks span more than one `embedding_version`.
    EmbeddingDrift,
}

/// Resolution state of a drift alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftAlertStatus {
    /// Still needs attention.
    Open,
    /// Addressed; eligible for grace-period purge.
    Resolved,
}

/// A single drift finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAlert {
    /// Unique alert id.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// What kind of drift this is.
    pub kind: DriftAlertKind,
    /// Resolution state.
    pub status: DriftAlertStatus,
    /// When the drift was detected (unix seconds).
    pub detected_at: i64,
    /// Finding detail (affected campaign/chunk ids, counts), serialized as JSON.
    pub payload: serde_json::Value,
}

impl DriftAlert {
    /// Creates a new open drift alert.
    #[must_use]
    pub fn new(tenant_id: TenantId, kind: DriftAlertKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            kind,
            status: DriftAlertStatus::Open,
            detected_at: super::current_timestamp(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_queued() {
        let job = IngestionJob::new(TenantId::new());
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn advance_updates_state_and_timestamp() {
        let mut job = IngestionJob::new(TenantId::new());
        job.advance(JobState::Parsing);
        assert_eq!(job.state, JobState::Parsing);
    }

    #[test]
    fn fail_sets_reason_and_state() {
        let mut job = IngestionJob::new(TenantId::new());
        job.fail("boom");
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.failure_reason.as_deref(), Some("boom"));
    }

    #[test]
    fn drift_alert_starts_open() {
        let alert = DriftAlert::new(TenantId::new(), DriftAlertKind::StaleCampaign, serde_json::json!({}));
        assert_eq!(alert.status, DriftAlertStatus::Open);
    }
}

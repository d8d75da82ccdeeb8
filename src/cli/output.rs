//! Output formatting for the CLI: text and JSON renderings of every
//! library response type the CLI surfaces, plus error formatting.

use crate::drift::DriftReport;
use crate::model::IngestionJob;
use crate::purge::PurgeReport;
use crate::router::RetrievalResponse;
use serde::Serialize;
use serde_json::json;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
    /// Newline-delimited JSON (NDJSON) for streaming.
    /// Each record is a single JSON object on its own line.
    Ndjson,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" | "stream" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Returns true if this format is a streaming format.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Ndjson)
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s[..max_len].to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

/// Formats a completed (or failed) ingestion job.
#[must_use]
pub fn format_ingestion_job(job: &IngestionJob, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Ndjson => format_json(job),
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "job {}", job.id.0);
            let _ = writeln!(output, "  state:             {:?}", job.state);
            let _ = writeln!(output, "  chunks complete:   {}", job.chunks_complete);
            let _ = writeln!(output, "  chunks incomplete: {}", job.chunks_incomplete);
            if let Some(reason) = &job.failure_reason {
                let _ = writeln!(output, "  failure reason:    {reason}");
            }
            output
        }
    }
}

/// Formats a retrieval response.
///
/// `RetrievalResponse` and its nested row types do not derive `Serialize`
/// (they carry borrowed-repository fields not meant for wire transport), so
/// the JSON branch builds its payload field by field rather than delegating
/// to [`format_json`].
#[must_use]
pub fn format_retrieval_response(resp: &RetrievalResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Ndjson => {
            let structured_facts: Vec<_> = resp
                .structured_facts
                .iter()
                .map(|f| {
                    json!({
                        "spec_value_id": f.spec_value_id.0.to_string(),
                        "product_id": f.product_id.0.to_string(),
                        "campaign_variant_id": f.campaign_variant_id.0.to_string(),
                        "category": f.category,
                        "name": f.name,
                        "value_text": f.value_text,
                        "value_numeric": f.value_numeric,
                        "unit": f.unit,
                        "confidence": f.confidence,
                    })
                })
                .collect();
            let semantic_chunks: Vec<_> = resp
                .semantic_chunks
                .iter()
                .map(|c| {
                    json!({
                        "chunk_id": c.chunk_id.0.to_string(),
                        "chunk_type": format!("{:?}", c.chunk_type),
                        "text": c.text,
                        "score": c.score,
                        "parent_category": c.parent_category,
                        "sub_category": c.sub_category,
                        "specification_type": c.specification_type,
                        "value": c.value,
                    })
                })
                .collect();
            let comparisons: Vec<_> = resp
                .comparisons
                .iter()
                .map(|c| {
                    json!({
                        "product_ids": c.product_ids.iter().map(|p| p.0.to_string()).collect::<Vec<_>>(),
                        "summary": c.summary,
                        "generated_at": c.generated_at,
                    })
                })
                .collect();
            let payload = json!({
                "intent": format!("{:?}", resp.intent),
                "latency_ms": resp.latency_ms,
                "overall_confidence": resp.overall_confidence,
                "used_vector_search": resp.used_vector_search,
                "structured_facts": structured_facts,
                "semantic_chunks": semantic_chunks,
                "comparisons": comparisons,
                "summary": resp.summary,
            });
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(
                output,
                "intent: {:?} (confidence {:.2}, {} ms)",
                resp.intent, resp.overall_confidence, resp.latency_ms
            );
            if !resp.structured_facts.is_empty() {
                output.push_str("\nstructured facts:\n");
                for f in &resp.structured_facts {
                    let _ = writeln!(
                        output,
                        "  {} / {}: {} (confidence {:.2})",
                        f.category, f.name, f.value_text, f.confidence
                    );
                }
            }
            if !resp.semantic_chunks.is_empty() {
                output.push_str("\nsemantic chunks:\n");
                for c in &resp.semantic_chunks {
                    let _ = writeln!(output, "  [{:.3}] {}", c.score, truncate(&c.text, 160));
                }
            }
            if !resp.comparisons.is_empty() {
                output.push_str("\ncomparisons:\n");
                for c in &resp.comparisons {
                    let _ = writeln!(output, "  {}", truncate(&c.summary, 200));
                }
            }
            if let Some(summary) = &resp.summary {
                let _ = writeln!(output, "\nsummary: {summary}");
            }
            output
        }
    }
}

/// Formats a drift report.
///
/// `DriftReport` does not derive `Serialize`; the JSON branch builds its
/// payload field by field.
#[must_use]
pub fn format_drift_report(report: &DriftReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Ndjson => {
            let alerts: Vec<_> = report
                .alerts
                .iter()
                .map(|a| {
                    json!({
                        "id": a.id.to_string(),
                        "kind": format!("{:?}", a.kind),
                        "status": format!("{:?}", a.status),
                        "detected_at": a.detected_at,
                        "payload": a.payload,
                    })
                })
                .collect();
            let payload = json!({
                "tenant_id": report.tenant_id.0.to_string(),
                "severity": format!("{:?}", report.severity),
                "alerts": alerts,
                "recommendations": report.recommendations,
            });
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "drift severity: {:?}", report.severity);
            let _ = writeln!(output, "{} alert(s)", report.alerts.len());
            for alert in &report.alerts {
                let _ = writeln!(output, "  [{:?}] {}", alert.kind, alert.payload);
            }
            output.push_str("\nrecommendations:\n");
            for r in &report.recommendations {
                let _ = writeln!(output, "  - {r}");
            }
            output
        }
    }
}

/// Formats a purge report.
#[must_use]
pub fn format_purge_report(report: &PurgeReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Ndjson => {
            let payload = json!({
                "dry_run": report.dry_run,
                "counts": report.counts.to_json(),
            });
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "purge {}", if report.dry_run { "(dry run)" } else { "complete" });
            let c = &report.counts;
            let _ = writeln!(output, "  chunks:            {}", c.chunks);
            let _ = writeln!(output, "  feature blocks:    {}", c.feature_blocks);
            let _ = writeln!(output, "  spec values:       {}", c.spec_values);
            let _ = writeln!(output, "  comparison rows:   {}", c.comparison_rows);
            let _ = writeln!(output, "  campaigns:         {}", c.campaigns);
            let _ = writeln!(output, "  products:          {}", c.products);
            let _ = writeln!(output, "  document sources:  {}", c.document_sources);
            let _ = writeln!(output, "  ingestion jobs:    {}", c.ingestion_jobs);
            let _ = writeln!(output, "  lineage events:    {}", c.lineage);
            let _ = writeln!(output, "  drift alerts:      {}", c.drift_alerts);
            let _ = writeln!(output, "  total:             {}", c.total());
            output
        }
    }
}

/// Formats an error for output.
///
/// When format is JSON, returns a structured error object.
/// When format is Text, returns the error message string.
#[must_use]
pub fn format_error(error: &crate::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let (error_type, suggestion) = get_error_details(error);
            let payload = json!({
                "success": false,
                "error": {
                    "type": error_type,
                    "message": error.to_string(),
                    "suggestion": suggestion
                }
            });
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

/// Extracts error type and recovery suggestion from an error.
const fn get_error_details(error: &crate::Error) -> (&'static str, Option<&'static str>) {
    use crate::Error;
    use crate::error::{ConfigError, DriftError, IngestionError, PurgeError, RetrievalError, StorageError, VectorError};

    match error {
        Error::Vector(VectorError::DimensionMismatch { .. }) => (
            "DimensionMismatch",
            Some("re-embed the affected chunks with a consistent embedding model before inserting"),
        ),
        Error::Vector(VectorError::Closed) => ("VectorAdapterClosed", None),
        Error::Ingestion(IngestionError::ParseFailed(_)) => (
            "MarkdownParseFailed",
            Some("check the document's frontmatter and spec table formatting"),
        ),
        Error::Ingestion(IngestionError::MalformedRow { .. }) => {
            ("MalformedSpecRow", Some("fix the offending table row's column count"))
        }
        Error::Ingestion(IngestionError::EmbeddingBatchFailed { .. }) => {
            ("EmbeddingBatchFailed", Some("retry the ingest once the embedder is available"))
        }
        Error::Ingestion(IngestionError::CampaignNotFound(_)) => {
            ("CampaignNotFound", Some("check the tenant/product/locale/trim/market key"))
        }
        Error::Ingestion(IngestionError::PublishConflict { .. }) => {
            ("PublishConflict", Some("another writer holds the publish lock for this key; retry"))
        }
        Error::Retrieval(RetrievalError::NoEmbedder) => {
            ("NoEmbedderConfigured", Some("configure an embedder before issuing natural-language queries"))
        }
        Error::Retrieval(RetrievalError::UnrecognizedIntentHint(_)) => {
            ("UnrecognizedIntentHint", Some("omit the intent hint to let classification run"))
        }
        Error::Retrieval(RetrievalError::EmptyBatchRequest) => {
            ("EmptyBatchRequest", Some("supply at least one requested spec name"))
        }
        Error::Drift(DriftError::QueryFailed(_)) => ("DriftQueryFailed", None),
        Error::Purge(PurgeError::TableFailed { .. }) => (
            "PurgeTableFailed",
            Some("earlier tables already committed; re-run the purge to retry the failing table"),
        ),
        Error::Storage(StorageError::Database(_)) => ("DatabaseError", None),
        Error::Storage(StorageError::NotInitialized) => {
            ("StoreNotInitialized", Some("the database is created automatically on first use"))
        }
        Error::Storage(StorageError::Migration(_)) => ("MigrationError", None),
        Error::Storage(StorageError::Serialization(_)) => ("SerializationError", None),
        Error::Config(ConfigError::InvalidValue { .. }) => (
            "InvalidConfiguration",
            Some("check the offending field against its documented valid range"),
        ),
        Error::InvalidInput { .. } => ("InvalidInput", None),
        Error::NotFound { .. } => ("NotFound", Some("check the tenant/product/campaign name")),
        Error::DependencyUnavailable { .. } => ("DependencyUnavailable", Some("retry once the dependency recovers")),
        Error::Cancelled { .. } => ("Cancelled", None),
        Error::DeadlineExceeded { .. } => ("DeadlineExceeded", Some("retry with a longer timeout")),
        Error::Conflict { .. } => ("Conflict", Some("retry; another writer holds the lock")),
        Error::Fatal { .. } => ("InternalError", None),
    }
}

//! CLI command implementations.
//!
//! Each command wires the library's public entry points — `Pipeline::ingest`,
//! `Router::query`, `drift::run`, `purge::run` — against a `SqliteStore`
//! opened at the configured path. Tenant/product/campaign names are resolved
//! to stable ids via `Uuid::new_v5`, so repeated invocations with the same
//! names address the same rows across process runs.

#![allow(clippy::too_many_lines)]
#![allow(clippy::too_many_arguments)]

use crate::cli::output::{format_drift_report, format_ingestion_job, format_purge_report, format_retrieval_response, OutputFormat};
use crate::cli::parser::{Cli, Commands};
use crate::config::{DriftConfig, PipelineConfig, RouterConfig};
use crate::drift;
use crate::embedding::HashEmbedder;
use crate::error::{Error, Result};
use crate::ingestion::{IngestRequest, Pipeline};
use crate::model::{CampaignVariant, CampaignVariantId, Product, ProductId, Tenant, TenantId};
use crate::purge;
use crate::router::{RetrievalRequest, Router};
use crate::storage::SqliteStore;
use crate::vector::{InMemoryVectorAdapter, VectorAttributes};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Derives a stable tenant id from a tenant name.
#[must_use]
pub fn tenant_id_for(name: &str) -> TenantId {
    TenantId(Uuid::new_v5(&Uuid::NAMESPACE_DNS, format!("tenant:{name}").as_bytes()))
}

/// Derives a stable product id from a tenant id and a product name.
#[must_use]
pub fn product_id_for(tenant_id: TenantId, name: &str) -> ProductId {
    ProductId(Uuid::new_v5(&Uuid::NAMESPACE_DNS, format!("product:{tenant_id}:{name}").as_bytes()))
}

/// Derives a stable campaign variant id from its `(tenant, product, locale,
/// trim, market)` publish key.
#[must_use]
pub fn campaign_id_for(tenant_id: TenantId, product_id: ProductId, locale: &str, trim: &str, market: &str) -> CampaignVariantId {
    CampaignVariantId(Uuid::new_v5(
        &Uuid::NAMESPACE_DNS,
        format!("campaign:{tenant_id}:{product_id}:{locale}:{trim}:{market}").as_bytes(),
    ))
}

/// Executes the CLI command, returning the rendered output string.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the underlying
/// library call fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Fatal { message: format!("failed to start async runtime: {e}") })?;
    runtime.block_on(dispatch(&db_path, &cli.command, format))
}

async fn dispatch(db_path: &Path, command: &Commands, format: OutputFormat) -> Result<String> {
    let store = Arc::new(SqliteStore::open(db_path)?);

    match command {
        Commands::Ingest { tenant, product, file, locale, trim, market, source_doc, operator, dimension } => {
            cmd_ingest(&store, tenant, product, file, locale, trim, market, source_doc.clone(), operator, *dimension, format).await
        }
        Commands::Query { tenant, question, products, max_chunks, dimension } => {
            cmd_query(&store, tenant, question, products, *max_chunks, *dimension, format).await
        }
        Commands::Drift { tenant } => cmd_drift(&store, tenant, format),
        Commands::Purge { tenant, dry_run } => cmd_purge(&store, tenant, *dry_run, format).await,
    }
}

async fn cmd_ingest(
    store: &Arc<SqliteStore>,
    tenant: &str,
    product: &str,
    file: &Path,
    locale: &str,
    trim: &str,
    market: &str,
    source_doc: Option<String>,
    operator: &str,
    dimension: usize,
    format: OutputFormat,
) -> Result<String> {
    let markdown = std::fs::read_to_string(file)
        .map_err(|e| Error::InvalidInput { message: format!("failed to read {}: {e}", file.display()) })?;

    let tenant_id = tenant_id_for(tenant);
    store.insert_tenant(&Tenant { id: tenant_id, name: tenant.to_string(), created_at: crate::model::current_timestamp() })?;

    let product_id = product_id_for(tenant_id, product);
    store.insert_product(&Product {
        id: product_id,
        tenant_id,
        name: product.to_string(),
        created_at: crate::model::current_timestamp(),
    })?;

    let campaign_variant_id = campaign_id_for(tenant_id, product_id, locale, trim, market);
    store.insert_campaign(&CampaignVariant {
        id: campaign_variant_id,
        tenant_id,
        product_id,
        locale: locale.to_string(),
        trim: trim.to_string(),
        market: market.to_string(),
        status: crate::model::CampaignStatus::Published,
        version: 1,
        effective_from: crate::model::current_timestamp(),
        effective_through: None,
    })?;

    let source_doc = source_doc.unwrap_or_else(|| file.display().to_string());
    let req = IngestRequest { tenant_id, product_id, campaign_variant_id, markdown, source_doc: Some(source_doc), operator: operator.to_string() };

    let vector_adapter = Arc::new(InMemoryVectorAdapter::new());
    let embedder = Arc::new(HashEmbedder::new(dimension));
    let pipeline = Pipeline::new(store.clone(), store.clone(), vector_adapter, embedder, PipelineConfig::new());

    let job = pipeline.ingest(req).await?;
    Ok(format_ingestion_job(&job, format))
}

async fn cmd_query(
    store: &Arc<SqliteStore>,
    tenant: &str,
    question: &str,
    products: &[String],
    max_chunks: Option<usize>,
    dimension: usize,
    format: OutputFormat,
) -> Result<String> {
    let tenant_id = tenant_id_for(tenant);

    let vector_adapter = Arc::new(InMemoryVectorAdapter::new());
    for chunk in store.list_chunks(tenant_id)? {
        if chunk.completion_status != crate::model::CompletionStatus::Complete {
            continue;
        }
        let Some(vector) = chunk.embedding_vector.clone() else { continue };
        let attrs = VectorAttributes {
            tenant_id: chunk.tenant_id,
            product_id: chunk.product_id,
            campaign_variant_id: chunk.campaign_variant_id,
            chunk_type: chunk.chunk_type,
            visibility: chunk.visibility,
            embedding_version: chunk.embedding_version.clone().unwrap_or_default(),
        };
        vector_adapter.insert(chunk.id, vector, attrs).await?;
    }

    let embedder = Arc::new(HashEmbedder::new(dimension));
    let router = Router::new(RouterConfig::new(), store.clone(), vector_adapter, store.clone(), Some(embedder), None);

    let mut req = RetrievalRequest::new(tenant_id, question);
    req.product_ids = products.iter().map(|name| product_id_for(tenant_id, name)).collect();
    req.max_chunks = max_chunks;

    let response = router.query(&req).await?;
    Ok(format_retrieval_response(&response, format))
}

fn cmd_drift(store: &Arc<SqliteStore>, tenant: &str, format: OutputFormat) -> Result<String> {
    let tenant_id = tenant_id_for(tenant);
    let campaigns = store.list_campaigns(tenant_id)?;
    let chunks = store.list_chunks(tenant_id)?;
    let report = drift::run(tenant_id, &campaigns, &chunks, &DriftConfig::new());
    Ok(format_drift_report(&report, format))
}

async fn cmd_purge(store: &Arc<SqliteStore>, tenant: &str, dry_run: bool, format: OutputFormat) -> Result<String> {
    let tenant_id = tenant_id_for(tenant);
    let report = purge::run(tenant_id, store.as_ref(), &DriftConfig::new(), dry_run).await?;
    Ok(format_purge_report(&report, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = "---\nproduct: Explorer\nlocale: en-US\nmarket: US\ntrim: Limited\n---\n\n## Specifications\n\n| Category | Sub-Category | Specification | Value | Additional Metadata |\n|---|---|---|---|---|\n| Engine | Powertrain | Horsepower | 300 hp | |\n\n## Key Features\n\n- Panoramic sunroof\n\n## USPs\n\n- Best-in-class cargo space\n";

    fn temp_db() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        (dir, path)
    }

    #[test]
    fn tenant_id_for_is_stable() {
        assert_eq!(tenant_id_for("Acme"), tenant_id_for("Acme"));
        assert_ne!(tenant_id_for("Acme"), tenant_id_for("Globex"));
    }

    #[test]
    fn campaign_id_for_is_scoped_by_full_key() {
        let tenant_id = tenant_id_for("Acme");
        let product_id = product_id_for(tenant_id, "Explorer");
        let a = campaign_id_for(tenant_id, product_id, "en-US", "base", "US");
        let b = campaign_id_for(tenant_id, product_id, "en-US", "premium", "US");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn ingest_then_query_round_trips_through_sqlite() {
        let (_dir, path) = temp_db();
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let md_dir = TempDir::new().unwrap();
        let md_path = md_dir.path().join("explorer.md");
        std::fs::write(&md_path, DOC).unwrap();

        let job_output = cmd_ingest(&store, "Acme", "Explorer", &md_path, "en-US", "base", "US", None, "cli", 32, OutputFormat::Text)
            .await
            .unwrap();
        assert!(job_output.contains("Done"));

        let query_output = cmd_query(&store, "Acme", "Horsepower", &[], None, 32, OutputFormat::Text).await.unwrap();
        assert!(query_output.contains("intent:"));
    }

    #[tokio::test]
    async fn drift_runs_against_an_empty_tenant() {
        let (_dir, path) = temp_db();
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let output = cmd_drift(&store, "Acme", OutputFormat::Text).unwrap();
        assert!(output.contains("drift severity"));
    }

    #[tokio::test]
    async fn purge_dry_run_reports_zero_counts_on_an_empty_tenant() {
        let (_dir, path) = temp_db();
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let output = cmd_purge(&store, "Acme", true, OutputFormat::Json).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["counts"]["chunks"], 0);
    }
}

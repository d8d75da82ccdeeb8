//! `SQLite`-backed reference implementation of every repository capability
//! interface (§6). Production deployments may swap in a different backend
//! behind the same traits without touching the router, batch processor, or
//! ingestion pipeline.
//!
//! Connection access is guarded by a single [`std::sync::Mutex`] rather than
//! a connection pool: an embedded `SQLite` file has no network round-trip to
//! hide behind async scheduling, and the pipeline's own concurrency is
//! already bounded by `PipelineConfig::max_concurrent_jobs`.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

use crate::error::{Result, StorageError};
use crate::ingestion::publish::{CampaignWriter, PublishKeyRef};
use crate::model::{
    CampaignStatus, CampaignVariant, CampaignVariantId, ChunkId, ChunkMetadata, ChunkType, CompletionStatus, DriftAlert,
    DriftAlertKind, DriftAlertStatus, IngestionJob, IngestionJobId, JobState, KnowledgeChunk, LineageAction, LineageEvent,
    ProductId, SpecItemId, SpecValue, SpecValueId, SpecValueStatus, TenantId, Visibility,
};
use crate::purge::{PurgeCounts, PurgeRepository};
use crate::repository::{
    CampaignRepository, ChunkWriter, ComparisonRepository, ComparisonRow, DriftAlertRepository, KnowledgeChunkRepository,
    LineageRepository, SpecViewRepository, SpecViewRow,
};
use crate::storage::schema::{CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// `SQLite`-based storage implementation, backing every repository trait
/// the router, batch processor, ingestion pipeline, and CLI depend on.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates a `SQLite` database at the given path and applies
    /// any pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, migrated, or if
    /// its parent directory cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Database(e.to_string()))?;
            }
        }
        let conn = Connection::open(&path)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        let _: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Creates an in-memory `SQLite` database, migrated and ready to use.
    /// Useful for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or migrated.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.migrate()?;
        Ok(store)
    }

    /// The database file path, or `None` for an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let is_init: i64 = conn.query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))?;

        if is_init == 0 {
            conn.execute_batch(SCHEMA_SQL)?;
            conn.execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])?;
            return Ok(());
        }

        let current: Option<String> = conn.query_row(GET_VERSION_SQL, [], |row| row.get(0)).optional()?;
        let current: u32 = current.and_then(|v| v.parse().ok()).unwrap_or(0);
        for migration in crate::storage::schema::get_migrations_from(current) {
            conn.execute_batch(migration.sql)?;
        }
        if current < CURRENT_SCHEMA_VERSION {
            conn.execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])?;
        }
        Ok(())
    }
}

fn chunk_type_to_str(t: ChunkType) -> &'static str {
    match t {
        ChunkType::Global => "global",
        ChunkType::SpecRow => "spec_row",
        ChunkType::Usp => "usp",
        ChunkType::Feature => "feature",
        ChunkType::Faq => "faq",
    }
}

fn chunk_type_from_str(s: &str) -> ChunkType {
    match s {
        "spec_row" => ChunkType::SpecRow,
        "usp" => ChunkType::Usp,
        "feature" => ChunkType::Feature,
        "faq" => ChunkType::Faq,
        _ => ChunkType::Global,
    }
}

fn visibility_to_str(v: Visibility) -> &'static str {
    match v {
        Visibility::Private => "private",
        Visibility::TenantOnly => "tenant_only",
        Visibility::Public => "public",
    }
}

fn visibility_from_str(s: &str) -> Visibility {
    match s {
        "private" => Visibility::Private,
        "public" => Visibility::Public,
        _ => Visibility::TenantOnly,
    }
}

fn completion_status_to_str(s: CompletionStatus) -> &'static str {
    match s {
        CompletionStatus::Complete => "complete",
        CompletionStatus::Incomplete => "incomplete",
    }
}

fn completion_status_from_str(s: &str) -> CompletionStatus {
    if s == "complete" {
        CompletionStatus::Complete
    } else {
        CompletionStatus::Incomplete
    }
}

fn campaign_status_to_str(s: CampaignStatus) -> &'static str {
    match s {
        CampaignStatus::Draft => "draft",
        CampaignStatus::Published => "published",
        CampaignStatus::Archived => "archived",
    }
}

fn campaign_status_from_str(s: &str) -> CampaignStatus {
    match s {
        "published" => CampaignStatus::Published,
        "archived" => CampaignStatus::Archived,
        _ => CampaignStatus::Draft,
    }
}

fn spec_value_status_to_str(s: SpecValueStatus) -> &'static str {
    match s {
        SpecValueStatus::Draft => "draft",
        SpecValueStatus::Active => "active",
        SpecValueStatus::Archived => "archived",
    }
}

fn spec_value_status_from_str(s: &str) -> SpecValueStatus {
    match s {
        "active" => SpecValueStatus::Active,
        "archived" => SpecValueStatus::Archived,
        _ => SpecValueStatus::Draft,
    }
}

fn job_state_to_str(s: JobState) -> &'static str {
    match s {
        JobState::Queued => "queued",
        JobState::Parsing => "parsing",
        JobState::Normalizing => "normalizing",
        JobState::Chunking => "chunking",
        JobState::Embedding => "embedding",
        JobState::Storing => "storing",
        JobState::Lineage => "lineage",
        JobState::Done => "done",
        JobState::Failed => "failed",
    }
}

fn job_state_from_str(s: &str) -> JobState {
    match s {
        "parsing" => JobState::Parsing,
        "normalizing" => JobState::Normalizing,
        "chunking" => JobState::Chunking,
        "embedding" => JobState::Embedding,
        "storing" => JobState::Storing,
        "lineage" => JobState::Lineage,
        "done" => JobState::Done,
        "failed" => JobState::Failed,
        _ => JobState::Queued,
    }
}

fn lineage_action_to_str(a: LineageAction) -> &'static str {
    match a {
        LineageAction::Created => "created",
        LineageAction::Updated => "updated",
        LineageAction::Replaced => "replaced",
        LineageAction::Deleted => "deleted",
    }
}

fn lineage_action_from_str(s: &str) -> LineageAction {
    match s {
        "updated" => LineageAction::Updated,
        "replaced" => LineageAction::Replaced,
        "deleted" => LineageAction::Deleted,
        _ => LineageAction::Created,
    }
}

fn drift_kind_to_str(k: DriftAlertKind) -> &'static str {
    match k {
        DriftAlertKind::StaleCampaign => "stale_campaign",
        DriftAlertKind::HashMismatch => "hash_mismatch",
        DriftAlertKind::EmbeddingDrift => "embedding_drift",
    }
}

fn drift_kind_from_str(s: &str) -> DriftAlertKind {
    match s {
        "hash_mismatch" => DriftAlertKind::HashMismatch,
        "embedding_drift" => DriftAlertKind::EmbeddingDrift,
        _ => DriftAlertKind::StaleCampaign,
    }
}

fn drift_status_to_str(s: DriftAlertStatus) -> &'static str {
    match s {
        DriftAlertStatus::Open => "open",
        DriftAlertStatus::Resolved => "resolved",
    }
}

fn drift_status_from_str(s: &str) -> DriftAlertStatus {
    if s == "resolved" {
        DriftAlertStatus::Resolved
    } else {
        DriftAlertStatus::Open
    }
}

fn vector_to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

#[async_trait]
impl SpecViewRepository for SqliteStore {
    async fn search_by_keyword(&self, tenant_id: TenantId, keyword: &str, limit: usize) -> Result<Vec<SpecViewRow>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let needle = format!("%{}%", keyword.to_lowercase());
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, product_id, campaign_variant_id, category, name, value_text, value_numeric, unit, \
             confidence, source_doc, source_page FROM spec_values \
             WHERE tenant_id = ?1 AND (lower(category) LIKE ?2 OR lower(name) LIKE ?2 OR lower(value_text) LIKE ?2) \
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![tenant_id.to_string(), needle, limit as i64], |row| {
                Ok(SpecViewRow {
                    spec_value_id: SpecValueId(parse_uuid(&row.get::<_, String>(0)?)?),
                    tenant_id: TenantId(parse_uuid(&row.get::<_, String>(1)?)?),
                    product_id: ProductId(parse_uuid(&row.get::<_, String>(2)?)?),
                    campaign_variant_id: CampaignVariantId(parse_uuid(&row.get::<_, String>(3)?)?),
                    category: row.get(4)?,
                    name: row.get(5)?,
                    value_text: row.get(6)?,
                    value_numeric: row.get(7)?,
                    unit: row.get(8)?,
                    confidence: row.get(9)?,
                    source_doc: row.get(10)?,
                    source_page: row.get::<_, Option<i64>>(11)?.map(|v| v as u32),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<CampaignVariant> {
    Ok(CampaignVariant {
        id: CampaignVariantId(parse_uuid(&row.get::<_, String>(0)?)?),
        tenant_id: TenantId(parse_uuid(&row.get::<_, String>(1)?)?),
        product_id: ProductId(parse_uuid(&row.get::<_, String>(2)?)?),
        locale: row.get(3)?,
        trim: row.get(4)?,
        market: row.get(5)?,
        status: campaign_status_from_str(&row.get::<_, String>(6)?),
        version: row.get::<_, i64>(7)? as u32,
        effective_from: row.get(8)?,
        effective_through: row.get(9)?,
    })
}

const CAMPAIGN_COLUMNS: &str =
    "id, tenant_id, product_id, locale, trim, market, status, version, effective_from, effective_through";

#[async_trait]
impl CampaignRepository for SqliteStore {
    async fn get_campaign(&self, id: CampaignVariantId) -> Result<Option<CampaignVariant>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaign_variants WHERE id = ?1");
        conn.query_row(&sql, params![id.0.to_string()], row_to_campaign)
            .optional()
            .map_err(Into::into)
    }

    async fn get_latest_published_campaign(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        locale: &str,
        trim: &str,
        market: &str,
    ) -> Result<Option<CampaignVariant>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaign_variants \
             WHERE tenant_id = ?1 AND product_id = ?2 AND locale = ?3 AND trim = ?4 AND market = ?5 AND status = 'published' \
             ORDER BY version DESC LIMIT 1"
        );
        conn.query_row(
            &sql,
            params![tenant_id.to_string(), product_id.to_string(), locale, trim, market],
            row_to_campaign,
        )
        .optional()
        .map_err(Into::into)
    }

    async fn get_campaign_by_trim(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        trim: &str,
    ) -> Result<Option<CampaignVariant>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaign_variants \
             WHERE tenant_id = ?1 AND product_id = ?2 AND trim = ?3 AND status = 'published' \
             ORDER BY version DESC LIMIT 1"
        );
        conn.query_row(&sql, params![tenant_id.to_string(), product_id.to_string(), trim], row_to_campaign)
            .optional()
            .map_err(Into::into)
    }
}

#[async_trait]
impl CampaignWriter for SqliteStore {
    async fn get_published(&self, key: &PublishKeyRef<'_>) -> Result<Option<CampaignVariant>> {
        CampaignRepository::get_latest_published_campaign(self, key.tenant_id, key.product_id, key.locale, key.trim, key.market)
            .await
    }

    async fn get_by_version(&self, key: &PublishKeyRef<'_>, version: u32) -> Result<Option<CampaignVariant>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaign_variants \
             WHERE tenant_id = ?1 AND product_id = ?2 AND locale = ?3 AND trim = ?4 AND market = ?5 AND version = ?6"
        );
        conn.query_row(
            &sql,
            params![
                key.tenant_id.to_string(),
                key.product_id.to_string(),
                key.locale,
                key.trim,
                key.market,
                version
            ],
            row_to_campaign,
        )
        .optional()
        .map_err(Into::into)
    }

    async fn archive(&self, id: CampaignVariantId) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "UPDATE campaign_variants SET status = 'archived' WHERE id = ?1",
            params![id.0.to_string()],
        )?;
        Ok(())
    }

    async fn set_published(&self, id: CampaignVariantId) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "UPDATE campaign_variants SET status = 'published' WHERE id = ?1",
            params![id.0.to_string()],
        )?;
        Ok(())
    }
}

impl SqliteStore {
    /// Inserts a brand-new campaign variant row (not part of any capability
    /// trait — campaign creation is a CLI/admin operation, not a retrieval
    /// or ingestion one).
    pub fn insert_campaign(&self, variant: &CampaignVariant) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO campaign_variants (id, tenant_id, product_id, locale, trim, market, status, version, effective_from, effective_through) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                variant.id.0.to_string(),
                variant.tenant_id.to_string(),
                variant.product_id.to_string(),
                variant.locale,
                variant.trim,
                variant.market,
                campaign_status_to_str(variant.status),
                variant.version,
                variant.effective_from,
                variant.effective_through,
            ],
        )?;
        Ok(())
    }

    /// Inserts a tenant row.
    pub fn insert_tenant(&self, tenant: &crate::model::Tenant) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO tenants (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![tenant.id.to_string(), tenant.name, tenant.created_at],
        )?;
        Ok(())
    }

    /// Inserts a product row.
    pub fn insert_product(&self, product: &crate::model::Product) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO products (id, tenant_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![product.id.to_string(), product.tenant_id.to_string(), product.name, product.created_at],
        )?;
        Ok(())
    }

    /// Inserts a document source row.
    pub fn insert_document_source(&self, doc: &crate::model::DocumentSource) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO document_sources (id, tenant_id, uri, uploaded_at, sha256) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![doc.id.0.to_string(), doc.tenant_id.to_string(), doc.uri, doc.uploaded_at, doc.sha256],
        )?;
        Ok(())
    }

    /// Lists every product registered for a tenant. Not part of
    /// [`crate::repository`] — an admin/CLI listing operation, not a
    /// retrieval or ingestion one.
    pub fn list_products(&self, tenant_id: TenantId) -> Result<Vec<crate::model::Product>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT id, tenant_id, name, created_at FROM products WHERE tenant_id = ?1")?;
        let rows = stmt
            .query_map(params![tenant_id.to_string()], |row| {
                Ok(crate::model::Product {
                    id: ProductId(parse_uuid(&row.get::<_, String>(0)?)?),
                    tenant_id: TenantId(parse_uuid(&row.get::<_, String>(1)?)?),
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Lists every campaign variant registered for a tenant, regardless of
    /// status. Not part of [`CampaignRepository`] — that trait only exposes
    /// the lookups the router/publisher need, not an unscoped listing.
    pub fn list_campaigns(&self, tenant_id: TenantId) -> Result<Vec<CampaignVariant>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaign_variants WHERE tenant_id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![tenant_id.to_string()], row_to_campaign)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Lists every chunk for a tenant, complete or incomplete, across every
    /// product. Used by the CLI to rebuild an [`crate::vector::InMemoryVectorAdapter`]
    /// at startup and to supply the drift runner with its full chunk set;
    /// not part of [`KnowledgeChunkRepository`], whose methods are scoped to
    /// a caller-supplied product list or to incomplete rows only.
    pub fn list_chunks(&self, tenant_id: TenantId) -> Result<Vec<KnowledgeChunk>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sql = format!("SELECT {CHUNK_COLUMNS} FROM knowledge_chunks WHERE tenant_id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![tenant_id.to_string()], row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnowledgeChunk> {
    let metadata_json: String = row.get(6)?;
    let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e)))?;
    let embedding_blob: Option<Vec<u8>> = row.get(11)?;

    Ok(KnowledgeChunk {
        id: ChunkId(parse_uuid(&row.get::<_, String>(0)?)?),
        tenant_id: TenantId(parse_uuid(&row.get::<_, String>(1)?)?),
        product_id: ProductId(parse_uuid(&row.get::<_, String>(2)?)?),
        campaign_variant_id: row
            .get::<_, Option<String>>(3)?
            .map(|s| parse_uuid(&s).map(CampaignVariantId))
            .transpose()?,
        chunk_type: chunk_type_from_str(&row.get::<_, String>(4)?),
        text: row.get(5)?,
        metadata,
        content_hash: row.get(7)?,
        completion_status: completion_status_from_str(&row.get::<_, String>(8)?),
        embedding_model: row.get(9)?,
        embedding_version: row.get(10)?,
        embedding_vector: embedding_blob.map(|b| blob_to_vector(&b)),
        source_doc: row.get(12)?,
        source_page: row.get::<_, Option<i64>>(13)?.map(|v| v as u32),
        visibility: visibility_from_str(&row.get::<_, String>(14)?),
        created_at: row.get(15)?,
    })
}

const CHUNK_COLUMNS: &str = "id, tenant_id, product_id, campaign_variant_id, chunk_type, text, metadata, content_hash, \
     completion_status, embedding_model, embedding_version, embedding_vector, source_doc, source_page, visibility, created_at";

#[async_trait]
impl KnowledgeChunkRepository for SqliteStore {
    async fn get_with_embeddings_by_tenant_and_products(
        &self,
        tenant_id: TenantId,
        product_ids: &[ProductId],
    ) -> Result<Vec<KnowledgeChunk>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let placeholders = product_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM knowledge_chunks \
             WHERE tenant_id = ? AND completion_status = 'complete' AND product_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut bind: Vec<String> = vec![tenant_id.to_string()];
        bind.extend(product_ids.iter().map(ToString::to_string));
        let rows = stmt
            .query_map(rusqlite::params_from_iter(bind.iter()), row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn find_incomplete_chunks(&self, tenant_id: TenantId) -> Result<Vec<KnowledgeChunk>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sql = format!("SELECT {CHUNK_COLUMNS} FROM knowledge_chunks WHERE tenant_id = ?1 AND completion_status = 'incomplete'");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![tenant_id.to_string()], row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn get_chunk_by_id(&self, chunk_id: ChunkId) -> Result<Option<KnowledgeChunk>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sql = format!("SELECT {CHUNK_COLUMNS} FROM knowledge_chunks WHERE id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let chunk = stmt.query_row(params![chunk_id.0.to_string()], row_to_chunk).optional()?;
        Ok(chunk)
    }
}

#[async_trait]
impl DriftAlertRepository for SqliteStore {
    async fn get_open_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<DriftAlert>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn
            .prepare("SELECT id, tenant_id, kind, status, detected_at, payload FROM drift_alerts WHERE tenant_id = ?1 AND status = 'open'")?;
        let rows = stmt
            .query_map(params![tenant_id.to_string()], |row| {
                let payload: String = row.get(5)?;
                Ok(DriftAlert {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    tenant_id: TenantId(parse_uuid(&row.get::<_, String>(1)?)?),
                    kind: drift_kind_from_str(&row.get::<_, String>(2)?),
                    status: drift_status_from_str(&row.get::<_, String>(3)?),
                    detected_at: row.get(4)?,
                    payload: serde_json::from_str(&payload)
                        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl SqliteStore {
    /// Inserts a new drift alert (used by the drift runner, an external
    /// collaborator consuming only [`DriftAlertRepository`]'s read side).
    pub fn insert_drift_alert(&self, alert: &DriftAlert) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO drift_alerts (id, tenant_id, kind, status, detected_at, payload) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                alert.id.to_string(),
                alert.tenant_id.to_string(),
                drift_kind_to_str(alert.kind),
                drift_status_to_str(alert.status),
                alert.detected_at,
                serde_json::to_string(&alert.payload).map_err(StorageError::from)?,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl LineageRepository for SqliteStore {
    async fn append(&self, event: LineageEvent) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO lineage_events (id, tenant_id, action, source, operator, payload, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id.to_string(),
                event.tenant_id.to_string(),
                lineage_action_to_str(event.action),
                event.source,
                event.operator,
                serde_json::to_string(&event.payload).map_err(StorageError::from)?,
                event.created_at,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl ComparisonRepository for SqliteStore {
    async fn get_precomputed(&self, tenant_id: TenantId, product_ids: &[ProductId]) -> Result<Vec<ComparisonRow>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT tenant_id, product_ids, campaign_variant_id, summary, generated_at FROM comparison_rows WHERE tenant_id = ?1",
        )?;
        let wanted: std::collections::BTreeSet<String> = product_ids.iter().map(ToString::to_string).collect();
        let rows = stmt
            .query_map(params![tenant_id.to_string()], |row| {
                let ids_json: String = row.get(1)?;
                let ids: Vec<String> = serde_json::from_str(&ids_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e)))?;
                Ok((ids, row.get::<_, Option<String>>(2)?, row.get::<_, String>(3)?, row.get::<_, i64>(4)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut out = Vec::new();
        for (ids, campaign_id, summary, generated_at) in rows {
            let stored: std::collections::BTreeSet<String> = ids.iter().cloned().collect();
            if stored != wanted {
                continue;
            }
            out.push(ComparisonRow {
                tenant_id,
                product_ids: ids
                    .iter()
                    .map(|s| Uuid::parse_str(s).map(ProductId).map_err(|e| StorageError::Database(e.to_string())))
                    .collect::<std::result::Result<Vec<_>, _>>()?,
                campaign_variant_id: campaign_id
                    .map(|s| Uuid::parse_str(&s).map(CampaignVariantId).map_err(|e| StorageError::Database(e.to_string())))
                    .transpose()?,
                summary,
                generated_at,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl ChunkWriter for SqliteStore {
    async fn upsert_chunk(&self, chunk: KnowledgeChunk) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let metadata_json = serde_json::to_string(&chunk.metadata).map_err(StorageError::from)?;
        let sql = format!(
            "INSERT OR REPLACE INTO knowledge_chunks ({CHUNK_COLUMNS}) VALUES \
             (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)"
        );
        conn.execute(
            &sql,
            params![
                chunk.id.0.to_string(),
                chunk.tenant_id.to_string(),
                chunk.product_id.to_string(),
                chunk.campaign_variant_id.map(|c| c.0.to_string()),
                chunk_type_to_str(chunk.chunk_type),
                chunk.text,
                metadata_json,
                chunk.content_hash,
                completion_status_to_str(chunk.completion_status),
                chunk.embedding_model,
                chunk.embedding_version,
                chunk.embedding_vector.as_deref().map(vector_to_blob),
                chunk.source_doc,
                chunk.source_page,
                visibility_to_str(chunk.visibility),
                chunk.created_at,
            ],
        )?;
        Ok(())
    }

    async fn upsert_spec_value(&self, spec_value: SpecValue) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO spec_values (id, tenant_id, spec_item_id, product_id, campaign_variant_id, category, name, \
             value_text, value_numeric, unit, confidence, explanation, explanation_failed, status, version, source_doc, \
             source_page, effective_from, effective_through) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)",
            params![
                spec_value.id.0.to_string(),
                spec_value.tenant_id.to_string(),
                spec_value.spec_item_id.0.to_string(),
                spec_value.product_id.to_string(),
                spec_value.campaign_variant_id.0.to_string(),
                spec_value.category,
                spec_value.name,
                spec_value.value_text,
                spec_value.value_numeric,
                spec_value.unit,
                spec_value.confidence,
                spec_value.explanation,
                spec_value.explanation_failed,
                spec_value_status_to_str(spec_value.status),
                spec_value.version,
                spec_value.source_doc,
                spec_value.source_page,
                spec_value.effective_from,
                spec_value.effective_through,
            ],
        )?;
        Ok(())
    }

    async fn save_job(&self, job: IngestionJob) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO ingestion_jobs (id, tenant_id, state, chunks_complete, chunks_incomplete, failure_reason, created_at, updated_at) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                job.id.0.to_string(),
                job.tenant_id.to_string(),
                job_state_to_str(job.state),
                job.chunks_complete as i64,
                job.chunks_incomplete as i64,
                job.failure_reason,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    }
}

impl SqliteStore {
    /// Fetches a single ingestion job by id (used by the CLI to report job
    /// status after `ingest` returns).
    pub fn get_job(&self, id: IngestionJobId) -> Result<Option<IngestionJob>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.query_row(
            "SELECT id, tenant_id, state, chunks_complete, chunks_incomplete, failure_reason, created_at, updated_at \
             FROM ingestion_jobs WHERE id = ?1",
            params![id.0.to_string()],
            |row| {
                Ok(IngestionJob {
                    id: IngestionJobId(parse_uuid(&row.get::<_, String>(0)?)?),
                    tenant_id: TenantId(parse_uuid(&row.get::<_, String>(1)?)?),
                    state: job_state_from_str(&row.get::<_, String>(2)?),
                    chunks_complete: row.get::<_, i64>(3)? as usize,
                    chunks_incomplete: row.get::<_, i64>(4)? as usize,
                    failure_reason: row.get(5)?,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }
}

fn purge_table(conn: &Connection, table: &str, tenant_id: TenantId, cutoff: i64, time_col: &str, extra: &str, dry_run: bool) -> Result<usize> {
    let count_sql = format!("SELECT COUNT(*) FROM {table} WHERE tenant_id = ?1 AND {time_col} < ?2 {extra}");
    let count: i64 = conn.query_row(&count_sql, params![tenant_id.to_string(), cutoff], |row| row.get(0))?;
    if !dry_run && count > 0 {
        let delete_sql = format!("DELETE FROM {table} WHERE tenant_id = ?1 AND {time_col} < ?2 {extra}");
        conn.execute(&delete_sql, params![tenant_id.to_string(), cutoff])?;
    }
    Ok(count as usize)
}

#[async_trait]
impl PurgeRepository for SqliteStore {
    async fn purge_chunks(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(&conn, "knowledge_chunks", tenant_id, cutoff, "created_at", "AND chunk_type NOT IN ('feature', 'usp')", dry_run)
    }

    async fn purge_feature_blocks(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(
            &conn,
            "knowledge_chunks",
            tenant_id,
            cutoff,
            "created_at",
            "AND chunk_type IN ('feature', 'usp')",
            dry_run,
        )
    }

    async fn purge_spec_values(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(&conn, "spec_values", tenant_id, cutoff, "effective_from", "", dry_run)
    }

    async fn purge_comparison_rows(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(&conn, "comparison_rows", tenant_id, cutoff, "generated_at", "", dry_run)
    }

    async fn purge_campaigns(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(
            &conn,
            "campaign_variants",
            tenant_id,
            cutoff,
            "effective_from",
            "AND status != 'published'",
            dry_run,
        )
    }

    async fn purge_products(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(
            &conn,
            "products",
            tenant_id,
            cutoff,
            "created_at",
            "AND id NOT IN (SELECT product_id FROM campaign_variants WHERE status = 'published')",
            dry_run,
        )
    }

    async fn purge_document_sources(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(&conn, "document_sources", tenant_id, cutoff, "uploaded_at", "", dry_run)
    }

    async fn purge_ingestion_jobs(&self, tenant_id: TenantId, cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(&conn, "ingestion_jobs", tenant_id, cutoff, "created_at", "", dry_run)
    }

    async fn purge_lineage(&self, tenant_id: TenantId, grace_cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(&conn, "lineage_events", tenant_id, grace_cutoff, "created_at", "", dry_run)
    }

    async fn purge_drift_alerts(&self, tenant_id: TenantId, grace_cutoff: i64, dry_run: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        purge_table(&conn, "drift_alerts", tenant_id, grace_cutoff, "detected_at", "AND status = 'resolved'", dry_run)
    }

    async fn record_audit_event(&self, tenant_id: TenantId, counts: &PurgeCounts) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let payload = counts.to_json();
        conn.execute(
            "INSERT INTO lineage_events (id, tenant_id, action, source, operator, payload, created_at) VALUES (?1, ?2, 'deleted', ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                tenant_id.to_string(),
                "purge-run",
                "purger",
                serde_json::to_string(&payload).map_err(StorageError::from)?,
                crate::model::current_timestamp(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChunkType, Product, Tenant};

    fn chunk(tenant: TenantId, product: ProductId) -> KnowledgeChunk {
        let mut c = KnowledgeChunk::new(tenant, product, None, ChunkType::SpecRow, "Engine / Powertrain: Horsepower is 300 hp");
        c.metadata = ChunkMetadata::spec_row("Engine", "Powertrain", "Horsepower", "300 hp", vec![]);
        c.completion_status = CompletionStatus::Complete;
        c.embedding_vector = Some(vec![0.1, 0.2, 0.3]);
        c.embedding_model = Some("hash-embedder".to_string());
        c
    }

    #[tokio::test]
    async fn roundtrips_a_chunk_through_sqlite() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::new();
        let product = ProductId::new();
        let c = chunk(tenant, product);
        let id = c.id;
        store.upsert_chunk(c).await.unwrap();

        let found = store.get_with_embeddings_by_tenant_and_products(tenant, &[product]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].embedding_vector.as_deref(), Some([0.1_f32, 0.2, 0.3].as_slice()));
        assert!(found[0].metadata.has_required_spec_row_keys());
    }

    #[tokio::test]
    async fn get_chunk_by_id_finds_an_inserted_chunk() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::new();
        let product = ProductId::new();
        let c = chunk(tenant, product);
        let id = c.id;
        store.upsert_chunk(c).await.unwrap();

        let found = store.get_chunk_by_id(id).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(id));
    }

    #[tokio::test]
    async fn get_chunk_by_id_returns_none_when_missing() {
        let store = SqliteStore::in_memory().unwrap();
        let found = store.get_chunk_by_id(ChunkId::new()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn search_by_keyword_is_tenant_scoped() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::new();
        let other = TenantId::new();
        let product = ProductId::new();
        let campaign = CampaignVariantId::new();

        for (t, name) in [(tenant, "Horsepower"), (other, "Horsepower")] {
            let mut sv = SpecValue {
                id: SpecValueId::new(),
                tenant_id: t,
                spec_item_id: SpecItemId(Uuid::new_v4()),
                product_id: product,
                campaign_variant_id: campaign,
                category: "Engine".to_string(),
                name: name.to_string(),
                value_text: "300 hp".to_string(),
                value_numeric: Some(300.0),
                unit: Some("hp".to_string()),
                confidence: 1.0,
                explanation: None,
                explanation_failed: false,
                status: SpecValueStatus::Active,
                version: 1,
                source_doc: None,
                source_page: None,
                effective_from: 0,
                effective_through: None,
            };
            sv.tenant_id = t;
            store.upsert_spec_value(sv).await.unwrap();
        }

        let hits = store.search_by_keyword(tenant, "horsepower", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tenant_id, tenant);
    }

    #[tokio::test]
    async fn publish_then_rollback_via_campaign_writer() {
        let store = std::sync::Arc::new(SqliteStore::in_memory().unwrap());
        let tenant = TenantId::new();
        let product = ProductId::new();
        let mut v1 = CampaignVariant::new_draft(tenant, product, "en-US", "base", "US");
        v1.status = CampaignStatus::Published;
        store.insert_campaign(&v1).unwrap();
        let mut v2 = CampaignVariant::new_draft(tenant, product, "en-US", "base", "US");
        v2.version = 2;
        store.insert_campaign(&v2).unwrap();

        let publisher = crate::ingestion::publish::Publisher::new(store.clone(), store.clone());
        publisher.publish(&v2).await.unwrap();

        let published = store.get_latest_published_campaign(tenant, product, "en-US", "base", "US").await.unwrap().unwrap();
        assert_eq!(published.id, v2.id);

        publisher.rollback(tenant, product, "en-US", "base", "US", 1).await.unwrap();
        let published = store.get_latest_published_campaign(tenant, product, "en-US", "base", "US").await.unwrap().unwrap();
        assert_eq!(published.id, v1.id);
    }

    #[tokio::test]
    async fn purge_removes_rows_older_than_cutoff_unless_dry_run() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::new();
        let product = ProductId::new();
        let mut c = chunk(tenant, product);
        c.chunk_type = ChunkType::SpecRow;
        c.created_at = 0;
        store.upsert_chunk(c).await.unwrap();

        let dry = store.purge_chunks(tenant, 100, true).await.unwrap();
        assert_eq!(dry, 1);
        let still_there = store.get_with_embeddings_by_tenant_and_products(tenant, &[product]).await.unwrap();
        assert_eq!(still_there.len(), 1);

        let real = store.purge_chunks(tenant, 100, false).await.unwrap();
        assert_eq!(real, 1);
        let gone = store.get_with_embeddings_by_tenant_and_products(tenant, &[product]).await.unwrap();
        assert!(gone.is_empty());
    }

    #[tokio::test]
    async fn migrate_is_idempotent_across_reopen() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_tenant(&Tenant::new("Acme Motors")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let _ = store.insert_product(&Product::new(TenantId::new(), "Explorer"));
        std::fs::remove_file(&path).ok();
    }
}

//! Database schema definitions.
//!
//! SQL schema and migration logic for the knowledge-base `SQLite` store.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tenants (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_products_tenant ON products(tenant_id);

CREATE TABLE IF NOT EXISTS campaign_variants (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    locale TEXT NOT NULL,
    trim TEXT NOT NULL,
    market TEXT NOT NULL,
    status TEXT NOT NULL,
    version INTEGER NOT NULL,
    effective_from INTEGER NOT NULL,
    effective_through INTEGER
);
CREATE INDEX IF NOT EXISTS idx_campaigns_tenant ON campaign_variants(tenant_id);
CREATE INDEX IF NOT EXISTS idx_campaigns_publish_key ON campaign_variants(tenant_id, product_id, locale, trim, market);

CREATE TABLE IF NOT EXISTS spec_values (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    spec_item_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    campaign_variant_id TEXT NOT NULL,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    value_text TEXT NOT NULL,
    value_numeric REAL,
    unit TEXT,
    confidence REAL NOT NULL,
    explanation TEXT,
    explanation_failed INTEGER NOT NULL,
    status TEXT NOT NULL,
    version INTEGER NOT NULL,
    source_doc TEXT,
    source_page INTEGER,
    effective_from INTEGER NOT NULL,
    effective_through INTEGER
);
CREATE INDEX IF NOT EXISTS idx_spec_values_tenant ON spec_values(tenant_id);
CREATE INDEX IF NOT EXISTS idx_spec_values_search ON spec_values(tenant_id, category, name);

CREATE TABLE IF NOT EXISTS knowledge_chunks (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    campaign_variant_id TEXT,
    chunk_type TEXT NOT NULL,
    text TEXT NOT NULL,
    metadata TEXT NOT NULL,
    content_hash TEXT,
    completion_status TEXT NOT NULL,
    embedding_model TEXT,
    embedding_version TEXT,
    embedding_vector BLOB,
    source_doc TEXT,
    source_page INTEGER,
    visibility TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chunks_tenant_product ON knowledge_chunks(tenant_id, product_id);
CREATE INDEX IF NOT EXISTS idx_chunks_incomplete ON knowledge_chunks(tenant_id, completion_status);

CREATE TABLE IF NOT EXISTS ingestion_jobs (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    state TEXT NOT NULL,
    chunks_complete INTEGER NOT NULL,
    chunks_incomplete INTEGER NOT NULL,
    failure_reason TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_jobs_tenant ON ingestion_jobs(tenant_id);

CREATE TABLE IF NOT EXISTS lineage_events (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    action TEXT NOT NULL,
    source TEXT NOT NULL,
    operator TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_lineage_tenant ON lineage_events(tenant_id);

CREATE TABLE IF NOT EXISTS drift_alerts (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    detected_at INTEGER NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_drift_tenant_status ON drift_alerts(tenant_id, status);

CREATE TABLE IF NOT EXISTS comparison_rows (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    product_ids TEXT NOT NULL,
    campaign_variant_id TEXT,
    summary TEXT NOT NULL,
    generated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comparisons_tenant ON comparison_rows(tenant_id);

CREATE TABLE IF NOT EXISTS document_sources (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    uri TEXT NOT NULL,
    uploaded_at INTEGER NOT NULL,
    sha256 TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_document_sources_tenant ON document_sources(tenant_id);
";

/// SQL to check if schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// A migration from one schema version to the next.
pub struct Migration {
    /// Version this migration upgrades from.
    pub from_version: u32,
    /// Version this migration upgrades to.
    pub to_version: u32,
    /// SQL statements to execute.
    pub sql: &'static str,
}

/// Available migrations. Empty until the schema needs to change past v1.
pub const MIGRATIONS: &[Migration] = &[];

/// Gets migrations needed to upgrade from a version.
#[must_use]
pub fn get_migrations_from(current_version: u32) -> Vec<&'static Migration> {
    MIGRATIONS
        .iter()
        .filter(|m| m.from_version >= current_version && m.to_version <= CURRENT_SCHEMA_VERSION)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_version_is_at_least_one() {
        const _: () = assert!(CURRENT_SCHEMA_VERSION >= 1);
    }

    #[test]
    fn schema_sql_creates_every_table() {
        for table in [
            "tenants",
            "products",
            "campaign_variants",
            "spec_values",
            "knowledge_chunks",
            "ingestion_jobs",
            "lineage_events",
            "drift_alerts",
            "comparison_rows",
            "document_sources",
        ] {
            assert!(SCHEMA_SQL.contains(table), "missing table {table}");
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for migration in MIGRATIONS {
            assert!(migration.to_version > migration.from_version);
        }
    }
}

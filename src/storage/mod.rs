//! `SQLite`-backed reference storage for the knowledge base.
//!
//! Provides the concrete implementation behind every repository capability
//! interface in [`crate::repository`], [`crate::purge`], and
//! [`crate::ingestion::publish`]. Callers that need a different backend can
//! implement those traits directly; nothing above this module depends on
//! `SQLite` specifically.

pub mod schema;
pub mod sqlite;

pub use schema::{CURRENT_SCHEMA_VERSION, SCHEMA_SQL};
pub use sqlite::SqliteStore;

/// Default database file name.
pub const DEFAULT_DB_NAME: &str = "brochure-kb.db";

/// Default database path relative to project root.
pub const DEFAULT_DB_PATH: &str = ".brochure-kb/brochure-kb.db";

//! Document source entity.

use super::TenantId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Strongly-typed document source identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentSourceId(pub Uuid);

/// A source document (brochure) that was ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    /// Unique document source id.
    pub id: DocumentSourceId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Locator for the source (file path, URL, or opaque handle).
    pub uri: String,
    /// Upload timestamp (unix seconds).
    pub uploaded_at: i64,
    /// SHA-256 of the raw document bytes, hex-encoded.
    pub sha256: String,
}

impl DocumentSource {
    /// Creates a document source record, computing its sha256 from `bytes`.
    #[must_use]
    pub fn new(tenant_id: TenantId, uri: impl Into<String>, bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = hex_encode(&hasher.finalize());

        Self {
            id: DocumentSourceId(Uuid::new_v4()),
            tenant_id,
            uri: uri.into(),
            uploaded_at: super::current_timestamp(),
            sha256,
        }
    }
}

/// Hex-encodes a byte slice without pulling in a dedicated hex crate.
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // `write!` to a String never fails.
        let _ = write!(out, "{b:02x}");
    }
    out
}

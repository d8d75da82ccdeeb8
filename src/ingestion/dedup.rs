//! Stage 3, `Deduplicate` (§4.8): content-hash based dedup, scoped by
//! tenant rather than campaign (Invariant 3 — "two chunks with the same
//! tenant and hash represent the same content").

use crate::model::TenantId;
use sha2::{Digest, Sha256};

/// A normalized `(category, spec, value, unit)` record, ready for
/// dedup/hashing, chunking, and storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// Top-level category (Invariant 6 `parent_category`).
    pub parent_category: String,
    /// Sub-category (Invariant 6 `sub_category`).
    pub sub_category: String,
    /// Canonical spec name.
    pub specification: String,
    /// Value text.
    pub value_text: String,
    /// Parsed numeric value, if quantitative.
    pub value_numeric: Option<f64>,
    /// Unit of measure, if any.
    pub unit: Option<String>,
    /// Free-form additional metadata, if any.
    pub additional_metadata: Option<String>,
    /// Source page, if known.
    pub source_page: Option<u32>,
    /// Stable tenant-scoped content hash of the canonical row text.
    pub content_hash: String,
}

/// Canonicalizes a row's textual form for hashing: lowercased, whitespace
/// collapsed, fields joined by a separator that can't appear in the inputs.
#[must_use]
pub fn canonicalize_row_text(category: &str, specification: &str, value_text: &str, unit: Option<&str>) -> String {
    canonicalize_fields(&[category, specification, value_text, unit.unwrap_or("")])
}

/// Like [`canonicalize_row_text`] but over an arbitrary field list, used by
/// narrative chunk hashing where there's no single "category".
#[must_use]
pub fn canonicalize_fields(fields: &[&str]) -> String {
    let parts = fields;
    parts
        .iter()
        .map(|p| p.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

/// Computes the stable, tenant-scoped content hash for a canonicalized row
/// (Invariant 3). Hex-encoded SHA-256 of `tenant_id | canonical_text`.
#[must_use]
pub fn content_hash(tenant_id: TenantId, canonical_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.0.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical_text.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Deduplicates `rows` within a single document by content hash, keeping
/// the first occurrence (§4.8 "Deduplicate within the document by content
/// hash"). Rows are expected to already carry their `content_hash`.
#[must_use]
pub fn dedup_within_document(rows: Vec<NormalizedRow>) -> Vec<NormalizedRow> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter().filter(|r| seen.insert(r.content_hash.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_collapses_whitespace_and_case() {
        let a = canonicalize_row_text("Engine", "Horsepower", "200 HP", None);
        let b = canonicalize_row_text("  engine ", "horsepower", "200   hp", None);
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_is_stable_for_same_tenant_and_text() {
        let tenant = TenantId::new();
        let text = canonicalize_row_text("Engine", "Horsepower", "200 hp", None);
        assert_eq!(content_hash(tenant, &text), content_hash(tenant, &text));
    }

    #[test]
    fn content_hash_differs_across_tenants() {
        let text = canonicalize_row_text("Engine", "Horsepower", "200 hp", None);
        assert_ne!(content_hash(TenantId::new(), &text), content_hash(TenantId::new(), &text));
    }

    #[test]
    fn dedup_within_document_keeps_first_occurrence() {
        let tenant = TenantId::new();
        let text = canonicalize_row_text("Engine", "Horsepower", "200 hp", None);
        let hash = content_hash(tenant, &text);
        let row = |value_text: &str, hash: &str| NormalizedRow {
            parent_category: "Engine".to_string(),
            sub_category: "Powertrain".to_string(),
            specification: "Horsepower".to_string(),
            value_text: value_text.to_string(),
            value_numeric: None,
            unit: None,
            additional_metadata: None,
            source_page: None,
            content_hash: hash.to_string(),
        };
        let rows = vec![row("200 hp", &hash), row("200 hp", &hash)];
        assert_eq!(dedup_within_document(rows).len(), 1);
    }
}

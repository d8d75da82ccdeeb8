//! Spec category, spec item, and spec value entities.

use super::{CampaignVariantId, ProductId, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strongly-typed spec category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecCategoryId(pub Uuid);

/// A category grouping related spec items (e.g. "Engine", "Safety").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecCategory {
    /// Unique category id.
    pub id: SpecCategoryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Category name, e.g. `"Engine"`.
    pub name: String,
}

/// Strongly-typed spec item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecItemId(pub Uuid);

/// A specification item within a category (e.g. "Horsepower").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecItem {
    /// Unique spec item id.
    pub id: SpecItemId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Parent category.
    pub category_id: SpecCategoryId,
    /// Human-facing display name, e.g. `"Horsepower"`.
    pub display_name: String,
}

/// Strongly-typed spec value identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecValueId(pub Uuid);

impl SpecValueId {
    /// Generates a new random spec value id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpecValueId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle status of a spec value row, mirroring campaign status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecValueStatus {
    /// Not yet live.
    Draft,
    /// Currently active.
    Active,
    /// Superseded.
    Archived,
}

/// A single `(category, spec, value, unit)` fact about a product within a
/// campaign, with provenance and a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecValue {
    /// Unique spec value id. Used as the deterministic tie-break key for
    /// equal ranking scores (see DESIGN.md Open Question resolution).
    pub id: SpecValueId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The spec item this value answers.
    pub spec_item_id: SpecItemId,
    /// The product this value describes.
    pub product_id: ProductId,
    /// The campaign variant this value belongs to.
    pub campaign_variant_id: CampaignVariantId,
    /// Canonical category name, post-normalization.
    pub category: String,
    /// Canonical spec name, post-normalization.
    pub name: String,
    /// Human-readable value text, e.g. `"200 hp"`.
    pub value_text: String,
    /// Parsed numeric value, if the text is quantitative.
    pub value_numeric: Option<f64>,
    /// Unit of the numeric value, e.g. `"hp"`.
    pub unit: Option<String>,
    /// Confidence in this extraction, in `[0, 1]`.
    pub confidence: f64,
    /// Optional free-text explanation of how this value was derived.
    pub explanation: Option<String>,
    /// True if an explanation was attempted but failed to generate.
    pub explanation_failed: bool,
    /// Lifecycle status.
    pub status: SpecValueStatus,
    /// Version, incremented on re-ingestion of the same row.
    pub version: u32,
    /// Source document identifier, if known.
    pub source_doc: Option<String>,
    /// Source page number, if known.
    pub source_page: Option<u32>,
    /// Unix timestamp from which this value is effective.
    pub effective_from: i64,
    /// Unix timestamp through which this value is effective, if bounded.
    pub effective_through: Option<i64>,
}

impl SpecValue {
    /// The `category:name:value` dedup key used when aggregating facts
    /// across multiple keyword searches or batch sub-queries.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.category.to_lowercase(),
            self.name.to_lowercase(),
            self.value_text.to_lowercase()
        )
    }

    /// Combined searchable text: category, name, and value concatenated and
    /// lowercased, used by keyword ranking/filtering.
    #[must_use]
    pub fn combined_text(&self) -> String {
        format!("{} {} {}", self.category, self.name, self.value_text).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SpecValue {
        SpecValue {
            id: SpecValueId::new(),
            tenant_id: TenantId::new(),
            spec_item_id: SpecItemId(Uuid::new_v4()),
            product_id: ProductId::new(),
            campaign_variant_id: CampaignVariantId::new(),
            category: "Engine".to_string(),
            name: "Power".to_string(),
            value_text: "200 hp".to_string(),
            value_numeric: Some(200.0),
            unit: Some("hp".to_string()),
            confidence: 0.95,
            explanation: None,
            explanation_failed: false,
            status: SpecValueStatus::Active,
            version: 1,
            source_doc: None,
            source_page: None,
            effective_from: 0,
            effective_through: None,
        }
    }

    #[test]
    fn dedup_key_is_lowercased() {
        let v = sample();
        assert_eq!(v.dedup_key(), "engine:power:200 hp");
    }

    #[test]
    fn combined_text_joins_fields() {
        let v = sample();
        assert_eq!(v.combined_text(), "engine power 200 hp");
    }
}

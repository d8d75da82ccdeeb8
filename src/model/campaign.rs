//! Campaign variant entity.
//!
//! A campaign variant is a versioned, locale/trim/market-scoped publication
//! of a product's knowledge (Invariant 2: at most one `published` row per
//! `(tenant, product, locale, trim, market)`).

use super::{ProductId, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strongly-typed campaign variant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CampaignVariantId(pub Uuid);

impl CampaignVariantId {
    /// Generates a new random campaign variant id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CampaignVariantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CampaignVariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a campaign variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Being authored; not yet published, not yet retrievable.
    Draft,
    /// Live; the single `published` row per `(tenant, product, locale, trim, market)`.
    Published,
    /// Superseded by a later publish, retained for rollback and history.
    Archived,
}

/// A versioned, locale/trim/market-scoped publication of a product's knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignVariant {
    /// Unique campaign variant id.
    pub id: CampaignVariantId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The product this variant describes.
    pub product_id: ProductId,
    /// Locale, e.g. `"en-US"`.
    pub locale: String,
    /// Trim level, e.g. `"base"`, `"premium"`.
    pub trim: String,
    /// Market, e.g. `"US"`, `"EU"`.
    pub market: String,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// Monotonically increasing version number within the
    /// `(tenant, product, locale, trim, market)` key.
    pub version: u32,
    /// Unix timestamp from which this variant is effective.
    pub effective_from: i64,
    /// Unix timestamp through which this variant is effective, if bounded.
    pub effective_through: Option<i64>,
}

impl CampaignVariant {
    /// Creates a new draft campaign variant at version 1.
    #[must_use]
    pub fn new_draft(
        tenant_id: TenantId,
        product_id: ProductId,
        locale: impl Into<String>,
        trim: impl Into<String>,
        market: impl Into<String>,
    ) -> Self {
        Self {
            id: CampaignVariantId::new(),
            tenant_id,
            product_id,
            locale: locale.into(),
            trim: trim.into(),
            market: market.into(),
            status: CampaignStatus::Draft,
            version: 1,
            effective_from: super::current_timestamp(),
            effective_through: None,
        }
    }

    /// The `(tenant, product, locale, trim, market)` key that the
    /// single-published invariant is scoped to.
    #[must_use]
    pub fn publish_key(&self) -> (TenantId, ProductId, &str, &str, &str) {
        (self.tenant_id, self.product_id, &self.locale, &self.trim, &self.market)
    }
}

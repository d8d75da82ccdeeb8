//! Feature block and USP entities.

use super::{CampaignVariantId, ProductId, TenantId};
use serde::{Deserialize, Serialize};

/// A bulleted product-feature line extracted from a brochure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureBlock {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The product this feature describes.
    pub product_id: ProductId,
    /// The campaign variant this feature belongs to.
    pub campaign_variant_id: CampaignVariantId,
    /// Feature text body (without the `Key Feature:` retrieval prefix).
    pub body: String,
    /// Category this feature falls under, if categorized.
    pub category: Option<String>,
    /// Source document identifier, if known.
    pub source_doc: Option<String>,
    /// Source page number, if known.
    pub source_page: Option<u32>,
}

/// A unique-selling-point line extracted from a brochure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usp {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The product this USP describes.
    pub product_id: ProductId,
    /// The campaign variant this USP belongs to.
    pub campaign_variant_id: CampaignVariantId,
    /// USP text body (without the `USP:` retrieval prefix).
    pub body: String,
    /// Category this USP falls under, if categorized.
    pub category: Option<String>,
    /// Source document identifier, if known.
    pub source_doc: Option<String>,
    /// Source page number, if known.
    pub source_page: Option<u32>,
}

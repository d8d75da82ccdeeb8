//! Product entity.

use super::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strongly-typed product identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub Uuid);

impl ProductId {
    /// Generates a new random product id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product within a tenant's catalog (e.g. a vehicle model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product id.
    pub id: ProductId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Product name.
    pub name: String,
    /// Creation timestamp (unix seconds).
    pub created_at: i64,
}

impl Product {
    /// Creates a new product for the given tenant.
    #[must_use]
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: ProductId::new(),
            tenant_id,
            name: name.into(),
            created_at: super::current_timestamp(),
        }
    }
}

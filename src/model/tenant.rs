//! Tenant: root of isolation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strongly-typed tenant identifier.
///
/// Every read path filters by this id (Invariant 1); wrapping it in a
/// newtype prevents accidentally passing a product or campaign id where a
/// tenant id is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

impl TenantId {
    /// Generates a new random tenant id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a tenant id from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root of tenant isolation. Every other entity is scoped by `tenant_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant id.
    pub id: TenantId,
    /// Human-readable tenant name.
    pub name: String,
    /// Creation timestamp (unix seconds).
    pub created_at: i64,
}

impl Tenant {
    /// Creates a new tenant with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(),
            name: name.into(),
            created_at: super::current_timestamp(),
        }
    }
}

//! Publish/Rollback (§4.8): single-writer promotion of a campaign variant,
//! keyed by `(tenant, product, locale, trim, market)` (Invariant 2).

use crate::error::{IngestionError, Result};
use crate::model::{CampaignVariant, CampaignVariantId, LineageAction, LineageEvent, ProductId, TenantId};
use crate::repository::LineageRepository;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

type PublishKey = (TenantId, ProductId, String, String, String);

/// Write-side campaign operations needed by publish/rollback. Narrower than
/// the read-only [`crate::repository::CampaignRepository`] the router consumes.
#[async_trait]
pub trait CampaignWriter: Send + Sync {
    /// Fetches the currently published variant for a publish key, if any.
    async fn get_published(&self, key: &PublishKeyRef<'_>) -> Result<Option<CampaignVariant>>;
    /// Fetches a specific version within a publish key.
    async fn get_by_version(&self, key: &PublishKeyRef<'_>, version: u32) -> Result<Option<CampaignVariant>>;
    /// Archives a campaign variant (status -> archived).
    async fn archive(&self, id: CampaignVariantId) -> Result<()>;
    /// Promotes a campaign variant to published.
    async fn set_published(&self, id: CampaignVariantId) -> Result<()>;
}

/// Borrowed form of a publish key, avoiding an allocation on the read path.
pub struct PublishKeyRef<'a> {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Product.
    pub product_id: ProductId,
    /// Locale.
    pub locale: &'a str,
    /// Trim.
    pub trim: &'a str,
    /// Market.
    pub market: &'a str,
}

/// Publishes/rolls back campaign variants, serializing writers per publish
/// key with an in-process lock table (§4.8 "single-writer per (tenant,
/// product, locale, trim, market)").
pub struct Publisher {
    writer: Arc<dyn CampaignWriter>,
    lineage: Arc<dyn LineageRepository>,
    locks: DashMap<PublishKey, Arc<Mutex<()>>>,
}

impl Publisher {
    /// Builds a publisher over the given write-side campaign and lineage stores.
    #[must_use]
    pub fn new(writer: Arc<dyn CampaignWriter>, lineage: Arc<dyn LineageRepository>) -> Self {
        Self {
            writer,
            lineage,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, key: PublishKey) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Atomically archives the current published variant (if any) for
    /// `target`'s publish key and promotes `target` in its place.
    pub async fn publish(&self, target: &CampaignVariant) -> Result<()> {
        let key = owned_key(target);
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let key_ref = PublishKeyRef {
            tenant_id: target.tenant_id,
            product_id: target.product_id,
            locale: &target.locale,
            trim: &target.trim,
            market: &target.market,
        };

        if let Some(current) = self.writer.get_published(&key_ref).await? {
            if current.id != target.id {
                self.writer.archive(current.id).await?;
                self.emit(target.tenant_id, LineageAction::Replaced, current.id, target.id).await?;
            }
        } else {
            self.emit(target.tenant_id, LineageAction::Created, target.id, target.id).await?;
        }

        self.writer.set_published(target.id).await
    }

    /// Restores a prior version by re-promoting its archived row and
    /// archiving whatever is currently live.
    pub async fn rollback(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        locale: &str,
        trim: &str,
        market: &str,
        target_version: u32,
    ) -> Result<()> {
        let key: PublishKey = (tenant_id, product_id, locale.to_string(), trim.to_string(), market.to_string());
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let key_ref = PublishKeyRef {
            tenant_id,
            product_id,
            locale,
            trim,
            market,
        };

        let target = self
            .writer
            .get_by_version(&key_ref, target_version)
            .await?
            .ok_or_else(|| IngestionError::CampaignNotFound(format!("version {target_version}")))?;

        if let Some(current) = self.writer.get_published(&key_ref).await? {
            if current.id != target.id {
                self.writer.archive(current.id).await?;
            }
        }
        self.writer.set_published(target.id).await?;
        self.emit(tenant_id, LineageAction::Replaced, target.id, target.id).await
    }

    async fn emit(&self, tenant_id: TenantId, action: LineageAction, source: CampaignVariantId, target: CampaignVariantId) -> Result<()> {
        let event = LineageEvent::new(
            tenant_id,
            action,
            source.to_string(),
            "publisher",
            json!({"promoted": target.to_string()}),
        );
        self.lineage.append(event).await
    }
}

fn owned_key(variant: &CampaignVariant) -> PublishKey {
    (
        variant.tenant_id,
        variant.product_id,
        variant.locale.clone(),
        variant.trim.clone(),
        variant.market.clone(),
    )
}

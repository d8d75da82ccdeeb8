//! In-memory cosine-similarity vector index (§4.1 "Vector Adapter").
//!
//! Maintains a mapping from chunk id to a unit-normalized vector and its
//! filter attributes. Guarded by a reader/writer lock: `search` acquires a
//! read lock, `insert`/`delete` acquire a write lock (§5).

use crate::error::{Result, VectorError};
use crate::model::{CampaignVariantId, ChunkId, ChunkType, ProductId, TenantId, Visibility};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default dimension before the adapter has adopted one from its first insert.
pub const DEFAULT_DIMENSION: usize = 768;

/// Filter attributes carried alongside a stored vector.
#[derive(Debug, Clone)]
pub struct VectorAttributes {
    /// Owning tenant. Every search is scoped by this (Invariant 1).
    pub tenant_id: TenantId,
    /// Owning product.
    pub product_id: ProductId,
    /// Owning campaign variant, if scoped to one.
    pub campaign_variant_id: Option<CampaignVariantId>,
    /// Chunk type.
    pub chunk_type: ChunkType,
    /// Visibility scope.
    pub visibility: Visibility,
    /// Embedding model version stamp.
    pub embedding_version: String,
}

/// Logical-AND filter over {tenant, product-set, campaign, chunk-type-set,
/// visibility-set, embedding-version}.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    /// Required tenant scope.
    pub tenant_id: Option<TenantId>,
    /// Restrict to these products, if set.
    pub product_ids: Option<Vec<ProductId>>,
    /// Restrict to this campaign variant, if set.
    pub campaign_variant_id: Option<CampaignVariantId>,
    /// Restrict to these chunk types, if set.
    pub chunk_types: Option<Vec<ChunkType>>,
    /// Restrict to these visibilities, if set.
    pub visibilities: Option<Vec<Visibility>>,
    /// Restrict to this embedding version, if set.
    pub embedding_version: Option<String>,
}

impl VectorFilter {
    /// Creates a filter scoped to a single tenant with no other constraints.
    #[must_use]
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ..Self::default()
        }
    }

    /// Restricts to the given product ids.
    #[must_use]
    pub fn with_products(mut self, ids: Vec<ProductId>) -> Self {
        self.product_ids = Some(ids);
        self
    }

    /// Restricts to the given campaign variant.
    #[must_use]
    pub const fn with_campaign(mut self, id: CampaignVariantId) -> Self {
        self.campaign_variant_id = Some(id);
        self
    }

    /// Restricts to the given chunk types.
    #[must_use]
    pub fn with_chunk_types(mut self, types: Vec<ChunkType>) -> Self {
        self.chunk_types = Some(types);
        self
    }

    /// Restricts to the given visibilities.
    #[must_use]
    pub fn with_visibilities(mut self, vis: Vec<Visibility>) -> Self {
        self.visibilities = Some(vis);
        self
    }

    fn matches(&self, attrs: &VectorAttributes) -> bool {
        if let Some(tenant_id) = self.tenant_id
            && attrs.tenant_id != tenant_id
        {
            return false;
        }
        if let Some(ids) = &self.product_ids
            && !ids.contains(&attrs.product_id)
        {
            return false;
        }
        if let Some(cv) = self.campaign_variant_id
            && attrs.campaign_variant_id != Some(cv)
        {
            return false;
        }
        if let Some(types) = &self.chunk_types
            && !types.contains(&attrs.chunk_type)
        {
            return false;
        }
        if let Some(vis) = &self.visibilities
            && !vis.contains(&attrs.visibility)
        {
            return false;
        }
        if let Some(v) = &self.embedding_version
            && &attrs.embedding_version != v
        {
            return false;
        }
        true
    }
}

/// One search hit: a chunk id with its distance and derived score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The matched chunk.
    pub chunk_id: ChunkId,
    /// `1 - dot(query, stored)`, clamped to `[-1, 1]`.
    pub distance: f32,
    /// `1 - distance`.
    pub score: f32,
}

/// Capability interface for a vector index, so production can swap in a
/// different backend without touching the router.
#[async_trait]
pub trait VectorAdapter: Send + Sync {
    /// Inserts or replaces a vector for `chunk_id`. Empty vectors are
    /// silently skipped (not an error).
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::DimensionMismatch`] if `vector`'s dimension
    /// differs from the adapter's adopted dimension and from every
    /// currently stored vector's dimension.
    async fn insert(&self, chunk_id: ChunkId, vector: Vec<f32>, attrs: VectorAttributes) -> Result<()>;

    /// Top-`k` cosine search under `filters`. Never errors on dimension
    /// mismatch — returns an empty result instead so keyword fallback stays
    /// viable (§4.1, §7 `DimensionMismatch`).
    async fn search(&self, query: &[f32], k: usize, filters: &VectorFilter) -> Result<Vec<SearchHit>>;

    /// Removes a chunk's vector, if present.
    async fn delete(&self, chunk_id: ChunkId) -> Result<()>;

    /// Number of vectors currently stored.
    async fn count(&self) -> Result<usize>;

    /// Releases resources. Idempotent.
    async fn close(&self) -> Result<()>;
}

#[derive(Debug)]
struct StoredVector {
    vector: Vec<f32>,
    attrs: VectorAttributes,
}

/// In-memory, `RwLock`-guarded cosine index.
pub struct InMemoryVectorAdapter {
    dimension: RwLock<Option<usize>>,
    entries: RwLock<HashMap<ChunkId, StoredVector>>,
    closed: std::sync::atomic::AtomicBool,
}

impl Default for InMemoryVectorAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVectorAdapter {
    /// Creates an empty adapter with no adopted dimension yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: RwLock::new(None),
            entries: RwLock::new(HashMap::new()),
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// The currently adopted dimension, if any vectors have been stored.
    pub async fn dimension(&self) -> Option<usize> {
        *self.dimension.read().await
    }
}

/// L2-normalizes `v` in place. A zero vector is left unchanged.
fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// `1 - dot(a, b)`, clamped to `[-1, 1]`. Assumes both are unit-normalized.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (1.0 - dot).clamp(-1.0, 1.0)
}

#[async_trait]
impl VectorAdapter for InMemoryVectorAdapter {
    async fn insert(&self, chunk_id: ChunkId, mut vector: Vec<f32>, attrs: VectorAttributes) -> Result<()> {
        if vector.is_empty() {
            return Ok(());
        }
        let incoming_dim = vector.len();

        let mut dim_guard = self.dimension.write().await;
        let mut entries = self.entries.write().await;

        match *dim_guard {
            None => {
                *dim_guard = Some(incoming_dim);
            }
            Some(adopted) if adopted == incoming_dim => {}
            Some(adopted) => {
                let all_match_incoming = entries.values().all(|e| e.vector.len() == incoming_dim);
                if all_match_incoming {
                    *dim_guard = Some(incoming_dim);
                } else {
                    return Err(VectorError::DimensionMismatch {
                        expected: adopted,
                        actual: incoming_dim,
                    }
                    .into());
                }
            }
        }

        l2_normalize(&mut vector);
        entries.insert(chunk_id, StoredVector { vector, attrs });
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize, filters: &VectorFilter) -> Result<Vec<SearchHit>> {
        let entries = self.entries.read().await;
        let candidates: Vec<&StoredVector> = entries.values().filter(|e| filters.matches(&e.attrs)).collect();

        let adopted = *self.dimension.read().await;
        let Some(adopted_dim) = adopted else {
            return Ok(vec![]);
        };

        if query.len() != adopted_dim {
            if candidates.is_empty() {
                drop(entries);
                *self.dimension.write().await = Some(query.len());
            }
            return Ok(vec![]);
        }

        let mut query_norm = query.to_vec();
        l2_normalize(&mut query_norm);

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter(|e| e.vector.len() == query_norm.len())
            .map(|e| {
                let distance = cosine_distance(&query_norm, &e.vector);
                SearchHit {
                    chunk_id: find_chunk_id(&entries, e),
                    distance,
                    score: 1.0 - distance,
                }
            })
            .collect();

        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, chunk_id: ChunkId) -> Result<()> {
        self.entries.write().await.remove(&chunk_id);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Finds the chunk id owning `target` by pointer identity. The map is keyed
/// by `ChunkId` but `search` iterates over values; this reconstructs the key
/// without a second pass keyed collection.
fn find_chunk_id(entries: &HashMap<ChunkId, StoredVector>, target: &StoredVector) -> ChunkId {
    entries
        .iter()
        .find(|(_, v)| std::ptr::eq(*v, target))
        .map(|(k, _)| *k)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChunkType, Visibility};

    fn attrs(tenant: TenantId, product: ProductId) -> VectorAttributes {
        VectorAttributes {
            tenant_id: tenant,
            product_id: product,
            campaign_variant_id: None,
            chunk_type: ChunkType::Global,
            visibility: Visibility::TenantOnly,
            embedding_version: "v1".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_adopts_dimension_from_first_vector() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant = TenantId::new();
        let product = ProductId::new();
        adapter
            .insert(ChunkId::new(), vec![1.0, 0.0, 0.0], attrs(tenant, product))
            .await
            .unwrap();
        assert_eq!(adapter.dimension().await, Some(3));
    }

    #[tokio::test]
    async fn insert_skips_empty_vectors() {
        let adapter = InMemoryVectorAdapter::new();
        adapter
            .insert(ChunkId::new(), vec![], attrs(TenantId::new(), ProductId::new()))
            .await
            .unwrap();
        assert_eq!(adapter.count().await.unwrap(), 0);
        assert_eq!(adapter.dimension().await, None);
    }

    #[tokio::test]
    async fn insert_rejects_mismatched_dimension() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant = TenantId::new();
        let product = ProductId::new();
        adapter
            .insert(ChunkId::new(), vec![1.0, 0.0], attrs(tenant, product))
            .await
            .unwrap();
        let err = adapter
            .insert(ChunkId::new(), vec![1.0, 0.0, 0.0], attrs(tenant, product))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DimensionMismatch);
    }

    #[tokio::test]
    async fn insert_re_adopts_when_all_stored_already_match_new_dimension() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant = TenantId::new();
        let product = ProductId::new();
        let id1 = ChunkId::new();
        adapter.insert(id1, vec![1.0, 0.0], attrs(tenant, product)).await.unwrap();
        adapter.delete(id1).await.unwrap();
        // dimension field still says 2, but store is empty: "all stored match incoming" vacuously true.
        adapter
            .insert(ChunkId::new(), vec![1.0, 0.0, 0.0], attrs(tenant, product))
            .await
            .unwrap();
        assert_eq!(adapter.dimension().await, Some(3));
    }

    #[tokio::test]
    async fn vectors_are_unit_normalized() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant = TenantId::new();
        let product = ProductId::new();
        let id = ChunkId::new();
        adapter.insert(id, vec![3.0, 4.0], attrs(tenant, product)).await.unwrap();
        let hits = adapter
            .search(&[3.0, 4.0], 1, &VectorFilter::for_tenant(tenant))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance).abs() < 1e-5);
    }

    #[tokio::test]
    async fn search_sorted_ascending_by_distance() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant = TenantId::new();
        let product = ProductId::new();
        adapter.insert(ChunkId::new(), vec![1.0, 0.0], attrs(tenant, product)).await.unwrap();
        adapter.insert(ChunkId::new(), vec![0.0, 1.0], attrs(tenant, product)).await.unwrap();
        adapter.insert(ChunkId::new(), vec![-1.0, 0.0], attrs(tenant, product)).await.unwrap();

        let hits = adapter
            .search(&[1.0, 0.0], 3, &VectorFilter::for_tenant(tenant))
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);
    }

    #[tokio::test]
    async fn search_respects_tenant_filter() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        let product = ProductId::new();
        adapter.insert(ChunkId::new(), vec![1.0, 0.0], attrs(tenant_a, product)).await.unwrap();
        adapter.insert(ChunkId::new(), vec![1.0, 0.0], attrs(tenant_b, product)).await.unwrap();

        let hits = adapter
            .search(&[1.0, 0.0], 10, &VectorFilter::for_tenant(tenant_a))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_with_no_candidates_silently_adapts() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant = TenantId::new();
        let product = ProductId::new();
        adapter.insert(ChunkId::new(), vec![1.0, 0.0], attrs(tenant, product)).await.unwrap();

        // Query a different tenant (zero candidates after filtering) with a different dimension.
        let other_tenant = TenantId::new();
        let hits = adapter
            .search(&[1.0, 0.0, 0.0], 5, &VectorFilter::for_tenant(other_tenant))
            .await
            .unwrap();
        assert!(hits.is_empty());
        assert_eq!(adapter.dimension().await, Some(3));
    }

    #[tokio::test]
    async fn dimension_mismatch_with_candidates_returns_empty_without_adapting() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant = TenantId::new();
        let product = ProductId::new();
        adapter.insert(ChunkId::new(), vec![1.0, 0.0], attrs(tenant, product)).await.unwrap();

        let hits = adapter
            .search(&[1.0, 0.0, 0.0], 5, &VectorFilter::for_tenant(tenant))
            .await
            .unwrap();
        assert!(hits.is_empty());
        // adapter keeps its original dimension since real candidates existed
        assert_eq!(adapter.dimension().await, Some(2));
    }

    #[tokio::test]
    async fn delete_removes_vector() {
        let adapter = InMemoryVectorAdapter::new();
        let tenant = TenantId::new();
        let product = ProductId::new();
        let id = ChunkId::new();
        adapter.insert(id, vec![1.0, 0.0], attrs(tenant, product)).await.unwrap();
        assert_eq!(adapter.count().await.unwrap(), 1);
        adapter.delete(id).await.unwrap();
        assert_eq!(adapter.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn close_clears_entries() {
        let adapter = InMemoryVectorAdapter::new();
        adapter
            .insert(ChunkId::new(), vec![1.0, 0.0], attrs(TenantId::new(), ProductId::new()))
            .await
            .unwrap();
        adapter.close().await.unwrap();
        assert_eq!(adapter.count().await.unwrap(), 0);
    }
}

//! The process-wide Response Cache (§9 "Response Cache"): deterministic
//! keying and TTL-by-intent caching of retrieval responses.

use crate::intent::Intent;
use crate::router::{RetrievalRequest, RetrievalResponse};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

struct CacheEntry {
    response: RetrievalResponse,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// A thread-safe response cache with per-entry TTL (§9).
///
/// `default_ttl` is used unless [`Self::ttl_for_intent`] shortens it for a
/// fast-moving intent family.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl ResponseCache {
    /// Creates an empty cache with the given default TTL.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Looks up a cached response for `req`, evicting it if expired.
    pub async fn get(&self, req: &RetrievalRequest) -> Option<RetrievalResponse> {
        let key = cache_key(req);
        let expired = match self.entries.get(&key) {
            Some(entry) => entry.is_expired(),
            None => return None,
        };
        if expired {
            self.entries.remove(&key);
            return None;
        }
        self.entries.get(&key).map(|e| e.response.clone())
    }

    /// Stores `response` under `req`'s cache key, using the TTL appropriate
    /// to the response's classified intent.
    pub async fn put(&self, req: &RetrievalRequest, response: RetrievalResponse) {
        let key = cache_key(req);
        let ttl = self.ttl_for_intent(response.intent);
        self.entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Removes all entries. Used by tests and by explicit cache-bust calls.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries currently stored, including expired ones not yet
    /// evicted by a `get`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// TTL-by-intent: comparisons and USP lookups change less often than
    /// spec lookups, so they get a longer TTL; unknown-intent responses get
    /// the shortest TTL since they're the least likely to be a good answer.
    fn ttl_for_intent(&self, intent: Intent) -> Duration {
        match intent {
            Intent::Comparison | Intent::UspLookup => self.default_ttl * 2,
            Intent::Unknown => self.default_ttl / 2,
            Intent::SpecLookup | Intent::Faq => self.default_ttl,
        }
    }
}

/// Builds the deterministic cache key (§9 "Cache key"):
/// `sha256(tenant | question_or_sorted_canonical_specs | sorted_product_ids |
/// campaign_variant_id? | intent_hint? | sorted_category_filters)`,
/// truncated to 16 bytes, prefixed `retrieval:response:`.
fn cache_key(req: &RetrievalRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(req.tenant_id.to_string().as_bytes());
    hasher.update(b"|");

    if req.requested_specs.is_empty() {
        hasher.update(req.question.as_bytes());
    } else {
        let mut specs = req.requested_specs.clone();
        specs.sort();
        hasher.update(specs.join(",").as_bytes());
    }
    hasher.update(b"|");

    let mut product_ids: Vec<String> = req.product_ids.iter().map(ToString::to_string).collect();
    product_ids.sort();
    hasher.update(product_ids.join(",").as_bytes());
    hasher.update(b"|");

    if let Some(cv) = req.campaign_variant_id {
        hasher.update(cv.to_string().as_bytes());
    }
    hasher.update(b"|");

    if let Some(hint) = &req.intent_hint {
        hasher.update(hint.as_bytes());
    }
    hasher.update(b"|");

    let mut categories = req.filters.categories.clone();
    categories.sort();
    hasher.update(categories.join(",").as_bytes());

    let digest = hasher.finalize();
    format!("retrieval:response:{}", hex_prefix(&digest, 16))
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes.iter().take(n).map(|b| format!("{b:02x}")).collect()
}

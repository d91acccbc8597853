//! In-process cache backend (§4.4). Grounded on `http-cache`'s
//! `MokaManager`: an `Arc`-wrapped concurrent map guarded behind the
//! `CacheManager` trait, swapped here for `dashmap` (already in the
//! dependency graph for the dispatch table) instead of pulling in `moka`
//! for a data structure this simple.

use dashmap::DashMap;

use crate::{
    cache::{CacheBackend, CacheEntry, CacheKey, PutMetadata},
    error::Result,
};

/// A `CacheBackend` backed by a process-local concurrent map. Entries don't
/// survive past the process and aren't shared across instances; construct
/// one per [`crate::Resolver`] (or share an `Arc` across them to pool
/// entries deliberately).
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn render(key: &CacheKey) -> String {
        key.render_remote_key()
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn lookup(&self, key: &CacheKey, now: i64) -> Result<Option<CacheEntry>> {
        let rendered = Self::render(key);
        let Some(entry) = self.entries.get(&rendered) else {
            return Ok(None);
        };
        if entry.is_fresh(now) {
            Ok(Some(entry.clone()))
        } else {
            drop(entry);
            self.entries.remove(&rendered);
            Ok(None)
        }
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<PutMetadata> {
        let rendered = Self::render(key);
        self.entries.insert(rendered.clone(), entry);
        Ok(PutMetadata { key: rendered })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::{RequestDescriptor, ResponseDescriptor};
    use serde_json::json;
    use url::Url;

    fn entry(expires_at: Option<i64>) -> CacheEntry {
        CacheEntry::new(
            RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            ResponseDescriptor {
                status: 200,
                headers: Default::default(),
                body: json!({"ok": true}),
                transport_handle: None,
            },
            expires_at,
            0,
            true,
        )
    }

    #[tokio::test]
    async fn round_trips_a_fresh_entry() {
        let backend = MemoryCacheBackend::new();
        let key = CacheKey::new("widget", &json!({"id": 1}));
        backend.put(&key, entry(None)).await.unwrap();
        let found = backend.lookup(&key, 0).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_absent_and_evicted() {
        let backend = MemoryCacheBackend::new();
        let key = CacheKey::new("widget", &json!({"id": 1}));
        backend.put(&key, entry(Some(100))).await.unwrap();
        assert!(backend.lookup(&key, 101).await.unwrap().is_none());
        assert_eq!(backend.entries.len(), 0);
    }

    #[tokio::test]
    async fn distinct_projections_key_separately() {
        let backend = MemoryCacheBackend::new();
        let a = CacheKey::new("widget", &json!({"id": 1}));
        let b = CacheKey::new("widget", &json!({"id": 2}));
        backend.put(&a, entry(None)).await.unwrap();
        assert!(backend.lookup(&b, 0).await.unwrap().is_none());
    }
}

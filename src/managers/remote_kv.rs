//! Remote key/value cache backend (§4.4). There is no single dominant
//! remote KV wire protocol the way there is for moka/cacache-style local
//! engines, so this backend is grounded on `http-cache`'s `CacheManager`
//! trait shape itself rather than any one `managers/*.rs` file: it defines
//! a narrow [`RemoteKvClient`] seam and lets the caller plug in whichever
//! client their remote store actually speaks (redis, memcached, an
//! internal HTTP KV service, ...).

use crate::{
    cache::{CacheBackend, CacheEntry, CacheKey, PutMetadata},
    error::{Result, ResolverError},
};

/// The minimal remote KV operations this backend needs. Implement this
/// against whatever client talks to your actual store.
#[async_trait::async_trait]
pub trait RemoteKvClient: Send + Sync + 'static {
    /// Fetch the raw bytes stored at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Store `value` at `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// A `CacheBackend` delegating storage to a [`RemoteKvClient`]. Per Design
/// Notes §9, construction without a client fails explicitly rather than
/// silently degrading to a no-op cache: `RemoteKvCacheBackend::new(None)`
/// would make every exchange look like a permanent cache miss, which is a
/// much harder failure mode to notice than an error at startup.
pub struct RemoteKvCacheBackend {
    client: Box<dyn RemoteKvClient>,
}

impl RemoteKvCacheBackend {
    /// Build a backend around `client`, failing if none was supplied.
    pub fn new(client: Option<Box<dyn RemoteKvClient>>) -> Result<Self> {
        match client {
            Some(client) => Ok(Self { client }),
            None => Err(ResolverError::RemoteKvUnavailable),
        }
    }
}

#[async_trait::async_trait]
impl CacheBackend for RemoteKvCacheBackend {
    async fn lookup(&self, key: &CacheKey, now: i64) -> Result<Option<CacheEntry>> {
        let rendered = key.render_remote_key();
        let Some(bytes) = self.client.get(&rendered).await? else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes)?;
        Ok(if entry.is_fresh(now) { Some(entry) } else { None })
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<PutMetadata> {
        let rendered = key.render_remote_key();
        self.client.set(&rendered, serde_json::to_vec(&entry)?).await?;
        Ok(PutMetadata { key: rendered })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::{RequestDescriptor, ResponseDescriptor};
    use dashmap::DashMap;
    use serde_json::json;
    use url::Url;

    #[derive(Default)]
    struct FakeClient {
        store: DashMap<String, Vec<u8>>,
    }

    #[async_trait::async_trait]
    impl RemoteKvClient for FakeClient {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.store.get(key).map(|v| v.clone()))
        }
        async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
            self.store.insert(key.to_string(), value);
            Ok(())
        }
    }

    fn entry() -> CacheEntry {
        CacheEntry::new(
            RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            ResponseDescriptor {
                status: 200,
                headers: Default::default(),
                body: json!({"ok": true}),
                transport_handle: None,
            },
            None,
            0,
            true,
        )
    }

    #[test]
    fn construction_without_a_client_fails() {
        let result = RemoteKvCacheBackend::new(None);
        assert!(matches!(result, Err(ResolverError::RemoteKvUnavailable)));
    }

    #[tokio::test]
    async fn round_trips_through_the_fake_client() {
        let backend =
            RemoteKvCacheBackend::new(Some(Box::new(FakeClient::default()))).unwrap();
        let key = CacheKey::new("widget", &json!({"id": 1}));
        backend.put(&key, entry()).await.unwrap();
        assert!(backend.lookup(&key, 0).await.unwrap().is_some());
    }
}

//! The `CacheBackend` interface (§4.4) and the cache key/entry shapes it
//! trades in (§3). Grounded on `http-cache`'s `CacheManager` trait
//! (`get`/`put`/`delete`, `Send + Sync + 'static`, `#[async_trait]`).

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    fingerprint::{fingerprint, Fingerprint},
    transport::{RequestDescriptor, ResponseDescriptor},
};

/// `[cache_id, params_projection]` (§3). `projection` is `None` when the
/// projection is empty (no lookup params).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheKey {
    /// The spec's `lookup_id` (or derived fallback).
    pub cache_id: String,
    /// The fingerprint of the lookup-param projection, or `None` if that
    /// projection was empty.
    pub projection_fingerprint: Option<Fingerprint>,
    /// An explicit, caller-supplied key (§6.4) that bypasses `cache_id`/
    /// fingerprint derivation. When set, `render_filesystem_path` defers to
    /// [`Self::render_custom`] entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Vec<String>>,
}

impl CacheKey {
    /// Build a cache key from a cache id and a lookup-param projection.
    /// An empty object projection maps to `None` (§3: "if the result is
    /// empty, the projection is nil").
    pub fn new(cache_id: impl Into<String>, projection: &serde_json::Value) -> Self {
        let is_empty = matches!(projection, serde_json::Value::Object(m) if m.is_empty());
        Self {
            cache_id: cache_id.into(),
            projection_fingerprint: if is_empty {
                None
            } else {
                Some(fingerprint(projection))
            },
            custom: None,
        }
    }

    /// Build a key from an explicit, literal set of segments (§6.4),
    /// bypassing `cache_id`/fingerprint derivation. `cache_id` is kept as a
    /// joined, human-readable stand-in for logging and equality; the
    /// segments in `custom` are what actually gets rendered.
    pub fn custom(segments: Vec<String>) -> Self {
        Self {
            cache_id: segments.join("."),
            projection_fingerprint: None,
            custom: Some(segments),
        }
    }

    /// Render this key as `<ns>.<name>/<first2>/<rest>.edn`, the filesystem
    /// layout from §3/§6.4, using the fingerprint as the shard source — or,
    /// when this key carries an explicit [`Self::custom`] set of segments,
    /// defer to [`Self::render_custom`] entirely.
    pub fn render_filesystem_path(&self) -> String {
        if let Some(segments) = &self.custom {
            return Self::render_custom(segments);
        }
        let dotted = self.cache_id.replace('/', ".");
        match &self.projection_fingerprint {
            Some(fp) => {
                let (shard, rest) = fp.split_at(2);
                format!("{dotted}/{shard}/{rest}.edn")
            }
            None => format!("{dotted}/none.edn"),
        }
    }

    /// Render this key with `/` separators, the remote-KV layout from §3.
    pub fn render_remote_key(&self) -> String {
        match &self.projection_fingerprint {
            Some(fp) => format!("{}/{}", self.cache_id.replace('.', "/"), fp),
            None => self.cache_id.replace('.', "/"),
        }
    }

    /// Render an explicit, caller-supplied custom key (§6.4): segments
    /// joined by `/`, keyword namespaces joined by `.`, last segment
    /// sharded by its first two characters when longer than two.
    pub fn render_custom(segments: &[String]) -> String {
        let Some((last, init)) = segments.split_last() else {
            return String::new();
        };
        let mut parts: Vec<String> = init.to_vec();
        if last.len() > 2 {
            let (shard, rest) = last.split_at(2);
            parts.push(shard.to_string());
            parts.push(format!("{rest}.edn"));
        } else {
            parts.push(format!("{last}.edn"));
        }
        parts.join("/")
    }
}

/// `{req, res, expires_at, cached_at, success?}` plus whatever metadata a
/// concrete backend attaches (§3). The transport-handle field is always
/// stripped from `res` before an entry is constructed (§4.2 step 7, §8
/// invariant 8) — `CacheEntry::new` enforces this rather than trusting
/// callers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The request that produced this entry.
    pub req: RequestDescriptor,
    /// The (transport-handle-stripped) response.
    pub res: ResponseDescriptor,
    /// Absolute expiry, epoch milliseconds. `None` means "never expires".
    pub expires_at: Option<i64>,
    /// When this entry was written, epoch milliseconds.
    pub cached_at: i64,
    /// Whether the exchange that produced this entry was successful.
    pub success: bool,
}

impl CacheEntry {
    /// Construct an entry, stripping the transport-handle field from `res`.
    pub fn new(
        req: RequestDescriptor,
        res: ResponseDescriptor,
        expires_at: Option<i64>,
        cached_at: i64,
        success: bool,
    ) -> Self {
        Self { req, res: res.stripped_for_cache(), expires_at, cached_at, success }
    }

    /// Whether this entry is still fresh at `now` (§3 invariant: "a stored
    /// entry whose `expires_at` is past is treated as absent").
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expires_at.map(|exp| exp >= now).unwrap_or(true)
    }
}

/// Metadata a backend returns from `put`, echoed in `store-in-cache` events
/// (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PutMetadata {
    /// The rendered key the entry was stored under.
    pub key: String,
}

/// `lookup(spec, params) -> entry | nil`, `put(spec, params, entry) ->
/// metadata` (§4.4). Implementations must tolerate nil param projections,
/// never raise for a plain cache miss, and share the [`CacheKey`] keying
/// discipline (§6.3).
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Look up a non-expired entry for `key`. Expired entries are treated
    /// as absent; filesystem/remote backends SHOULD delete them on read.
    async fn lookup(&self, key: &CacheKey, now: i64) -> Result<Option<CacheEntry>>;

    /// Store `entry` under `key`, returning backend metadata.
    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<PutMetadata>;
}

//! The single operation the resolver consumes from the outside world:
//! given a request descriptor, produce a response descriptor or raise a
//! transport error (§2 "HTTP Transport"). Implementing an HTTP client is an
//! explicit Non-goal of this crate; this module only describes the seam a
//! real client plugs into, plus (behind `transport-reqwest`) a thin default
//! backed by `reqwest::Client`, the same way `http-cache-reqwest` adapts to
//! `reqwest` without reimplementing it.

use std::{collections::HashMap, fmt, sync::Arc};

use dashmap::DashMap;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;

/// Opaque-to-the-core description of one HTTP request (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Defaults to `GET`.
    #[serde(with = "method_serde")]
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Case-insensitive header map, represented as a plain map keyed by
    /// lower-cased header name; multiple values join with `", "`.
    pub headers: HashMap<String, String>,
    /// Query parameters appended to `url` by the transport.
    pub query: HashMap<String, String>,
    /// Raw request body, mutually exclusive with `form`.
    pub body: Option<Value>,
    /// `application/x-www-form-urlencoded`-style fields.
    pub form: HashMap<String, String>,
    /// HTTP basic-auth credentials, if any.
    pub basic_auth: Option<(String, String)>,
    /// Explicit content-type hint, overriding any inferred from `body`.
    pub content_type: Option<String>,
    /// Hint for how the transport should decode the response body
    /// (e.g. `"json"`, `"text"`, `"bytes"`).
    pub decode_as: Option<String>,
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self {
            method: Method::GET,
            url: Url::parse("http://localhost/").unwrap(),
            headers: HashMap::new(),
            query: HashMap::new(),
            body: None,
            form: HashMap::new(),
            basic_auth: None,
            content_type: None,
            decode_as: None,
        }
    }
}

impl RequestDescriptor {
    /// Construct a minimal `GET` request descriptor for `url`.
    pub fn get(url: Url) -> Self {
        Self { url, ..Default::default() }
    }

    /// Insert (replacing) a header, normalizing the key to lowercase per
    /// RFC 7230.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }
}

mod method_serde {
    use http::Method;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        method: &Method,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        method.as_str().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Method, D::Error> {
        let s = String::deserialize(deserializer)?;
        Method::from_bytes(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Opaque-to-the-core description of one HTTP response (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Decoded response body.
    pub body: Value,
    /// The single field the core strips before caching (§3, Cache Entry;
    /// Design Notes' open question on transport-handle stripping). Concrete
    /// transports that need to carry implementation-private data (e.g. a
    /// connection handle identifier for tracing) serialize it all here.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transport_handle: Option<Value>,
}

impl ResponseDescriptor {
    /// Whether this response's status is 2xx, the default `success?`
    /// predicate (§3).
    pub fn is_2xx(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A copy of this response with the transport-handle field removed, as
    /// required before storing it in a [`crate::cache::CacheEntry`] (§4.2
    /// step 7, §8 invariant 8).
    pub fn stripped_for_cache(&self) -> Self {
        let mut copy = self.clone();
        copy.transport_handle = None;
        copy
    }
}

/// Transport-level failure, classified where possible into the §7 taxonomy
/// via [`crate::error::FailureReason`].
#[derive(Debug, Clone)]
pub struct TransportError {
    /// Human-readable description.
    pub message: String,
    /// Best-effort classification, when the transport can tell.
    pub kind: TransportErrorKind,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// Transport-reported failure categories (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS resolution failed.
    UnknownHost,
    /// The remote end refused the connection.
    ConnectionRefused,
    /// Establishing the connection timed out.
    ConnectionTimeout,
    /// An established connection timed out waiting for data.
    SocketTimeout,
    /// Not classifiable.
    Other,
}

/// The single operation a transport must implement: given a request
/// descriptor, produce a response descriptor or a [`TransportError`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform one request/response exchange.
    async fn send(
        &self,
        req: &RequestDescriptor,
    ) -> Result<ResponseDescriptor, TransportError>;
}

type TransportKey = (Method, String);

/// Process-wide dispatch table keyed on `(method, url)`, the "sole
/// process-wide registry" Design Notes §9 describes, so tests can swap in
/// fake responders without threading a transport handle through every spec.
/// Lookups fall back to a default transport, which is real (not a stub)
/// unless the caller explicitly registers one.
pub struct DispatchTable {
    overrides: DashMap<TransportKey, Arc<dyn Transport>>,
    default: Arc<dyn Transport>,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("overrides", &self.overrides.len())
            .finish_non_exhaustive()
    }
}

impl DispatchTable {
    fn new(default: Arc<dyn Transport>) -> Self {
        Self { overrides: DashMap::new(), default }
    }

    /// Register `transport` as the handler for `(method, url)`, shadowing
    /// the default transport for that exact pair.
    pub fn register(
        &self,
        method: Method,
        url: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) {
        self.overrides.insert((method, url.into()), transport);
    }

    /// Remove a previously registered override.
    pub fn unregister(&self, method: &Method, url: &str) {
        self.overrides.remove(&(method.clone(), url.to_string()));
    }

    /// Resolve the transport that should handle `req`: an exact
    /// `(method, url)` override if one is registered, else the default.
    pub fn resolve(&self, req: &RequestDescriptor) -> Arc<dyn Transport> {
        let key = (req.method.clone(), req.url.to_string());
        self.overrides
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_else(|| Arc::clone(&self.default))
    }

    /// Replace the fallback transport used when no override matches.
    pub fn set_default(&mut self, default: Arc<dyn Transport>) {
        self.default = default;
    }
}

static DISPATCH_TABLE: OnceLock<DispatchTable> = OnceLock::new();

/// The process-wide dispatch table, lazily initialized with the crate's
/// default transport (`reqwest`-backed when `transport-reqwest` is enabled,
/// otherwise a transport that always reports `Other` — callers without the
/// default feature must register a transport themselves).
pub fn dispatch_table() -> &'static DispatchTable {
    DISPATCH_TABLE.get_or_init(|| DispatchTable::new(default_transport()))
}

fn default_transport() -> Arc<dyn Transport> {
    #[cfg(feature = "transport-reqwest")]
    {
        Arc::new(ReqwestTransport::default())
    }
    #[cfg(not(feature = "transport-reqwest"))]
    {
        Arc::new(UnconfiguredTransport)
    }
}

#[cfg(not(feature = "transport-reqwest"))]
struct UnconfiguredTransport;

#[cfg(not(feature = "transport-reqwest"))]
#[async_trait::async_trait]
impl Transport for UnconfiguredTransport {
    async fn send(
        &self,
        _req: &RequestDescriptor,
    ) -> Result<ResponseDescriptor, TransportError> {
        Err(TransportError {
            message: "no transport configured: enable `transport-reqwest` \
                      or register one via DispatchTable::register"
                .into(),
            kind: TransportErrorKind::Other,
        })
    }
}

/// Default transport backed by [`reqwest::Client`].
#[cfg(feature = "transport-reqwest")]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "transport-reqwest")]
impl Default for ReqwestTransport {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[cfg(feature = "transport-reqwest")]
impl ReqwestTransport {
    /// Build a transport around a caller-configured `reqwest::Client`
    /// (custom timeouts, proxies, TLS config, …).
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn classify(err: &reqwest::Error) -> TransportErrorKind {
        if err.is_timeout() {
            return if err.is_connect() {
                TransportErrorKind::ConnectionTimeout
            } else {
                TransportErrorKind::SocketTimeout
            };
        }
        if err.is_connect() {
            let msg = err.to_string();
            if msg.contains("dns") || msg.contains("resolve") {
                return TransportErrorKind::UnknownHost;
            }
            if msg.contains("refused") {
                return TransportErrorKind::ConnectionRefused;
            }
        }
        TransportErrorKind::Other
    }
}

#[cfg(feature = "transport-reqwest")]
#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        req: &RequestDescriptor,
    ) -> Result<ResponseDescriptor, TransportError> {
        let mut builder = self.client.request(req.method.clone(), req.url.clone());
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some((user, pass)) = &req.basic_auth {
            builder = builder.basic_auth(user, Some(pass));
        }
        if !req.form.is_empty() {
            builder = builder.form(&req.form);
        } else if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        if let Some(content_type) = &req.content_type {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
        }

        let response = builder.send().await.map_err(|e| TransportError {
            kind: Self::classify(&e),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();

        let decode_as = req.decode_as.as_deref().unwrap_or("json");
        let body = match decode_as {
            "bytes" => {
                let bytes = response.bytes().await.map_err(|e| TransportError {
                    kind: TransportErrorKind::Other,
                    message: e.to_string(),
                })?;
                Value::String(hex::encode(bytes))
            }
            "text" => {
                let text = response.text().await.map_err(|e| TransportError {
                    kind: TransportErrorKind::Other,
                    message: e.to_string(),
                })?;
                Value::String(text)
            }
            _ => {
                let text = response.text().await.map_err(|e| TransportError {
                    kind: TransportErrorKind::Other,
                    message: e.to_string(),
                })?;
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
        };

        Ok(ResponseDescriptor { status, headers, body, transport_handle: None })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stripped_for_cache_removes_transport_handle() {
        let res = ResponseDescriptor {
            status: 200,
            headers: HashMap::new(),
            body: Value::Null,
            transport_handle: Some(Value::String("conn-42".into())),
        };
        let stripped = res.stripped_for_cache();
        assert!(stripped.transport_handle.is_none());
        assert!(res.transport_handle.is_some());
    }

    #[test]
    fn is_2xx_boundaries() {
        let mk = |status| ResponseDescriptor {
            status,
            headers: HashMap::new(),
            body: Value::Null,
            transport_handle: None,
        };
        assert!(mk(200).is_2xx());
        assert!(mk(299).is_2xx());
        assert!(!mk(300).is_2xx());
        assert!(!mk(199).is_2xx());
    }

    #[test]
    fn request_header_keys_are_lowercased() {
        let req = RequestDescriptor::get(Url::parse("http://x/").unwrap())
            .with_header("Authorization", "Bearer T");
        assert_eq!(req.headers.get("authorization").unwrap(), "Bearer T");
    }

    struct Stub(u16);

    #[async_trait::async_trait]
    impl Transport for Stub {
        async fn send(
            &self,
            _req: &RequestDescriptor,
        ) -> Result<ResponseDescriptor, TransportError> {
            Ok(ResponseDescriptor {
                status: self.0,
                headers: HashMap::new(),
                body: Value::Null,
                transport_handle: None,
            })
        }
    }

    #[tokio::test]
    async fn dispatch_table_override_shadows_default() {
        let table = DispatchTable::new(Arc::new(Stub(500)));
        let url = "http://example.test/widgets";
        table.register(Method::GET, url, Arc::new(Stub(200)));
        let req = RequestDescriptor::get(Url::parse(url).unwrap());
        let transport = table.resolve(&req);
        let res = transport.send(&req).await.unwrap();
        assert_eq!(res.status, 200);

        table.unregister(&Method::GET, url);
        let transport = table.resolve(&req);
        let res = transport.send(&req).await.unwrap();
        assert_eq!(res.status, 500);
    }
}

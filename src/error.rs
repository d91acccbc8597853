use thiserror::Error;

use crate::transport::{RequestDescriptor, ResponseDescriptor};

/// A `Result` typedef to use with [`ResolverError`].
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Errors raised by the resolver itself, as opposed to failures of an
/// individual exchange (which are reported as data — see [`FailureReason`]
/// — rather than raised, since one failing key must never abort the whole
/// resolution).
#[derive(Error, Debug)]
pub enum ResolverError {
    /// A spec named neither `req` nor `req_fn`.
    #[error("spec `{0}` has neither `req` nor `req_fn`")]
    MissingReqOrReqFn(String),

    /// A spec's `params` referenced a path that resolves to nothing, and
    /// that name is also absent from the specs table.
    #[error("missing params for `{path}`: {missing:?}")]
    MissingParams {
        /// The key that could not be resolved.
        path: String,
        /// The specific parameter names that were missing.
        missing: Vec<String>,
    },

    /// The remote KV cache backend was constructed without a client.
    #[error(
        "remote KV cache backend requires a RemoteKvClient; none was supplied"
    )]
    RemoteKvUnavailable,

    /// The event sink was closed before the resolution finished publishing.
    #[error("event sink closed unexpectedly")]
    SinkClosed,

    /// Error from the filesystem cache backend's I/O.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error (de)serializing a cache entry.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    /// Error from the default `reqwest`-backed transport.
    #[cfg(feature = "transport-reqwest")]
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

/// The error taxonomy from §7: the `error_reason` surfaced on a `failed`
/// event and on the assembled result. This is domain data, not a Rust
/// [`std::error::Error`] — a resolution carries it rather than raising it,
/// so one key's exhaustion never aborts resolution of the others.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// A required (non-lookup) param was neither in context nor resolvable.
    MissingParams,
    /// The last exchange's `max_retries` was exceeded.
    RetriesExhausted,
    /// A non-success response with no retry policy attached.
    RequestFailed,
    /// Transport reported a DNS-style failure.
    UnknownHost,
    /// Transport reported a refused connection.
    ConnectionRefused,
    /// Transport reported a connection-establishment timeout.
    ConnectionTimeout,
    /// Transport reported a read/write timeout on an established connection.
    SocketTimeout,
    /// The spec had neither `req` nor `req_fn`.
    MissingReqOrReqFn,
    /// Catch-all for anything not classifiable above.
    Unknown,
}

/// The `error_data` half of a `failed` event (§6.2, §7): whatever detail
/// the taxonomy entry for a given [`FailureReason`] calls for. Fields not
/// relevant to a particular reason are simply left `None`/empty rather than
/// split into one struct per variant, since most callers only care about
/// one or two fields regardless of reason.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct FailureData {
    /// `missing-params`: the param names that were neither in context nor
    /// resolvable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    /// `retries-exhausted`: attempts made before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// `retries-exhausted`: the ceiling that was exceeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// The last request sent for this key, when one was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req: Option<RequestDescriptor>,
    /// The last response received for this key, when one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub res: Option<ResponseDescriptor>,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingParams => "missing-params",
            Self::RetriesExhausted => "retries-exhausted",
            Self::RequestFailed => "request-failed",
            Self::UnknownHost => "unknown-host",
            Self::ConnectionRefused => "connection-refused",
            Self::ConnectionTimeout => "connection-timeout",
            Self::SocketTimeout => "socket-timeout",
            Self::MissingReqOrReqFn => "missing-req-or-req-fn",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn failure_reason_renders_kebab_case() {
        assert_eq!(FailureReason::MissingParams.to_string(), "missing-params");
        assert_eq!(
            FailureReason::RetriesExhausted.to_string(),
            "retries-exhausted"
        );
        assert_eq!(FailureReason::Unknown.to_string(), "unknown");
    }

    #[test]
    fn missing_params_error_carries_names() {
        let err = ResolverError::MissingParams {
            path: "token".into(),
            missing: vec!["client_id".into()],
        };
        assert!(err.to_string().contains("client_id"));
    }
}

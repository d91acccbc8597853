#![forbid(unsafe_code)]
#![deny(
    missing_debug_implementations,
    nonstandard_style,
    unused_qualifications,
    unused_import_braces
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! A dependency-driven HTTP request-resolution engine.
//!
//! Where an HTTP client sends one request and hands back one response,
//! `reqweave` resolves a *graph* of named requests: some depend on values
//! produced by others (an API token that has to be fetched before the
//! request that needs it can even be built), some are cacheable, some
//! should be retried on failure, and all of it should happen with as much
//! concurrency as the dependencies allow.
//!
//! The three pieces you compose are:
//!
//! - A [`Spec`] describes one logical request: either a fixed
//!   [`RequestDescriptor`], or a function from resolved params to one.
//! - A [`Context`] holds resolved param values and pending sub-spec
//!   references as resolution progresses.
//! - A [`cache::CacheBackend`] decides what gets looked up and stored, and
//!   under what key.
//!
//! ```rust,no_run
//! use reqweave::{spec::Spec, transport::RequestDescriptor, resolver::ResolverOptions, request};
//! use url::Url;
//!
//! # async fn run() -> reqweave::error::Result<()> {
//! let spec = Spec::inline(
//!     "weather",
//!     RequestDescriptor::get(Url::parse("https://example.invalid/weather").unwrap()),
//! );
//! let result = request(vec![spec.into()], ResolverOptions::default()).await;
//! assert!(result.body("weather").is_some() || !result.is_success());
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod cache;
pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod exchange;
pub mod fingerprint;
pub mod managers;
mod panics;
pub mod policy;
#[cfg(feature = "rate-limiting")]
#[cfg_attr(docsrs, doc(cfg(feature = "rate-limiting")))]
pub mod rate_limiting;
pub mod resolver;
pub mod spec;
pub mod transport;

use std::sync::Arc;

pub use assembler::{assemble, CacheStatus, KeyResult, LogEntry, ResolvedResult};
pub use context::{path, Context, ParamPath, ParamValue};
pub use error::{FailureReason, ResolverError, Result};
pub use events::{Event, EventStream};
pub use exchange::{CacheDecision, Exchange, RetryDecision};
pub use resolver::{Resolver, ResolverOptions};
pub use spec::Spec;
pub use transport::{dispatch_table, RequestDescriptor, ResponseDescriptor, Transport};

/// Resolve `specs` to completion and return the assembled result (§6.1).
/// This is the simple entry point: it drains the whole event stream
/// internally. Use [`request_with_log`] when callers need to observe
/// individual events as they happen.
pub async fn request(specs: Vec<Arc<Spec>>, options: ResolverOptions) -> ResolvedResult {
    let params = options.params.clone();
    let events = Resolver::spawn(specs, options).collect().await;
    assemble(events, &params)
}

/// Resolve `specs`, returning the live event stream alongside a future that
/// resolves to the assembled result once the stream ends (§6.1). Callers
/// that want to react to events in real time (progress reporting,
/// streaming partial results) should drain `events` themselves; awaiting
/// `result` without first draining `events` will deadlock once the event
/// buffer fills, since nothing is reading the channel.
pub fn request_with_log(
    specs: Vec<Arc<Spec>>,
    options: ResolverOptions,
) -> (EventStream, impl std::future::Future<Output = ResolvedResult>) {
    let params = options.params.clone();
    let mut inner = Resolver::spawn(specs, options);
    let (caller_sink, caller_stream) = events::EventSink::new(events::DEFAULT_EVENT_BUFFER);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = inner.next().await {
            let _ = tx.send(event.clone());
            if caller_sink.emit(event).await.is_err() {
                break;
            }
        }
    });
    let result = async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assemble(events, &params)
    };
    (caller_stream, result)
}

/// Resolve several independent spec graphs concurrently, returning one
/// merged event stream (§6.1's `make_requests`). Each graph in `graphs` is
/// resolved with its own [`ResolverOptions`] (so e.g. each can use a
/// different cache backend), and their events interleave on the returned
/// stream as they occur.
pub fn make_requests(
    graphs: Vec<(Vec<Arc<Spec>>, ResolverOptions)>,
) -> EventStream {
    let (sink, stream) = events::EventSink::new(events::DEFAULT_EVENT_BUFFER);
    for (specs, options) in graphs {
        let sink = sink.clone();
        let mut inner = Resolver::spawn(specs, options);
        tokio::spawn(async move {
            while let Some(event) = inner.next().await {
                if sink.emit(event).await.is_err() {
                    break;
                }
            }
        });
    }
    stream
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::{dispatch_table, Transport, TransportError};
    use async_trait::async_trait;
    use serde_json::json;
    use url::Url;

    #[derive(Debug, Default)]
    struct OkTransport;

    #[async_trait]
    impl Transport for OkTransport {
        async fn send(
            &self,
            _req: &RequestDescriptor,
        ) -> std::result::Result<ResponseDescriptor, TransportError> {
            Ok(ResponseDescriptor {
                status: 200,
                headers: Default::default(),
                body: json!({"ok": true}),
                transport_handle: None,
            })
        }
    }

    #[tokio::test]
    async fn request_resolves_a_single_inline_spec() {
        let url = Url::parse("http://lib-test.invalid/ok").unwrap();
        dispatch_table().register(http::Method::GET, url.to_string(), Arc::new(OkTransport));
        let spec = Arc::new(Spec::inline("ok", RequestDescriptor::get(url)));
        let result = request(vec![spec], ResolverOptions::default()).await;
        assert!(result.is_success());
        assert_eq!(result.body("ok"), Some(&json!({"ok": true})));
    }

    #[tokio::test]
    async fn make_requests_merges_independent_graphs() {
        let url_a = Url::parse("http://lib-test.invalid/a").unwrap();
        let url_b = Url::parse("http://lib-test.invalid/b").unwrap();
        dispatch_table().register(http::Method::GET, url_a.to_string(), Arc::new(OkTransport));
        dispatch_table().register(http::Method::GET, url_b.to_string(), Arc::new(OkTransport));
        let graph_a =
            (vec![Arc::new(Spec::inline("a", RequestDescriptor::get(url_a)))], ResolverOptions::default());
        let graph_b =
            (vec![Arc::new(Spec::inline("b", RequestDescriptor::get(url_b)))], ResolverOptions::default());
        let events = make_requests(vec![graph_a, graph_b]).collect().await;
        let result = assemble(events, &json!({}));
        assert!(result.keys.contains_key("a"));
        assert!(result.keys.contains_key("b"));
    }
}

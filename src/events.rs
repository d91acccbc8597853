//! The event stream a resolution emits (§6.2) and the bounded channel it
//! travels over (§5, "Cooperative concurrency model" — event sink default
//! capacity 512).
//!
//! Grounded on `http-cache`'s `HttpCacheInterface` callback surface (`run`
//! variants reporting cache status back to the caller) generalized from "one
//! cache-status enum" to a full event stream, preferring
//! `tokio::sync::mpsc` over hand-rolled broadcast plumbing the same way the
//! rest of this crate does.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::{FailureData, FailureReason, ResolverError},
    transport::{RequestDescriptor, ResponseDescriptor},
};

/// One occurrence in a resolution's event stream (§6.2). Every variant
/// carries the `path` (the context key this event is about) except
/// [`Event::Failed`] when it closes out the whole resolution rather than
/// one key.
#[derive(Debug, Clone)]
pub enum Event {
    /// A request was sent (or is about to be, for `request_with_log`
    /// subscribers watching in real time).
    Request { path: String, req: RequestDescriptor, attempt: u32 },
    /// A response was received and classified (§6.2: `{path, req, res,
    /// success?, retry?, cache?}`).
    Response {
        path: String,
        req: RequestDescriptor,
        res: ResponseDescriptor,
        success: bool,
        /// Whether the attached retry decision asked for another attempt.
        retry: bool,
        /// Whether the attached cache decision asked to store this
        /// response.
        cache: bool,
        attempt: u32,
    },
    /// A cache lookup satisfied this key without dispatching a request
    /// (§6.2: `{path, req, res, cached_at, expires_at, backend-metadata…}`).
    CacheHit {
        path: String,
        req: RequestDescriptor,
        res: ResponseDescriptor,
        cached_at: i64,
        expires_at: Option<i64>,
        /// The backend-rendered key the hit was served from.
        key: String,
        entry_success: bool,
    },
    /// A successful exchange was written to the cache (§6.2, same payload
    /// shape as `cache-hit`).
    StoreInCache {
        path: String,
        req: RequestDescriptor,
        res: ResponseDescriptor,
        cached_at: i64,
        expires_at: Option<i64>,
        key: String,
    },
    /// Something raised instead of producing a usable result: a transport
    /// failure, or a user-supplied closure (`req_fn`, `success?`,
    /// `retry_fn`, `cache_fn`, `prepare_lookup_params`, `select`, a cache
    /// backend call) panicking — both are "a throwable surfaced and was
    /// swallowed" per §7's propagation policy (§6.2: `{throwable, source}`).
    Exception {
        path: String,
        source: &'static str,
        error: Arc<str>,
        attempt: Option<u32>,
    },
    /// A user-supplied closure produced a value this crate couldn't use —
    /// distinct from a panic (§7's "invalid data" class).
    InvalidData { path: String, source: &'static str, message: String },
    /// The key (or, with no `path`, the whole resolution) is terminally
    /// done: no further attempts will be made (§6.2: `{path, error_reason,
    /// error_data}`).
    Failed { path: Option<String>, reason: FailureReason, data: FailureData },
}

/// A bounded multi-producer, single-consumer event channel (§5). The
/// resolver holds the sender side and closes it exactly once, when
/// resolution finishes; callers drain the receiver via
/// [`EventStream::next`] or by collecting it into the [`crate::assembler`].
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: tokio::sync::mpsc::Sender<Event>,
}

/// The default event channel capacity (§5).
pub const DEFAULT_EVENT_BUFFER: usize = 512;

impl EventSink {
    /// Build a sink/stream pair with the given channel capacity.
    pub fn new(capacity: usize) -> (Self, EventStream) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity.max(1));
        (Self { tx }, EventStream { rx })
    }

    /// Emit an event, backpressuring if the channel is full. Returns
    /// [`ResolverError::SinkClosed`] if every receiver has been dropped —
    /// callers treat this as "no one is listening anymore" and stop
    /// resolving rather than treat it as a request failure.
    pub async fn emit(&self, event: Event) -> Result<(), ResolverError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ResolverError::SinkClosed)
    }
}

/// The receiving half of an [`EventSink`].
#[derive(Debug)]
pub struct EventStream {
    rx: tokio::sync::mpsc::Receiver<Event>,
}

impl EventStream {
    /// Await the next event, or `None` once the sink side has closed and
    /// drained.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Drain every remaining event into a `Vec`, for tests and the
    /// assembler's non-streaming use (`request`, as opposed to
    /// `request_with_log`).
    pub async fn collect(mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

/// Project the parts of an event relevant to result assembly, without the
/// assembler needing to match on every variant it doesn't care about.
pub fn body_of(event: &Event) -> Option<&Value> {
    match event {
        Event::Response { res, .. } => Some(&res.body),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    fn ok_response() -> ResponseDescriptor {
        ResponseDescriptor {
            status: 200,
            headers: Default::default(),
            body: Value::Null,
            transport_handle: None,
        }
    }

    fn cache_hit(path: &str) -> Event {
        Event::CacheHit {
            path: path.into(),
            req: RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            res: ok_response(),
            cached_at: 0,
            expires_at: None,
            key: "k".into(),
            entry_success: true,
        }
    }

    fn store_in_cache(path: &str) -> Event {
        Event::StoreInCache {
            path: path.into(),
            req: RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            res: ok_response(),
            cached_at: 0,
            expires_at: None,
            key: "k".into(),
        }
    }

    #[tokio::test]
    async fn emits_are_received_in_order() {
        let (sink, mut stream) = EventSink::new(4);
        sink.emit(cache_hit("a")).await.unwrap();
        sink.emit(store_in_cache("a")).await.unwrap();
        drop(sink);
        assert!(matches!(stream.next().await, Some(Event::CacheHit { .. })));
        assert!(matches!(stream.next().await, Some(Event::StoreInCache { .. })));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn emit_after_stream_dropped_reports_closed() {
        let (sink, stream) = EventSink::new(4);
        drop(stream);
        let result = sink.emit(cache_hit("a")).await;
        assert!(matches!(result, Err(ResolverError::SinkClosed)));
    }

    #[tokio::test]
    async fn collect_drains_every_event_in_order() {
        let (sink, stream) = EventSink::new(4);
        sink.emit(Event::Failed {
            path: None,
            reason: FailureReason::Unknown,
            data: FailureData::default(),
        })
        .await
        .unwrap();
        drop(sink);
        let events = stream.collect().await;
        assert_eq!(events.len(), 1);
    }
}

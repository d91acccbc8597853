//! The engine (§4.1, §4.2): the cache-lookup / dispatch / expansion passes
//! that drive a resolution from a set of specs and seed params to a
//! terminal event stream.
//!
//! Grounded on `http-cache`'s `Middleware::run` (the single entry point
//! that threads a request through lookup, dispatch, and store) generalized
//! from "one request against one cache" to "a graph of interdependent
//! requests against one cache", with the pass structure itself grounded on
//! the dependency-resolution loop this crate's spec was distilled from
//! (cache first, then dispatch what's ready, then expand the pending set
//! with whatever dispatch just unblocked).

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

use futures::{stream, StreamExt};
use serde_json::Value;

use crate::{
    cache::{CacheBackend, CacheEntry, CacheKey},
    clock::{Clock, SystemClock},
    context::{Context, ParamValue, SubSpecRef},
    error::{FailureData, FailureReason},
    events::{Event, EventSink, EventStream, DEFAULT_EVENT_BUFFER},
    exchange::Exchange,
    managers::memory::MemoryCacheBackend,
    panics::protect_reporting,
    spec::Spec,
    transport::{dispatch_table, RequestDescriptor, ResponseDescriptor, TransportError},
};

/// Configuration for a [`Resolver`] run (§5 "Configuration").
pub struct ResolverOptions {
    /// The cache backend consulted before dispatch and written to after a
    /// cacheable success.
    pub cache: Arc<dyn CacheBackend>,
    /// Seed values installed into the context before resolution starts.
    pub params: Value,
    /// Event channel capacity (§5). Defaults to 512.
    pub event_buffer: usize,
    /// Upper bound on requests dispatched concurrently within one pass.
    pub max_concurrency: usize,
    /// Clock used for timestamps and retry delays; swap in a
    /// [`crate::clock::ManualClock`] in tests.
    pub clock: Arc<dyn Clock>,
    /// Optional per-host (or global) throttle consulted immediately before
    /// each dispatch; absent by default, which dispatches as fast as
    /// `max_concurrency` allows.
    #[cfg(feature = "rate-limiting")]
    pub rate_limiter: Option<Arc<dyn crate::rate_limiting::DispatchRateLimiter>>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            cache: Arc::new(MemoryCacheBackend::new()),
            params: Value::Object(Default::default()),
            event_buffer: DEFAULT_EVENT_BUFFER,
            max_concurrency: 8,
            clock: Arc::new(SystemClock),
            #[cfg(feature = "rate-limiting")]
            rate_limiter: None,
        }
    }
}

/// Drives one resolution of `specs` to completion, publishing [`Event`]s as
/// it goes. Construct with [`Resolver::spawn`]; the returned [`EventStream`]
/// is the only way to observe what happened.
pub struct Resolver {
    specs: HashMap<String, Arc<Spec>>,
    selects: HashMap<String, Option<crate::spec::Select>>,
    ctx: Context,
    pending: VecDeque<String>,
    attempts: HashMap<String, u32>,
    failed: HashSet<String>,
    cache: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    max_concurrency: usize,
    #[cfg(feature = "rate-limiting")]
    rate_limiter: Option<Arc<dyn crate::rate_limiting::DispatchRateLimiter>>,
    sink: EventSink,
}

impl Resolver {
    /// Start resolving `specs` against `options`, returning the stream
    /// callers read events from. The resolution itself runs as a detached
    /// tokio task; the stream ends when it's done (§6.1's
    /// `request_with_log`).
    pub fn spawn(specs: Vec<Arc<Spec>>, options: ResolverOptions) -> EventStream {
        let (sink, stream) = EventSink::new(options.event_buffer);
        let mut ctx = Context::new();
        if let Value::Object(map) = &options.params {
            for (key, value) in map {
                ctx.insert_value(key.clone(), value.clone());
            }
        }
        let mut specs_table = HashMap::new();
        let mut selects = HashMap::new();
        let mut pending = VecDeque::new();
        for spec in specs {
            let name = spec.name.clone();
            if !ctx.has_value(&crate::context::path(name.clone())) {
                pending.push_back(name.clone());
            }
            selects.insert(name.clone(), None);
            specs_table.insert(name, spec);
        }
        let resolver = Resolver {
            specs: specs_table,
            selects,
            ctx,
            pending,
            attempts: HashMap::new(),
            failed: HashSet::new(),
            cache: options.cache,
            clock: options.clock,
            max_concurrency: options.max_concurrency.max(1),
            #[cfg(feature = "rate-limiting")]
            rate_limiter: options.rate_limiter,
            sink,
        };
        tokio::spawn(resolver.run());
        stream
    }

    /// Drive passes until the pending set is empty or stuck, then close the
    /// sink (§4.1).
    async fn run(mut self) {
        loop {
            if self.pending.is_empty() {
                break;
            }
            let before = self.pending.len();
            log::trace!("pass starting: {before} pending key(s): {:?}", self.pending);

            self.cache_lookup_pass().await;
            log::debug!("cache-lookup pass done: {} pending key(s)", self.pending.len());
            self.dispatch_pass().await;
            log::debug!("dispatch pass done: {} pending key(s)", self.pending.len());
            self.expansion_pass();
            log::debug!("expansion pass done: {} pending key(s)", self.pending.len());

            if self.pending.len() == before {
                // No progress this round: every remaining key is blocked on
                // a param that will never resolve (its provider failed or
                // is itself stuck). Fail the rest and stop.
                self.drain_as_failed(FailureReason::MissingParams).await;
                break;
            }
        }
        // sink drops here, closing the stream for EventStream::next/collect.
    }

    /// Install any context entry a spec's `req` references as a sub-spec
    /// (§4.3), lifting it into the specs table the first time it's seen.
    fn lift_sub_specs(&mut self, ctx_snapshot: &Context) {
        for (key, value) in ctx_snapshot.iter() {
            if let ParamValue::SubSpec(SubSpecRef { spec, select }) = value {
                if !self.specs.contains_key(key) {
                    self.specs.insert(key.clone(), Arc::clone(spec));
                    self.selects.insert(key.clone(), select.clone());
                    self.pending.push_back(key.clone());
                }
            }
        }
    }

    fn expansion_pass(&mut self) {
        let snapshot = self.ctx.clone();
        self.lift_sub_specs(&snapshot);
    }

    async fn cache_lookup_pass(&mut self) {
        let now = self.clock.now_millis();
        let mut still_pending = VecDeque::new();
        let keys: Vec<String> = self.pending.drain(..).collect();
        for key in keys {
            if self.ctx.has_value(&crate::context::path(key.clone())) {
                log::trace!("cache-lookup pass: `{key}` already resolved, skipping");
                continue;
            }
            let Some(spec) = self.specs.get(&key).cloned() else {
                still_pending.push_back(key);
                continue;
            };
            if spec.refresh.load(std::sync::atomic::Ordering::SeqCst) {
                log::trace!("cache-lookup pass: `{key}` flagged for refresh, bypassing cache");
                still_pending.push_back(key);
                continue;
            }
            let lookup_paths = spec.effective_lookup_params();
            if !lookup_paths.iter().all(|p| self.ctx.has_value(p)) {
                log::trace!("cache-lookup pass: `{key}` still waiting on lookup params");
                still_pending.push_back(key);
                continue;
            }
            let cache_key = self.cache_key_for(&key, &spec).await;
            match self.cache.lookup(&cache_key, now).await {
                Ok(Some(entry)) => {
                    log::debug!("cache lookup hit for `{key}`");
                    let success = entry.success;
                    self.install_value(&key, &entry.res).await;
                    let _ = self
                        .sink
                        .emit(Event::CacheHit {
                            path: key.clone(),
                            req: entry.req.clone(),
                            res: entry.res.clone(),
                            cached_at: entry.cached_at,
                            expires_at: entry.expires_at,
                            key: cache_key.render_remote_key(),
                            entry_success: success,
                        })
                        .await;
                }
                Ok(None) => {
                    log::debug!("cache lookup miss for `{key}`");
                    still_pending.push_back(key)
                }
                Err(error) => {
                    log::debug!("cache lookup errored for `{key}`: {error}");
                    let _ = self
                        .sink
                        .emit(Event::Exception {
                            path: key.clone(),
                            source: "cache/lookup",
                            error: Arc::from(error.to_string()),
                            attempt: None,
                        })
                        .await;
                    still_pending.push_back(key);
                }
            }
        }
        self.pending = still_pending;
    }

    async fn cache_key_for(&self, key: &str, spec: &Spec) -> CacheKey {
        if let Some(segments) = &spec.custom_key {
            return CacheKey::custom(segments.clone());
        }
        let lookup_paths = spec.effective_lookup_params();
        let projection = self.ctx.project(lookup_paths);
        let projection = match &spec.prepare_lookup_params {
            Some(f) => match protect_reporting(|| f(projection.clone()), "prepare_lookup_params") {
                Ok(projected) => projected,
                Err(message) => {
                    let _ = self
                        .sink
                        .emit(Event::Exception {
                            path: key.to_string(),
                            source: "prepare_lookup_params",
                            error: Arc::from(message),
                            attempt: None,
                        })
                        .await;
                    projection
                }
            },
            None => projection,
        };
        CacheKey::new(spec.cache_id(), &projection)
    }

    async fn dispatch_pass(&mut self) {
        let mut ready = Vec::new();
        let mut blocked = VecDeque::new();
        let keys: Vec<String> = self.pending.drain(..).collect();
        for key in keys {
            let Some(spec) = self.specs.get(&key).cloned() else {
                blocked.push_back(key);
                continue;
            };
            if spec.params.iter().all(|p| self.ctx.has_value(p)) {
                log::trace!("dispatch pass: `{key}` ready, all params resolved");
                ready.push((key, spec));
            } else {
                log::trace!("dispatch pass: `{key}` blocked on unresolved params");
                blocked.push_back(key);
            }
        }
        self.pending = blocked;
        if ready.is_empty() {
            return;
        }
        log::debug!("dispatch pass: dispatching {} key(s)", ready.len());

        let ctx_snapshot = self.ctx.clone();
        let clock = Arc::clone(&self.clock);
        let attempts = ready
            .iter()
            .map(|(key, _)| (key.clone(), self.attempts.get(key).copied().unwrap_or(0) + 1))
            .collect::<HashMap<_, _>>();

        let sink = self.sink.clone();
        #[cfg(feature = "rate-limiting")]
        let rate_limiter = self.rate_limiter.clone();
        let results: Vec<(String, Arc<Spec>, Exchange)> = stream::iter(ready)
            .map(|(key, spec)| {
                let ctx_snapshot = ctx_snapshot.clone();
                let clock = Arc::clone(&clock);
                let sink = sink.clone();
                let attempt = attempts[&key];
                #[cfg(feature = "rate-limiting")]
                let rate_limiter = rate_limiter.clone();
                async move {
                    #[cfg(feature = "rate-limiting")]
                    let exchange = run_exchange(
                        &key,
                        &spec,
                        &ctx_snapshot,
                        attempt,
                        clock.as_ref(),
                        &sink,
                        rate_limiter.as_deref(),
                    )
                    .await;
                    #[cfg(not(feature = "rate-limiting"))]
                    let exchange = run_exchange(
                        &key,
                        &spec,
                        &ctx_snapshot,
                        attempt,
                        clock.as_ref(),
                        &sink,
                    )
                    .await;
                    (key, spec, exchange)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for (key, spec, exchange) in results {
            self.attempts.insert(key.clone(), exchange.attempt);
            self.handle_exchange(key, spec, exchange).await;
        }
    }

    async fn handle_exchange(&mut self, key: String, spec: Arc<Spec>, exchange: Exchange) {
        if exchange.res.is_none() && exchange.exception.is_none() {
            // `req`/`req_fn` were both absent, or `req_fn` panicked (§4.2
            // step 1) — there's no request to have sent or failed.
            self.failed.insert(key.clone());
            let _ = self
                .sink
                .emit(Event::Failed {
                    path: Some(key),
                    reason: FailureReason::MissingReqOrReqFn,
                    data: FailureData::default(),
                })
                .await;
            return;
        }
        let retry_flag = exchange.is_retry_eligible();
        let cache_flag = exchange
            .cache_decision
            .as_ref()
            .map(|d| d.cache)
            .unwrap_or(false);
        if let Some(error) = &exchange.exception {
            let _ = self
                .sink
                .emit(Event::Exception {
                    path: key.clone(),
                    source: "transport",
                    error: Arc::from(error.to_string()),
                    attempt: Some(exchange.attempt),
                })
                .await;
        } else if let Some(res) = &exchange.res {
            let _ = self
                .sink
                .emit(Event::Response {
                    path: key.clone(),
                    req: exchange.req.clone(),
                    res: res.clone(),
                    success: exchange.success,
                    retry: retry_flag,
                    cache: cache_flag,
                    attempt: exchange.attempt,
                })
                .await;
        }

        if exchange.success {
            if let Some(res) = &exchange.res {
                self.install_value(&key, res).await;
            }
            if let (Some(decision), Some(res)) = (&exchange.cache_decision, &exchange.res) {
                if decision.cache {
                    let cache_key = self.cache_key_for(&key, &spec).await;
                    let expires_at = decision
                        .expires_at
                        .or_else(|| decision.ttl.map(|ttl| exchange.finished_at + ttl));
                    let entry = CacheEntry::new(
                        exchange.req.clone(),
                        res.clone(),
                        expires_at,
                        exchange.finished_at,
                        true,
                    );
                    match self.cache.put(&cache_key, entry.clone()).await {
                        Ok(metadata) => {
                            log::debug!("cache put for `{key}`: stored under `{}`", metadata.key);
                            let _ = self
                                .sink
                                .emit(Event::StoreInCache {
                                    path: key.clone(),
                                    req: entry.req.clone(),
                                    res: entry.res.clone(),
                                    cached_at: entry.cached_at,
                                    expires_at: entry.expires_at,
                                    key: metadata.key,
                                })
                                .await;
                        }
                        Err(error) => {
                            log::debug!("cache put errored for `{key}`: {error}");
                            let _ = self
                                .sink
                                .emit(Event::Exception {
                                    path: key.clone(),
                                    source: "cache/put",
                                    error: Arc::from(error.to_string()),
                                    attempt: Some(exchange.attempt),
                                })
                                .await;
                        }
                    }
                }
            }
            spec.refresh.store(false, std::sync::atomic::Ordering::SeqCst);
            return;
        }

        if retry_flag {
            let decision = exchange.retry_decision.clone().unwrap();
            for refresh_key in &decision.refresh {
                self.ctx.remove(refresh_key);
                if let Some(refreshed_spec) = self.specs.get(refresh_key) {
                    refreshed_spec
                        .refresh
                        .store(true, std::sync::atomic::Ordering::SeqCst);
                }
                if !self.pending.contains(refresh_key) {
                    self.pending.push_back(refresh_key.clone());
                }
            }
            if let Some(delay) = decision.delay {
                self.clock.sleep(delay).await;
            }
            self.pending.push_back(key);
            return;
        }

        let (reason, data) = classify_failure(&exchange);
        self.failed.insert(key.clone());
        let _ = self.sink.emit(Event::Failed { path: Some(key), reason, data }).await;
    }

    async fn install_value(&mut self, key: &str, res: &ResponseDescriptor) {
        let select = self.selects.get(key).cloned().flatten();
        let value = match select {
            Some(f) => match protect_reporting(|| f(res), "select") {
                Ok(value) => value,
                Err(message) => {
                    let _ = self
                        .sink
                        .emit(Event::Exception {
                            path: key.to_string(),
                            source: "select",
                            error: Arc::from(message),
                            attempt: None,
                        })
                        .await;
                    res.body.clone()
                }
            },
            None => res.body.clone(),
        };
        self.ctx.insert_value(key.to_string(), value);
    }

    /// Every `name` among `spec.params` whose root isn't resolved in the
    /// context right now — the `missing-params` `error_data.missing` list
    /// (§7).
    fn missing_params_for(&self, spec: &Spec) -> Vec<String> {
        spec.params
            .iter()
            .filter(|p| !self.ctx.has_value(p))
            .filter_map(|p| p.first().cloned())
            .collect()
    }

    async fn drain_as_failed(&mut self, reason: FailureReason) {
        let keys: Vec<String> = self.pending.drain(..).collect();
        log::error!("draining {} unresolvable key(s) as `{reason}`: {:?}", keys.len(), keys);
        let mut all_missing: Vec<String> = Vec::new();
        for key in &keys {
            let missing = match self.specs.get(key) {
                Some(spec) => self.missing_params_for(spec),
                None => vec![key.clone()],
            };
            all_missing.extend(missing.iter().cloned());
            let _ = self
                .sink
                .emit(Event::Failed {
                    path: Some(key.clone()),
                    reason: reason.clone(),
                    data: FailureData { missing, ..Default::default() },
                })
                .await;
        }
        all_missing.sort();
        all_missing.dedup();
        let _ = self
            .sink
            .emit(Event::Failed {
                path: None,
                reason,
                data: FailureData { missing: all_missing, ..Default::default() },
            })
            .await;
    }
}

/// Run the single-request pipeline for one attempt at `key` (§4.2 steps 1-7).
async fn run_exchange(
    key: &str,
    spec: &Arc<Spec>,
    ctx: &Context,
    attempt: u32,
    clock: &dyn Clock,
    sink: &EventSink,
    #[cfg(feature = "rate-limiting")] rate_limiter: Option<&dyn crate::rate_limiting::DispatchRateLimiter>,
) -> Exchange {
    let req = match &spec.req_fn {
        Some(f) => match protect_reporting(|| f(ctx), "req_fn") {
            Ok(req) => Some(req),
            Err(message) => {
                let _ = sink
                    .emit(Event::Exception {
                        path: key.to_string(),
                        source: "req_fn",
                        error: Arc::from(message),
                        attempt: Some(attempt),
                    })
                    .await;
                None
            }
        },
        None => spec.req.clone(),
    };
    let Some(req) = req else {
        let placeholder = RequestDescriptor::default();
        return Exchange {
            path: key.to_string(),
            spec: Arc::clone(spec),
            req: placeholder,
            res: None,
            exception: None,
            success: false,
            retry_decision: None,
            cache_decision: None,
            attempt,
            started_at: clock.now_millis(),
            finished_at: clock.now_millis(),
        };
    };

    #[cfg(feature = "rate-limiting")]
    if let Some(limiter) = rate_limiter {
        limiter.until_key_ready(req.url.host_str().unwrap_or("")).await;
    }

    let started_at = clock.now_millis();
    let _ = sink
        .emit(Event::Request { path: key.to_string(), req: req.clone(), attempt })
        .await;
    log::debug!("exchange attempt {attempt} for `{key}`: {} {}", req.method, req.url);
    let outcome = dispatch_table().resolve(&req).send(&req).await;
    let finished_at = clock.now_millis();

    let mut exchange = Exchange {
        path: key.to_string(),
        spec: Arc::clone(spec),
        req: req.clone(),
        res: None,
        exception: None,
        success: false,
        retry_decision: None,
        cache_decision: None,
        attempt,
        started_at,
        finished_at,
    };

    match outcome {
        Ok(res) => {
            exchange.success = match &spec.success_fn {
                Some(f) => match protect_reporting(|| f(&req, &res), "success?") {
                    Ok(value) => value,
                    Err(message) => {
                        let _ = sink
                            .emit(Event::Exception {
                                path: key.to_string(),
                                source: "success?",
                                error: Arc::from(message),
                                attempt: Some(attempt),
                            })
                            .await;
                        false
                    }
                },
                None => res.is_2xx(),
            };
            exchange.res = Some(res);
            if exchange.success {
                exchange.cache_decision = match &spec.cache_fn {
                    Some(f) => match protect_reporting(|| f(&exchange), "cache_fn") {
                        Ok(decision) => validate_or_invalidate(
                            decision,
                            validate_cache_decision,
                            key,
                            "cache_fn",
                            sink,
                        )
                        .await,
                        Err(message) => {
                            let _ = sink
                                .emit(Event::Exception {
                                    path: key.to_string(),
                                    source: "cache_fn",
                                    error: Arc::from(message),
                                    attempt: Some(attempt),
                                })
                                .await;
                            None
                        }
                    },
                    None => None,
                };
            } else {
                exchange.retry_decision = match &spec.retry_fn {
                    Some(f) => match protect_reporting(|| f(&exchange), "retry_fn") {
                        Ok(decision) => validate_or_invalidate(
                            decision,
                            validate_retry_decision,
                            key,
                            "retry_fn",
                            sink,
                        )
                        .await,
                        Err(message) => {
                            let _ = sink
                                .emit(Event::Exception {
                                    path: key.to_string(),
                                    source: "retry_fn",
                                    error: Arc::from(message),
                                    attempt: Some(attempt),
                                })
                                .await;
                            None
                        }
                    },
                    None => None,
                };
            }
        }
        Err(error) => {
            let error = Arc::new(error);
            exchange.exception = Some(Arc::clone(&error));
            exchange.retry_decision = match &spec.retry_fn {
                Some(f) => match protect_reporting(|| f(&exchange), "retry_fn") {
                    Ok(decision) => validate_or_invalidate(
                        decision,
                        validate_retry_decision,
                        key,
                        "retry_fn",
                        sink,
                    )
                    .await,
                    Err(message) => {
                        let _ = sink
                            .emit(Event::Exception {
                                path: key.to_string(),
                                source: "retry_fn",
                                error: Arc::from(message),
                                attempt: Some(attempt),
                            })
                            .await;
                        None
                    }
                },
                None => None,
            };
        }
    }

    log::debug!(
        "exchange attempt {attempt} for `{key}` outcome: {}",
        if exchange.exception.is_some() {
            "exception".to_string()
        } else if exchange.success {
            "success".to_string()
        } else {
            format!(
                "non-success (status {})",
                exchange.res.as_ref().map(|res| res.status).unwrap_or(0)
            )
        }
    );
    exchange
}

/// Check `decision` against `validate`, emitting `invalid-data` (§4.2 step
/// 5) and dropping it in place of the usual `exception` path when it
/// fails. Rust's type system already guarantees `cache_fn`/`retry_fn`
/// return the right *shape* (a `CacheDecision`/`RetryDecision`, not an
/// arbitrary map); what's left to validate is the domain-level sanity a
/// struct's field types alone can't express.
async fn validate_or_invalidate<T>(
    decision: T,
    validate: impl Fn(&T) -> std::result::Result<(), String>,
    key: &str,
    source: &'static str,
    sink: &EventSink,
) -> Option<T> {
    match validate(&decision) {
        Ok(()) => Some(decision),
        Err(message) => {
            let _ = sink
                .emit(Event::InvalidData { path: key.to_string(), source, message })
                .await;
            None
        }
    }
}

/// A `cache_fn` decision is invalid if it names a negative `ttl` or
/// `expires_at` — durations and timestamps that can't be negative even
/// though the field types (`Option<i64>`) don't forbid it.
fn validate_cache_decision(decision: &crate::exchange::CacheDecision) -> std::result::Result<(), String> {
    if let Some(ttl) = decision.ttl {
        if ttl < 0 {
            return Err(format!("cache_fn returned a negative ttl: {ttl}"));
        }
    }
    if let Some(expires_at) = decision.expires_at {
        if expires_at < 0 {
            return Err(format!("cache_fn returned a negative expires_at: {expires_at}"));
        }
    }
    Ok(())
}

/// A `retry_fn` decision is invalid if its `refresh` list names an empty
/// key — a name that could never refer to a real spec or context entry.
fn validate_retry_decision(decision: &crate::exchange::RetryDecision) -> std::result::Result<(), String> {
    if decision.refresh.iter().any(|key| key.is_empty()) {
        return Err("retry_fn returned an empty string in `refresh`".to_string());
    }
    Ok(())
}

fn classify_failure(exchange: &Exchange) -> (FailureReason, FailureData) {
    let mut data = FailureData {
        req: Some(exchange.req.clone()),
        res: exchange.res.clone(),
        attempts: Some(exchange.attempt),
        max_retries: exchange.retry_decision.as_ref().and_then(|d| d.max_retries),
        ..Default::default()
    };
    if let Some(error) = &exchange.exception {
        return (classify_transport_error(error), data);
    }
    // A `retry_fn` that declined to retry at all (e.g. `build_retry`'s
    // default `retryable?` rejecting a non-idempotent method) still
    // attaches a decision — `{retry: false, ..}` — so the attempt was
    // never actually retried and is `request-failed`, not
    // `retries-exhausted` (§7).
    let retry_requested = exchange.retry_decision.as_ref().is_some_and(|d| d.retry);
    let reason = if retry_requested {
        FailureReason::RetriesExhausted
    } else {
        data.max_retries = None;
        FailureReason::RequestFailed
    };
    (reason, data)
}

fn classify_transport_error(error: &TransportError) -> FailureReason {
    use crate::transport::TransportErrorKind::*;
    match error.kind {
        UnknownHost => FailureReason::UnknownHost,
        ConnectionRefused => FailureReason::ConnectionRefused,
        ConnectionTimeout => FailureReason::ConnectionTimeout,
        SocketTimeout => FailureReason::SocketTimeout,
        Other => FailureReason::Unknown,
    }
}

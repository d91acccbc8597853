//! The declarative description of one logical request (§3, "Spec") and the
//! user-supplied closures that parameterize it.
//!
//! Closure-valued fields follow `http-cache`'s own idiom of `Arc<dyn Fn(...) +
//! Send + Sync>` type aliases (`CacheKey`, `CacheModeFn`,
//! `ResponseCacheModeFn`), generalized from "override one enum" to "return a
//! structured decision" where §4 calls for one.

use std::{
    fmt,
    sync::{atomic::AtomicBool, Arc},
};

use serde_json::Value;

use crate::{
    context::{Context, ParamPath},
    exchange::{CacheDecision, Exchange, RetryDecision},
    transport::{RequestDescriptor, ResponseDescriptor},
};

/// A closure producing a [`RequestDescriptor`] from the resolved params
/// named in [`Spec::params`]. Must be total: it is invoked only after its
/// params are confirmed present (§4.1 invariant 1), but a panic inside it is
/// still caught and swallowed per §7's propagation policy.
pub type ReqFn = Arc<dyn Fn(&Context) -> RequestDescriptor + Send + Sync>;

/// Predicate over a completed exchange deciding `success?` (§3). Defaults to
/// "transport-reported 2xx".
pub type SuccessFn =
    Arc<dyn Fn(&RequestDescriptor, &ResponseDescriptor) -> bool + Send + Sync>;

/// Produces a [`RetryDecision`] from a failed exchange (§3, §4.2 step 5).
pub type RetryFn = Arc<dyn Fn(&Exchange) -> RetryDecision + Send + Sync>;

/// Produces a [`CacheDecision`] from a successful exchange (§3, §4.2 step 5).
pub type CacheFn = Arc<dyn Fn(&Exchange) -> CacheDecision + Send + Sync>;

/// Transforms the lookup-param projection before it is fingerprinted into a
/// cache key (§3).
pub type PrepareLookupParams = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Applied to a sub-request's response to produce the value installed into
/// the parent's context (§4.3). Defaults to "the whole response".
pub type Select = Arc<dyn Fn(&ResponseDescriptor) -> Value + Send + Sync>;

/// Named configuration for one logical request (§3).
pub struct Spec {
    /// The key this spec resolves under in the context and specs table.
    pub name: String,
    /// Inline request descriptor, used when `req_fn` is absent.
    pub req: Option<RequestDescriptor>,
    /// Function producing a request descriptor from resolved params; used
    /// whenever any part of the request is dynamic.
    pub req_fn: Option<ReqFn>,
    /// Params required (present in context, or themselves specs) before
    /// `req_fn` may run. A path with more than one segment means "look up
    /// that nested position".
    pub params: Vec<ParamPath>,
    /// Subset of `params` used for cache keying. Defaults to all of
    /// `params` when empty and `req_fn` is set (see `effective_lookup_params`).
    pub lookup_params: Vec<ParamPath>,
    /// Pure transform applied to the lookup-param projection before it is
    /// fingerprinted.
    pub prepare_lookup_params: Option<PrepareLookupParams>,
    /// Stable symbolic name used as the cache id (first element of the
    /// cache key). Defaults to `name` when absent.
    pub lookup_id: Option<String>,
    /// An explicit, literal filesystem cache key (§6.4), bypassing
    /// `lookup_id`/lookup-param fingerprinting entirely when set.
    pub custom_key: Option<Vec<String>>,
    /// `success?` predicate; defaults to "status is 2xx".
    pub success_fn: Option<SuccessFn>,
    /// Retry policy, consulted on a failed exchange.
    pub retry_fn: Option<RetryFn>,
    /// Cache policy, consulted on a successful exchange.
    pub cache_fn: Option<CacheFn>,
    /// Set by the resolver when a retry decision names this key for
    /// refresh (§4.1 "Refresh semantics"): suppresses the next
    /// cache-lookup pass for this key, then clears once it's resolved
    /// again. Interior-mutable because specs are shared via `Arc` once
    /// placed in the specs table.
    pub(crate) refresh: AtomicBool,
}

impl Clone for Spec {
    /// Specs are immutable after construction (§3 "Lifecycle"); the
    /// `refresh` flag is resolver-internal runtime state, not part of a
    /// spec's declared configuration, so a clone starts unmarked rather
    /// than copying whatever the source spec's flag happened to be at
    /// clone time.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            req: self.req.clone(),
            req_fn: self.req_fn.clone(),
            params: self.params.clone(),
            lookup_params: self.lookup_params.clone(),
            prepare_lookup_params: self.prepare_lookup_params.clone(),
            lookup_id: self.lookup_id.clone(),
            custom_key: self.custom_key.clone(),
            success_fn: self.success_fn.clone(),
            retry_fn: self.retry_fn.clone(),
            cache_fn: self.cache_fn.clone(),
            refresh: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spec")
            .field("name", &self.name)
            .field("req", &self.req)
            .field("req_fn", &self.req_fn.as_ref().map(|_| "Fn(&Context) -> RequestDescriptor"))
            .field("params", &self.params)
            .field("lookup_params", &self.lookup_params)
            .field("lookup_id", &self.lookup_id)
            .field("custom_key", &self.custom_key)
            .finish_non_exhaustive()
    }
}

impl Spec {
    /// Construct a spec around an inline, static request descriptor.
    pub fn inline(name: impl Into<String>, req: RequestDescriptor) -> Self {
        Self {
            name: name.into(),
            req: Some(req),
            req_fn: None,
            params: Vec::new(),
            lookup_params: Vec::new(),
            prepare_lookup_params: None,
            lookup_id: None,
            custom_key: None,
            success_fn: None,
            retry_fn: None,
            cache_fn: None,
            refresh: AtomicBool::new(false),
        }
    }

    /// Construct a spec around a dynamic `req_fn`, requiring `params` to be
    /// resolved before it can run.
    pub fn dynamic(
        name: impl Into<String>,
        params: Vec<ParamPath>,
        req_fn: ReqFn,
    ) -> Self {
        Self {
            name: name.into(),
            req: None,
            req_fn: Some(req_fn),
            params,
            lookup_params: Vec::new(),
            prepare_lookup_params: None,
            lookup_id: None,
            custom_key: None,
            success_fn: None,
            retry_fn: None,
            cache_fn: None,
            refresh: AtomicBool::new(false),
        }
    }

    /// The stable id used as the first element of the cache key (§3).
    /// Falls back to `name` since this crate's closures, unlike the
    /// originating language's, carry no portable symbolic identity to
    /// derive one from (Design Notes §9's "symbolic identity of a
    /// function" escape hatch) — callers relying on `req_fn` identity for
    /// keying should set `lookup_id` explicitly.
    pub fn cache_id(&self) -> &str {
        self.lookup_id.as_deref().unwrap_or(&self.name)
    }

    /// The params actually used for cache keying (§3): `lookup_params` if
    /// non-empty, else `params`.
    pub fn effective_lookup_params(&self) -> &[ParamPath] {
        if self.lookup_params.is_empty() {
            &self.params
        } else {
            &self.lookup_params
        }
    }

    /// Builder: attach `lookup_params`.
    pub fn with_lookup_params(mut self, paths: Vec<ParamPath>) -> Self {
        self.lookup_params = paths;
        self
    }

    /// Builder: attach a stable `lookup_id`.
    pub fn with_lookup_id(mut self, id: impl Into<String>) -> Self {
        self.lookup_id = Some(id.into());
        self
    }

    /// Builder: attach an explicit filesystem cache key (§6.4), rendered
    /// literally by [`crate::cache::CacheKey::render_custom`] instead of
    /// deriving one from `lookup_id`/lookup params.
    pub fn with_custom_key(mut self, segments: Vec<String>) -> Self {
        self.custom_key = Some(segments);
        self
    }

    /// Builder: attach a `success?` predicate.
    pub fn with_success_fn(mut self, f: SuccessFn) -> Self {
        self.success_fn = Some(f);
        self
    }

    /// Builder: attach a `retry_fn`.
    pub fn with_retry_fn(mut self, f: RetryFn) -> Self {
        self.retry_fn = Some(f);
        self
    }

    /// Builder: attach a `cache_fn`.
    pub fn with_cache_fn(mut self, f: CacheFn) -> Self {
        self.cache_fn = Some(f);
        self
    }

    /// Builder: attach `prepare_lookup_params`.
    pub fn with_prepare_lookup_params(
        mut self,
        f: PrepareLookupParams,
    ) -> Self {
        self.prepare_lookup_params = Some(f);
        self
    }

    /// Default `success?`: transport-reported 2xx (§3).
    pub(crate) fn is_success(
        &self,
        req: &RequestDescriptor,
        res: &ResponseDescriptor,
    ) -> bool {
        match &self.success_fn {
            Some(f) => crate::panics::protect(|| f(req, res), "success?")
                .unwrap_or(false),
            None => res.is_2xx(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    #[test]
    fn cache_id_falls_back_to_name() {
        let spec = Spec::inline(
            "token",
            RequestDescriptor::get(Url::parse("http://x/").unwrap()),
        );
        assert_eq!(spec.cache_id(), "token");
        let named = spec.with_lookup_id("auth/token");
        assert_eq!(named.cache_id(), "auth/token");
    }

    #[test]
    fn with_custom_key_survives_clone() {
        let spec = Spec::inline("token", RequestDescriptor::get(Url::parse("http://x/").unwrap()))
            .with_custom_key(vec!["auth".to_string(), "token".to_string()]);
        assert_eq!(
            spec.custom_key,
            Some(vec!["auth".to_string(), "token".to_string()])
        );
        assert_eq!(spec.clone().custom_key, spec.custom_key);
    }

    #[test]
    fn effective_lookup_params_defaults_to_params() {
        let spec = Spec::dynamic(
            "widget",
            vec![vec!["id".to_string()]],
            Arc::new(|_ctx| RequestDescriptor::default()),
        );
        assert_eq!(spec.effective_lookup_params(), &[vec!["id".to_string()]]);

        let narrowed = spec
            .with_lookup_params(vec![vec!["id".to_string()]])
            .with_lookup_id("widget-v2");
        assert_eq!(narrowed.cache_id(), "widget-v2");
    }

    #[test]
    fn default_success_is_2xx() {
        let spec = Spec::inline(
            "x",
            RequestDescriptor::get(Url::parse("http://x/").unwrap()),
        );
        let req = RequestDescriptor::get(Url::parse("http://x/").unwrap());
        let ok = ResponseDescriptor {
            status: 204,
            headers: Default::default(),
            body: Value::Null,
            transport_handle: None,
        };
        let bad = ResponseDescriptor { status: 500, ..ok.clone() };
        assert!(spec.is_success(&req, &ok));
        assert!(!spec.is_success(&req, &bad));
    }
}

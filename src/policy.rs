//! Builders that turn a handful of declarative options into the `retry_fn`
//! / `cache_fn` closures a [`crate::spec::Spec`] actually carries (§4.6).
//!
//! Grounded on `http-cache`'s `CacheOptions`/`HttpCacheOptions` pattern: a
//! plain options struct with sensible defaults, consumed by a builder
//! function rather than requiring every caller to hand-write a closure.

use std::sync::Arc;

use http::Method;

use crate::{
    exchange::{CacheDecision, Exchange},
    spec::{CacheFn, RetryFn},
};

/// Options accepted by [`build_retry`] (§4.6).
#[derive(Clone, Default)]
pub struct RetryOptions {
    /// Fixed per-attempt delays in milliseconds, indexed by `attempt - 1`.
    /// The last entry repeats for attempts beyond the list's length.
    pub delays: Vec<u64>,
    /// Ceiling on total attempts for the key.
    pub max_retries: Option<u32>,
    /// Overrides "should this exchange be retried at all" — defaults to
    /// "the request method is idempotent" (Design Notes: the Open Question
    /// on default cacheable/retryable scope resolves to idempotent-only).
    pub retryable: Option<Arc<dyn Fn(&Exchange) -> bool + Send + Sync>>,
    /// Keys to mark for refresh before the next attempt, independent of the
    /// attempt number.
    pub refresh: Vec<String>,
    /// Computes the refresh list from the exchange instead of using a fixed
    /// list; takes precedence over `refresh` when set.
    pub refresh_fn: Option<Arc<dyn Fn(&Exchange) -> Vec<String> + Send + Sync>>,
}

/// Build a `retry_fn` from [`RetryOptions`] (§4.6). The returned closure
/// never panics on its own account; any panic from a caller-supplied
/// `retryable`/`refresh_fn` is still caught by [`crate::panics::protect`]
/// one layer up, in the resolver.
pub fn build_retry(options: RetryOptions) -> RetryFn {
    Arc::new(move |exchange: &Exchange| {
        let retryable = match &options.retryable {
            Some(f) => f(exchange),
            None => is_idempotent(&exchange.req.method),
        };
        if !retryable {
            return CacheDecisionDefault::retry_decision_none();
        }
        let delay = options.delays.get(exchange.attempt as usize - 1).copied().or_else(|| {
            options.delays.last().copied()
        });
        let refresh = match &options.refresh_fn {
            Some(f) => f(exchange),
            None => options.refresh.clone(),
        };
        crate::exchange::RetryDecision {
            retry: true,
            delay,
            max_retries: options.max_retries,
            refresh,
        }
    })
}

/// Options accepted by [`build_cache`] (§4.6).
#[derive(Clone, Default)]
pub struct CacheOptions {
    /// Fixed time-to-live in milliseconds, applied from `finished_at`.
    pub ttl: Option<i64>,
    /// Computes the TTL from the exchange instead of using a fixed value;
    /// takes precedence over `ttl` when set.
    pub ttl_fn: Option<Arc<dyn Fn(&Exchange) -> Option<i64> + Send + Sync>>,
    /// Overrides "should this exchange be cached at all" — defaults to
    /// "the request method is idempotent" (Design Notes: same Open
    /// Question resolution as [`RetryOptions::retryable`]), i.e. GET/POST
    /// caching defaults to off for POST.
    pub cacheable: Option<Arc<dyn Fn(&Exchange) -> bool + Send + Sync>>,
}

/// Build a `cache_fn` from [`CacheOptions`] (§4.6).
pub fn build_cache(options: CacheOptions) -> CacheFn {
    Arc::new(move |exchange: &Exchange| {
        let cacheable = match &options.cacheable {
            Some(f) => f(exchange),
            None => is_idempotent(&exchange.req.method),
        };
        if !cacheable {
            return CacheDecision::default();
        }
        let ttl = match &options.ttl_fn {
            Some(f) => f(exchange),
            None => options.ttl,
        };
        CacheDecision {
            cache: true,
            expires_at: ttl.map(|ttl| exchange.finished_at + ttl),
            ttl,
        }
    })
}

/// GET and HEAD are the only methods this crate treats as idempotent by
/// default (Design Notes §9's Open Question resolution): PUT/DELETE are
/// idempotent per HTTP semantics but are far more often used for
/// side-effecting writes in practice, so a conservative default only
/// auto-enables caching/retrying for the unambiguous case.
fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

struct CacheDecisionDefault;
impl CacheDecisionDefault {
    fn retry_decision_none() -> crate::exchange::RetryDecision {
        crate::exchange::RetryDecision::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{spec::Spec, transport::RequestDescriptor};
    use url::Url;

    fn exchange(method: Method, attempt: u32) -> Exchange {
        let mut req = RequestDescriptor::get(Url::parse("http://x/").unwrap());
        req.method = method;
        Exchange {
            path: "a".into(),
            spec: std::sync::Arc::new(Spec::inline("a", req.clone())),
            req,
            res: None,
            exception: None,
            success: false,
            retry_decision: None,
            cache_decision: None,
            attempt,
            started_at: 0,
            finished_at: 1_000,
        }
    }

    #[test]
    fn default_retry_only_applies_to_idempotent_methods() {
        let retry_fn = build_retry(RetryOptions {
            delays: vec![100, 200],
            max_retries: Some(3),
            ..Default::default()
        });
        let get_decision = retry_fn(&exchange(Method::GET, 1));
        assert!(get_decision.retry);
        assert_eq!(get_decision.delay, Some(100));

        let post_decision = retry_fn(&exchange(Method::POST, 1));
        assert!(!post_decision.retry);
    }

    #[test]
    fn delay_list_repeats_its_last_entry() {
        let retry_fn = build_retry(RetryOptions { delays: vec![50], ..Default::default() });
        let decision = retry_fn(&exchange(Method::GET, 5));
        assert_eq!(decision.delay, Some(50));
    }

    #[test]
    fn default_cache_only_applies_to_idempotent_methods() {
        let cache_fn = build_cache(CacheOptions { ttl: Some(60_000), ..Default::default() });
        let get_decision = cache_fn(&exchange(Method::GET, 1));
        assert!(get_decision.cache);
        assert_eq!(get_decision.expires_at, Some(61_000));

        let post_decision = cache_fn(&exchange(Method::POST, 1));
        assert!(!post_decision.cache);
    }

    #[test]
    fn explicit_cacheable_override_allows_post() {
        let cache_fn = build_cache(CacheOptions {
            ttl: Some(1_000),
            cacheable: Some(Arc::new(|_| true)),
            ..Default::default()
        });
        let decision = cache_fn(&exchange(Method::POST, 1));
        assert!(decision.cache);
    }
}

//! One attempt at one logical key (§3, "Exchange") and the retry/cache
//! decisions attached to it (§4.2).
//!
//! Grounded on `http-cache-semantics`'s `BeforeRequest`/`AfterResponse`
//! decision shape (a plain struct carrying optional fields back from a
//! policy evaluation), reimplemented against this crate's own retry/cache
//! model since RFC 7234 revalidation semantics don't generalize to
//! arbitrary dependency-bearing, non-GET requests.

use std::sync::Arc;

use crate::{
    spec::Spec,
    transport::{RequestDescriptor, ResponseDescriptor, TransportError},
};

/// The decision returned by a spec's `retry_fn` (§3, §4.6).
#[derive(Debug, Clone, Default)]
pub struct RetryDecision {
    /// Whether another attempt should be made.
    pub retry: bool,
    /// Milliseconds to sleep before the next attempt (§4.1 "Delay handling").
    pub delay: Option<u64>,
    /// Ceiling on total attempts for this key.
    pub max_retries: Option<u32>,
    /// Keys to refresh (bypass cache, re-resolve) before the next attempt
    /// (§4.1 "Refresh semantics").
    pub refresh: Vec<String>,
}

/// The decision returned by a spec's `cache_fn` (§3, §4.6).
#[derive(Debug, Clone, Default)]
pub struct CacheDecision {
    /// Whether the response should be cached.
    pub cache: bool,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at: Option<i64>,
    /// Relative time-to-live in milliseconds; used to derive `expires_at`
    /// when the latter is absent.
    pub ttl: Option<i64>,
}

/// One attempt at resolving one key (§3).
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The key this exchange belongs to.
    pub path: String,
    /// The spec this exchange is an attempt of.
    pub spec: Arc<Spec>,
    /// The request that was (or would have been) sent.
    pub req: RequestDescriptor,
    /// The response, if the transport produced one.
    pub res: Option<ResponseDescriptor>,
    /// The transport error, if the transport raised instead of responding.
    pub exception: Option<Arc<TransportError>>,
    /// Whether this attempt is considered successful.
    pub success: bool,
    /// The retry decision attached after a failed attempt, if any.
    pub retry_decision: Option<RetryDecision>,
    /// The cache decision attached after a successful attempt, if any.
    pub cache_decision: Option<CacheDecision>,
    /// 1-based attempt number for this key.
    pub attempt: u32,
    /// When the attempt started, epoch milliseconds.
    pub started_at: i64,
    /// When the attempt finished, epoch milliseconds.
    pub finished_at: i64,
}

impl Exchange {
    /// Whether this exchange is eligible for another attempt per its retry
    /// decision (§4.1 "Dispatch pass"): it failed, asked to retry, and
    /// hasn't exceeded `max_retries`.
    pub fn is_retry_eligible(&self) -> bool {
        match &self.retry_decision {
            Some(decision) => {
                decision.retry
                    && decision
                        .max_retries
                        .map(|max| self.attempt <= max)
                        .unwrap_or(true)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    fn exchange(attempt: u32, decision: Option<RetryDecision>) -> Exchange {
        Exchange {
            path: "a".into(),
            spec: Arc::new(crate::spec::Spec::inline(
                "a",
                RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            )),
            req: RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            res: None,
            exception: None,
            success: false,
            retry_decision: decision,
            cache_decision: None,
            attempt,
            started_at: 0,
            finished_at: 0,
        }
    }

    #[test]
    fn not_eligible_without_a_decision() {
        assert!(!exchange(1, None).is_retry_eligible());
    }

    #[test]
    fn eligible_while_under_max_retries() {
        let decision = RetryDecision {
            retry: true,
            max_retries: Some(2),
            ..Default::default()
        };
        assert!(exchange(1, Some(decision.clone())).is_retry_eligible());
        assert!(exchange(2, Some(decision.clone())).is_retry_eligible());
        assert!(!exchange(3, Some(decision)).is_retry_eligible());
    }

    #[test]
    fn not_eligible_when_retry_is_false() {
        let decision = RetryDecision { retry: false, ..Default::default() };
        assert!(!exchange(1, Some(decision)).is_retry_eligible());
    }
}

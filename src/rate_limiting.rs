//! Optional per-host rate limiting (§9's ambient concerns, feature
//! `rate-limiting`).
//!
//! Grounded on `http-cache`'s own `rate_limiting.rs`: same `governor`-backed
//! keyed/direct limiter pair, retargeted from "only throttle on a cache
//! miss" (this crate's cache lookups never hit the network, so there's
//! nothing there to throttle) to "wait before dispatching a request",
//! called from the resolver's dispatch pass right before
//! `Transport::send`.

#[cfg(feature = "rate-limiting")]
use async_trait::async_trait;

#[cfg(feature = "rate-limiting")]
pub use governor::{
    clock::DefaultClock,
    state::{keyed::DefaultKeyedStateStore, InMemoryState},
    DefaultDirectRateLimiter, DefaultKeyedRateLimiter, Quota, RateLimiter,
};

/// Throttles dispatch of requests keyed by some string (typically a host).
#[cfg(feature = "rate-limiting")]
#[async_trait]
pub trait DispatchRateLimiter: Send + Sync + 'static {
    /// Block until a request to `key` is allowed to proceed.
    async fn until_key_ready(&self, key: &str);

    /// Non-blocking check: would a request to `key` be allowed right now?
    fn check_key(&self, key: &str) -> bool;
}

/// A `governor`-backed limiter with an independent quota per key (typically
/// a request's host).
#[cfg(feature = "rate-limiting")]
#[derive(Debug)]
pub struct HostRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

#[cfg(feature = "rate-limiting")]
impl HostRateLimiter {
    /// Create a limiter applying `quota` independently to each key.
    ///
    /// ```rust,ignore
    /// use reqweave::rate_limiting::{HostRateLimiter, Quota};
    /// use std::num::NonZero;
    ///
    /// let quota = Quota::per_minute(NonZero::new(10).unwrap());
    /// let limiter = HostRateLimiter::new(quota);
    /// ```
    pub fn new(quota: Quota) -> Self {
        Self { limiter: DefaultKeyedRateLimiter::keyed(quota) }
    }
}

#[cfg(feature = "rate-limiting")]
#[async_trait]
impl DispatchRateLimiter for HostRateLimiter {
    async fn until_key_ready(&self, key: &str) {
        self.limiter.until_key_ready(&key.to_string()).await;
    }

    fn check_key(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }
}

/// A single global quota shared by every request regardless of key.
#[cfg(feature = "rate-limiting")]
#[derive(Debug)]
pub struct GlobalRateLimiter {
    limiter: DefaultDirectRateLimiter,
}

#[cfg(feature = "rate-limiting")]
impl GlobalRateLimiter {
    /// Create a direct, process-wide limiter applying `quota` to all
    /// dispatched requests.
    pub fn direct(quota: Quota) -> GlobalRateLimiter {
        GlobalRateLimiter { limiter: DefaultDirectRateLimiter::direct(quota) }
    }
}

#[cfg(feature = "rate-limiting")]
#[async_trait]
impl DispatchRateLimiter for GlobalRateLimiter {
    async fn until_key_ready(&self, _key: &str) {
        self.limiter.until_ready().await;
    }

    fn check_key(&self, _key: &str) -> bool {
        self.limiter.check().is_ok()
    }
}

//! Epoch-millisecond time source used for cache expiry, retry delays, and
//! exchange timestamps.
//!
//! The resolver never calls [`std::time::SystemTime::now`] directly so that
//! tests can substitute a [`ManualClock`] and assert delay/expiry behavior
//! deterministically instead of sleeping real wall-clock time.

use std::{
    fmt,
    sync::atomic::{AtomicI64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// A source of "now", expressed as milliseconds since the Unix epoch.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64;

    /// Sleep (or, for a manual clock, simply record the delay) for the
    /// given number of milliseconds.
    fn sleep(
        &self,
        millis: u64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>;
}

/// The default clock, backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn sleep(
        &self,
        millis: u64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(std::time::Duration::from_millis(millis)))
    }
}

/// A clock a test can advance explicitly. `sleep` does not actually block;
/// it advances the clock by the requested amount and returns immediately,
/// which keeps retry-delay and cache-expiry tests fast and deterministic.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a manual clock starting at the given epoch-millisecond value.
    pub fn new(start_millis: i64) -> Self {
        Self { millis: AtomicI64::new(start_millis) }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the clock to an absolute epoch-millisecond value.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn sleep(
        &self,
        millis: u64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        self.advance(millis as i64);
        Box::pin(std::future::ready(()))
    }
}

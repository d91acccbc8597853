//! The `protect` helper implementing §7's propagation policy: user-supplied
//! closures (`req_fn`, `success?`, `retry_fn`, `cache_fn`,
//! `prepare_lookup_params`, `select`) never propagate a panic into the
//! resolver. A caught panic is logged at `warn!` and treated as "no
//! decision", the same way a raised exception is in the source system this
//! was distilled from.

use std::panic::{self, AssertUnwindSafe};

/// Run `f`, catching any panic and returning `None` in its place. `source`
/// names the closure kind for logging (`"req_fn"`, `"success?"`, …) and
/// should match one of the `exception` event `source` values in §6.2.
pub fn protect<T>(
    f: impl FnOnce() -> T,
    source: &'static str,
) -> Option<T> {
    protect_reporting(f, source).ok()
}

/// Like [`protect`], but keeps the panic message instead of discarding it,
/// for call sites that also want to emit an `exception` event (§6.2) rather
/// than only logging (the resolver, which has a sink to emit on; plain
/// `protect` callers that don't, e.g. cache-key derivation helpers used
/// outside a resolution, still get the `warn!`).
pub fn protect_reporting<T>(
    f: impl FnOnce() -> T,
    source: &'static str,
) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => {
            let message = panic_message(&payload);
            log::warn!(
                "user-supplied closure `{source}` panicked and was \
                 swallowed: {message}"
            );
            Err(message)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn protect_returns_value_on_success() {
        let result = protect(|| 1 + 1, "test");
        assert_eq!(result, Some(2));
    }

    #[test]
    fn protect_swallows_panics() {
        let result: Option<i32> =
            protect(|| panic!("boom"), "test");
        assert_eq!(result, None);
    }
}

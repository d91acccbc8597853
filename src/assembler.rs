//! Turns a drained event stream into the single result record `request`
//! returns (§4.5, §6.1).
//!
//! Grounded on `http-cache`'s `HttpResponse`/cache-status reporting: the
//! middleware's `run` already folds "did we hit the cache, what did the
//! transport say, what's the final status" into one struct handed back to
//! the caller, which is exactly the shape `ResolvedResult` generalizes.

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    error::{FailureData, FailureReason},
    events::Event,
    transport::ResponseDescriptor,
};

/// Where a key's final value came from (§6.2's cache-status data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a prior successful dispatch this resolution.
    Miss,
    /// Served from the cache backend without dispatching.
    Hit,
}

/// One entry of a key's activity log (§4.5, "log"): every event the
/// resolver emitted about that key, in arrival order, for callers that want
/// more than the terminal outcome without re-subscribing via
/// `request_with_log`.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// The attempt number this entry is about, when the underlying event
    /// carried one.
    pub attempt: Option<u32>,
    /// A short human-readable description of what happened (`"dispatched"`,
    /// `"cache hit"`, `"stored in cache"`, `"exception in req_fn"`, …).
    pub message: String,
}

/// The assembled outcome for one key in the specs table (§4.5).
#[derive(Debug, Clone)]
pub struct KeyResult {
    /// The final response, if one was ever obtained.
    pub res: Option<ResponseDescriptor>,
    /// Whether the key ultimately resolved successfully.
    pub success: bool,
    /// Cache provenance of the final value, when it resolved.
    pub cache_status: Option<CacheStatus>,
    /// The backend-rendered cache key this value was served from or stored
    /// under, when cache activity touched this key at all.
    pub cache_key: Option<String>,
    /// When the value was written into the cache, if it ever was.
    pub cached_at: Option<i64>,
    /// When the cached value expires, if it was cached and has a TTL.
    pub expires_at: Option<i64>,
    /// Whether this resolution itself stored the result in the cache (as
    /// opposed to serving a pre-existing entry).
    pub stored_in_cache: bool,
    /// Every attempt's transport exception, in order.
    pub exceptions: Vec<String>,
    /// The terminal failure reason, if the key never resolved.
    pub failure: Option<FailureReason>,
    /// The failure's structured detail, set alongside `failure`.
    pub failure_data: Option<FailureData>,
    /// Total dispatch attempts made for this key.
    pub attempts: u32,
    /// Every event this key produced, in order (§4.5 "log").
    pub log: Vec<LogEntry>,
}

impl Default for KeyResult {
    fn default() -> Self {
        Self {
            res: None,
            success: false,
            cache_status: None,
            cache_key: None,
            cached_at: None,
            expires_at: None,
            stored_in_cache: false,
            exceptions: Vec::new(),
            failure: None,
            failure_data: None,
            attempts: 0,
            log: Vec::new(),
        }
    }
}

/// The assembled result of a whole resolution (§4.5, §6.1): one
/// [`KeyResult`] per key plus the overall failure reason, if resolution
/// didn't fully complete.
#[derive(Debug, Clone, Default)]
pub struct ResolvedResult {
    /// Per-key outcomes, keyed by context path.
    pub keys: HashMap<String, KeyResult>,
    /// Set when the whole resolution was abandoned (deadlocked on an
    /// unresolvable param), as opposed to an individual key failing.
    pub overall_failure: Option<FailureReason>,
    /// Set only when the terminal failure is `missing-params` and one of
    /// the missing names is a top-level key of the `params` the caller
    /// passed in (§4.5 "hint"): a guide toward the most common cause of
    /// that failure, the value being supplied at the wrong nesting depth
    /// rather than under the path the spec actually declared.
    pub hint: Option<String>,
}

impl ResolvedResult {
    /// Whether every key that was part of this resolution resolved
    /// successfully.
    pub fn is_success(&self) -> bool {
        self.overall_failure.is_none() && self.keys.values().all(|k| k.success)
    }

    /// Convenience accessor for one key's final body, if it resolved.
    pub fn body(&self, key: &str) -> Option<&Value> {
        self.keys.get(key)?.res.as_ref().map(|res| &res.body)
    }
}

/// §4.5's `hint`: present only when `missing` names a param that's already
/// a top-level key of `params` — the caller supplied it, just not nested
/// under the path the spec declared.
fn missing_params_hint(missing: &[String], params: &Value) -> Option<String> {
    let params = params.as_object()?;
    let offender = missing.iter().find(|name| params.contains_key(name.as_str()))?;
    Some(format!(
        "`{offender}` is present in `params` but not in the shape this spec's path \
         expects — check how it's nested"
    ))
}

/// Fold an event stream (already drained, e.g. via
/// [`crate::events::EventStream::collect`]) into a [`ResolvedResult`]
/// (§4.5). `params` is the seed map the resolution was started with, used
/// only to compute `hint`. Events are processed in arrival order; later
/// events for the same key (a retry's eventual success, a cache hit after
/// the dispatch pass gave up) overwrite earlier ones, since only the
/// terminal state of a key matters to the assembled result.
pub fn assemble(events: Vec<Event>, params: &Value) -> ResolvedResult {
    let mut result = ResolvedResult::default();
    for event in events {
        match event {
            Event::Request { path, attempt, .. } => {
                let entry = result.keys.entry(path).or_default();
                entry.log.push(LogEntry {
                    attempt: Some(attempt),
                    message: "dispatched".to_string(),
                });
            }
            Event::Response { path, res, success, retry, cache, attempt } => {
                let entry = result.keys.entry(path).or_default();
                entry.attempts += 1;
                entry.res = Some(res);
                entry.success = success;
                entry.log.push(LogEntry {
                    attempt: Some(attempt),
                    message: format!(
                        "response received (success={success}, retry={retry}, cache={cache})"
                    ),
                });
                if success {
                    entry.cache_status = Some(CacheStatus::Miss);
                    entry.failure = None;
                    entry.failure_data = None;
                }
            }
            Event::CacheHit { path, cached_at, expires_at, key, entry_success, .. } => {
                let entry = result.keys.entry(path).or_default();
                entry.success = entry_success;
                entry.cache_status = Some(CacheStatus::Hit);
                entry.cache_key = Some(key);
                entry.cached_at = Some(cached_at);
                entry.expires_at = expires_at;
                entry.failure = None;
                entry.failure_data = None;
                entry.log.push(LogEntry {
                    attempt: None,
                    message: "cache hit".to_string(),
                });
            }
            Event::StoreInCache { path, cached_at, expires_at, key, .. } => {
                let entry = result.keys.entry(path).or_default();
                entry.stored_in_cache = true;
                entry.cache_key = Some(key);
                entry.cached_at = Some(cached_at);
                entry.expires_at = expires_at;
                entry.log.push(LogEntry {
                    attempt: None,
                    message: "stored in cache".to_string(),
                });
            }
            Event::Exception { path, source, error, attempt } => {
                let entry = result.keys.entry(path).or_default();
                entry.attempts += 1;
                entry.exceptions.push(error.to_string());
                entry.log.push(LogEntry {
                    attempt,
                    message: format!("exception in {source}: {error}"),
                });
            }
            Event::InvalidData { path, source, message } => {
                let entry = result.keys.entry(path).or_default();
                entry.exceptions.push(message.clone());
                entry.log.push(LogEntry {
                    attempt: None,
                    message: format!("invalid data from {source}: {message}"),
                });
            }
            Event::Failed { path: Some(path), reason, data } => {
                let entry = result.keys.entry(path.clone()).or_default();
                entry.success = false;
                entry.log.push(LogEntry {
                    attempt: None,
                    message: format!("failed: {reason}"),
                });
                if result.hint.is_none() && reason == FailureReason::MissingParams {
                    result.hint = missing_params_hint(&data.missing, params);
                }
                entry.failure = Some(reason);
                entry.failure_data = Some(data);
            }
            Event::Failed { path: None, reason, data } => {
                if result.hint.is_none() && reason == FailureReason::MissingParams {
                    result.hint = missing_params_hint(&data.missing, params);
                }
                result.overall_failure = Some(reason);
            }
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::RequestDescriptor;
    use serde_json::json;
    use url::Url;

    fn ok_response() -> ResponseDescriptor {
        ResponseDescriptor {
            status: 200,
            headers: Default::default(),
            body: json!({"ok": true}),
            transport_handle: None,
        }
    }

    fn no_params() -> Value {
        json!({})
    }

    #[test]
    fn a_successful_response_marks_the_key_resolved() {
        let events = vec![Event::Response {
            path: "a".into(),
            req: RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            res: ok_response(),
            success: true,
            retry: false,
            cache: false,
            attempt: 1,
        }];
        let result = assemble(events, &no_params());
        assert!(result.is_success());
        assert_eq!(result.body("a"), Some(&json!({"ok": true})));
        assert_eq!(result.keys["a"].log.len(), 1);
    }

    #[test]
    fn a_cache_hit_counts_as_resolved_without_a_response_event() {
        let events = vec![Event::CacheHit {
            path: "a".into(),
            req: RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            res: ok_response(),
            cached_at: 1000,
            expires_at: Some(2000),
            key: "token|abc".into(),
            entry_success: true,
        }];
        let result = assemble(events, &no_params());
        assert_eq!(result.keys["a"].cache_status, Some(CacheStatus::Hit));
        assert_eq!(result.keys["a"].cache_key.as_deref(), Some("token|abc"));
        assert_eq!(result.keys["a"].expires_at, Some(2000));
        assert!(result.is_success());
    }

    #[test]
    fn a_store_in_cache_event_marks_stored_in_cache() {
        let events = vec![Event::StoreInCache {
            path: "a".into(),
            req: RequestDescriptor::get(Url::parse("http://x/").unwrap()),
            res: ok_response(),
            cached_at: 1000,
            expires_at: None,
            key: "token|abc".into(),
        }];
        let result = assemble(events, &no_params());
        assert!(result.keys["a"].stored_in_cache);
    }

    #[test]
    fn a_per_key_failure_does_not_set_overall_failure() {
        let events = vec![Event::Failed {
            path: Some("a".into()),
            reason: FailureReason::RetriesExhausted,
            data: FailureData { attempts: Some(3), max_retries: Some(2), ..Default::default() },
        }];
        let result = assemble(events, &no_params());
        assert!(!result.is_success());
        assert_eq!(result.keys["a"].failure, Some(FailureReason::RetriesExhausted));
        assert_eq!(result.keys["a"].failure_data.as_ref().unwrap().attempts, Some(3));
        assert!(result.overall_failure.is_none());
    }

    #[test]
    fn hint_is_absent_for_non_missing_params_failures() {
        let events = vec![Event::Failed {
            path: Some("a".into()),
            reason: FailureReason::RetriesExhausted,
            data: FailureData { missing: vec!["token".into()], ..Default::default() },
        }];
        let result = assemble(events, &json!({"token": "abc"}));
        assert!(result.hint.is_none());
    }

    #[test]
    fn hint_is_absent_when_the_missing_param_was_never_supplied() {
        let events = vec![Event::Failed {
            path: None,
            reason: FailureReason::MissingParams,
            data: FailureData { missing: vec!["token".into()], ..Default::default() },
        }];
        let result = assemble(events, &json!({"unrelated": 1}));
        assert!(!result.is_success());
        assert_eq!(result.overall_failure, Some(FailureReason::MissingParams));
        assert!(result.hint.is_none());
    }

    #[test]
    fn hint_guides_the_caller_when_a_missing_param_was_supplied_unnested() {
        let events = vec![Event::Failed {
            path: None,
            reason: FailureReason::MissingParams,
            data: FailureData { missing: vec!["token".into()], ..Default::default() },
        }];
        let result = assemble(events, &json!({"token": "abc"}));
        assert!(result.hint.as_deref().unwrap().contains("token"));
    }
}

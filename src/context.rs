//! The mutable-during-resolution mapping of resolved param values (§3,
//! "Context"), plus the tagged-data representation of a value that might
//! turn out to be a sub-request instead of a plain scalar (§9: "dynamic
//! typing → tagged data").

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use crate::spec::{Select, Spec};

/// A path selector: `path[0]` names a top-level context entry; any further
/// segments navigate into that entry's resolved JSON value (§3: "a param
/// name may be a path (sequence) meaning 'look up that nested position in
/// the context'").
pub type ParamPath = Vec<String>;

/// Build a single-segment path from a plain name. A convenience for the
/// common case where a param isn't nested.
pub fn path(name: impl Into<String>) -> ParamPath {
    vec![name.into()]
}

/// One entry in the [`Context`]: either an already-resolved value, or a
/// reference to a sub-spec that must be resolved first and then projected
/// through `select` (§4.3, §9).
#[derive(Clone)]
pub enum ParamValue {
    /// A resolved scalar, object, or array.
    Value(Value),
    /// A sub-request that must be resolved before this value exists.
    SubSpec(SubSpecRef),
}

impl std::fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "Value({v})"),
            Self::SubSpec(r) => write!(f, "SubSpec({})", r.spec.name),
        }
    }
}

/// A tagged reference to a sub-spec placed in `params`, lifted into the
/// specs table at resolution start (§3, Context lifecycle).
#[derive(Clone)]
pub struct SubSpecRef {
    /// The sub-spec itself.
    pub spec: Arc<Spec>,
    /// Applied to the sub-spec's response to produce the installed value.
    /// Defaults to "the whole response" (§4.3).
    pub select: Option<Select>,
}

/// The growing map of resolved param values used during resolution (§3).
#[derive(Clone, Default)]
pub struct Context {
    values: HashMap<String, ParamValue>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a top-level entry with a plain value.
    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), ParamValue::Value(value));
    }

    /// Seed a top-level entry with a sub-spec reference.
    pub fn insert_sub_spec(&mut self, key: impl Into<String>, sub: SubSpecRef) {
        self.values.insert(key.into(), ParamValue::SubSpec(sub));
    }

    /// Remove a top-level entry (used when a key is marked for refresh).
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    /// Raw access to a top-level entry.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// All top-level keys currently present.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Iterate all top-level entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// Whether `path` resolves to a plain value right now (not a pending
    /// sub-spec). A single-segment path is present iff the top-level entry
    /// is a [`ParamValue::Value`]; longer paths additionally require the
    /// nested position to exist.
    pub fn has_value(&self, path: &[String]) -> bool {
        self.get_value(path).is_some()
    }

    /// Resolve `path` to a JSON value, navigating nested positions for
    /// paths longer than one segment. Returns `None` if the top-level entry
    /// is absent, still a pending sub-spec, or the nested position doesn't
    /// exist.
    pub fn get_value(&self, path: &[String]) -> Option<&Value> {
        let (head, rest) = path.split_first()?;
        let ParamValue::Value(root) = self.values.get(head)? else {
            return None;
        };
        rest.iter().try_fold(root, |acc, segment| acc.get(segment))
    }

    /// Build the projection used for cache keying: an object mapping each
    /// path's last segment to its resolved value (§3, "params_projection").
    /// Paths that aren't yet resolved are simply absent from the result —
    /// callers check `has_value` first per invariant 1 (§8).
    pub fn project(&self, paths: &[ParamPath]) -> Value {
        let mut map = serde_json::Map::new();
        for p in paths {
            if let (Some(last), Some(value)) =
                (p.last(), self.get_value(p))
            {
                map.insert(last.clone(), value.clone());
            }
        }
        Value::Object(map)
    }
}

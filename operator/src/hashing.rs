use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Produces a stable hex digest of `spec` (and `bfr_spec` when a backfill is
/// driving the Job). Not cryptographic — only needs to be deterministic
/// regardless of the original struct's field declaration order, which is why
/// the JSON value is round-tripped through a `BTreeMap` before hashing.
pub fn hash_spec<T: Serialize>(spec: &T, bfr_spec: Option<&Value>) -> String {
    let mut canonical = canonicalize(&serde_json::to_value(spec).unwrap_or(Value::Null));
    if let Some(bfr) = bfr_spec {
        if let Value::Object(ref mut map) = canonical {
            map.insert("__backfillRequest".to_string(), canonicalize(bfr));
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_deterministic_regardless_of_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(hash_spec(&a, None), hash_spec(&b, None));
    }

    #[test]
    fn hash_changes_when_backfill_spec_is_mixed_in() {
        let spec = json!({"suspended": false});
        let without = hash_spec(&spec, None);
        let with = hash_spec(&spec, Some(&json!({"streamId": "s1"})));
        assert_ne!(without, with);
    }

    #[test]
    fn hash_is_16_bytes_hex_encoded() {
        let spec = json!({"suspended": true});
        let h = hash_spec(&spec, None);
        assert_eq!(h.len(), 32);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

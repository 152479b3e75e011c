//! Response cache key derivation.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Key for a query response: `sha256(query + "|" + canonical(variables))`,
/// hex-encoded.
pub fn response_key(query: &str, variables: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical_json(variables).as_bytes());
    hex::encode(hasher.finalize())
}

/// Serialize a JSON value with object keys sorted at every depth, so that
/// `{"a":1,"b":2}` and `{"b":2,"a":1}` produce the same text.
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key.clone(), canonicalize(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn key_ignores_variable_order() {
        let a = response_key("{ posts { id } }", &json!({"first": 10, "after": "x"}));
        let b = response_key("{ posts { id } }", &json!({"after": "x", "first": 10}));
        assert_eq!(a, b);
    }

    #[test]
    fn key_depends_on_query_and_variables() {
        let base = response_key("{ posts { id } }", &json!({"first": 10}));
        assert_ne!(base, response_key("{ pages { id } }", &json!({"first": 10})));
        assert_ne!(base, response_key("{ posts { id } }", &json!({"first": 11})));
    }

    #[test]
    fn separator_prevents_boundary_collisions() {
        // "ab" + "|" + "\"c\"" differs from "a" + "|" + "\"bc\"".
        assert_ne!(response_key("ab", &json!("c")), response_key("a", &json!("bc")));
    }

    #[test]
    fn nested_objects_are_canonicalized() {
        let text = canonical_json(&json!({"z": {"b": 1, "a": [{"d": 0, "c": 1}]}, "y": null}));
        assert_eq!(text, r#"{"y":null,"z":{"a":[{"c":1,"d":0}],"b":1}}"#);
    }

    #[test]
    fn key_is_hex_sha256() {
        let key = response_key("{ a }", &Value::Null);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

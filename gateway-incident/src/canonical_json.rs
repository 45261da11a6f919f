use serde_json::Value;

/// Serializes `value` with recursively sorted object keys: the form
/// HMAC-signed over the webhook payload. Builds its own sorted `Map`
/// rather than relying on `serde_json`'s default ordering, so the result
/// is stable regardless of whether the `preserve_order` feature is
/// unified in elsewhere in the dependency tree.
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<&String, &Value> = std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k, v);
            }
            let mut ordered = serde_json::Map::new();
            for (k, v) in sorted {
                ordered.insert(k.clone(), canonicalize(v));
            }
            Value::Object(ordered)
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
    fn sorts_top_level_keys() {
        let value = json!({"b": 1, "a": 2});
        assert_eq!(canonical_json(&value), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn sorts_nested_object_keys_recursively() {
        let value = json!({"z": {"y": 1, "x": 2}, "a": 3});
        assert_eq!(canonical_json(&value), r#"{"a":3,"z":{"x":2,"y":1}}"#);
    }

    #[test]
    fn preserves_array_element_order() {
        let value = json!({"items": [{"b": 1, "a": 2}, 3, 2]});
        assert_eq!(canonical_json(&value), r#"{"items":[{"a":2,"b":1},3,2]}"#);
    }
}

//! Transient-key sanitization.
//!
//! Synthesis payloads carry internal artifacts - error sentinels, extraction
//! flags, meta-tags - that must never reach the renderer. The predicate is a
//! closed set plus a leading-underscore heuristic. Meaningful-content
//! detection in the normalizer depends on this running first.

use serde_json::{Map, Value};

/// The closed set of transient key names
const TRANSIENT_KEYS: &[&str] = &[
    "_synthesisError",
    "_wasArray",
    "message",
    "confidenceScore",
    "dataType",
    "_sourceQuality",
    "_extractionWarnings",
];

/// True when a key is an internal artifact that must be dropped
pub fn is_transient_key(key: &str) -> bool {
    TRANSIENT_KEYS.contains(&key) || key.starts_with('_')
}

/// Recursively remove transient keys, preserving structure otherwise.
///
/// Returns a new value; the input is never mutated. Arrays are recursed,
/// scalars pass through.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                if is_transient_key(key) {
                    continue;
                }
                out.insert(key.clone(), sanitize(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicate() {
        assert!(is_transient_key("_synthesisError"));
        assert!(is_transient_key("confidenceScore"));
        assert!(is_transient_key("dataType"));
        assert!(is_transient_key("_anythingUnderscored"));
        assert!(!is_transient_key("players"));
        assert!(!is_transient_key("title"));
    }

    #[test]
    fn test_sanitize_drops_transients_recursively() {
        let input = json!({
            "_synthesisError": "fail",
            "confidenceScore": 0.3,
            "tpes": {
                "_wasArray": true,
                "series": [{"year": 2020, "value": 1.5, "_flag": "x"}],
                "unit": "Mtoe"
            }
        });

        let clean = sanitize(&input);

        assert!(clean.get("_synthesisError").is_none());
        assert!(clean.get("confidenceScore").is_none());
        assert!(clean["tpes"].get("_wasArray").is_none());
        assert!(clean["tpes"]["series"][0].get("_flag").is_none());
        assert_eq!(clean["tpes"]["series"][0]["year"], 2020);
        assert_eq!(clean["tpes"]["unit"], "Mtoe");
    }

    #[test]
    fn test_sanitize_preserves_non_objects() {
        assert_eq!(sanitize(&json!("text")), json!("text"));
        assert_eq!(sanitize(&json!(42)), json!(42));
        assert_eq!(sanitize(&json!([1, 2, 3])), json!([1, 2, 3]));
        assert_eq!(sanitize(&Value::Null), Value::Null);
    }

    #[test]
    fn test_sanitize_does_not_mutate_input() {
        let input = json!({"_drop": 1, "keep": 2});
        let _ = sanitize(&input);
        assert!(input.get("_drop").is_some());
    }
}

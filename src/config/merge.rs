//! Field-by-field merging of settings tiers.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// Mappings merge key by key. A null in the overlay means "not specified"
/// and keeps the base value. Anything else replaces the base wholesale.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold tiers in order; later tiers win.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_tier_overrides_field() {
        let merged = deep_merge_all([
            json!({"data_path": "data", "scan_interval_secs": 30}),
            json!({"scan_interval_secs": 5}),
        ]);
        assert_eq!(merged, json!({"data_path": "data", "scan_interval_secs": 5}));
    }

    #[test]
    fn test_null_keeps_base() {
        let merged = deep_merge(json!({"data_path": "data"}), json!({"data_path": null}));
        assert_eq!(merged["data_path"], "data");
    }

    #[test]
    fn test_empty_document_is_ignored() {
        let merged = deep_merge_all([json!({"fs_events": true}), Value::Null]);
        assert_eq!(merged, json!({"fs_events": true}));
    }
}

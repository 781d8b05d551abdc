//! Field-by-field merging of configuration tiers.
//!
//! Objects merge recursively; every other value, arrays included, is replaced
//! by the higher tier. A null in the higher tier means "not specified".

use serde_json::Value;

/// Merge `overlay` on top of `base`.
///
/// ```
/// use serde_json::json;
/// use hive_tasks::config::deep_merge;
///
/// let base = json!({"reaper": {"threshold_minutes": 60, "activity": "last_activity"}});
/// let overlay = json!({"reaper": {"threshold_minutes": 15}});
/// assert_eq!(
///     deep_merge(base, overlay),
///     json!({"reaper": {"threshold_minutes": 15, "activity": "last_activity"}})
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(upper)) => {
            for (key, value) in upper {
                let value = match merged.remove(&key) {
                    Some(lower) => deep_merge(lower, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold [`deep_merge`] over tiers given lowest priority first.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deadline_maps_merge_per_type() {
        let base = json!({"deadlines": {"research": 30, "dev": 0}});
        let overlay = json!({"deadlines": {"dev": 120, "ops": 15}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"deadlines": {"research": 30, "dev": 120, "ops": 15}})
        );
    }

    #[test]
    fn null_in_upper_tier_keeps_lower_value() {
        let base = json!({"agent": "hive-cli", "store": {"backend": "file"}});
        let overlay = json!({"agent": null, "store": {"backend": null}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"agent": "hive-cli", "store": {"backend": "file"}})
        );
    }

    #[test]
    fn arrays_and_scalars_are_replaced() {
        let base = json!({"list": [1, 2, 3], "value": {"nested": true}});
        let overlay = json!({"list": [4], "value": 7});
        assert_eq!(deep_merge(base, overlay), json!({"list": [4], "value": 7}));
    }

    #[test]
    fn later_tiers_win() {
        let tiers = vec![json!({"a": 1, "b": 1}), json!({"b": 2}), json!({"b": 3, "c": 3})];
        assert_eq!(deep_merge_all(tiers), json!({"a": 1, "b": 3, "c": 3}));
    }
}

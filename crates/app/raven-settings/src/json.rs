use serde_json::{Map, Value};

/// Overlay every non-null value of `source` onto `target`, recursing into
/// objects so partial sections only replace the keys they mention.
pub(crate) fn merge_non_null_json_value(source: Value, target: &mut Value) {
    match (source, target) {
        (Value::Object(source), Value::Object(target)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_non_null_json_value(value, existing),
                    None if !value.is_null() => {
                        target.insert(key, value);
                    }
                    None => {}
                }
            }
        }
        (Value::Null, _) => {}
        (source, target) => *target = source,
    }
}

/// The subset of `update` that differs from `current`.
pub(crate) fn json_difference(current: Value, update: &Value) -> Value {
    match (current, update) {
        (Value::Object(current), Value::Object(update)) => {
            let mut diff = Map::new();
            for (key, update_value) in update {
                match current.get(key) {
                    Some(current_value) if current_value == update_value => {}
                    Some(current_value) => {
                        let nested = json_difference(current_value.clone(), update_value);
                        if !matches!(&nested, Value::Object(map) if map.is_empty()) {
                            diff.insert(key.clone(), nested);
                        }
                    }
                    None => {
                        diff.insert(key.clone(), update_value.clone());
                    }
                }
            }
            Value::Object(diff)
        }
        (current, update) if current == *update => Value::Object(Map::new()),
        (_, update) => update.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn merge_keeps_defaults_for_missing_and_null_keys() {
        let mut target = json!({"network": {"userAgent": "a", "readTimeout": "10s"}, "x": 1});
        merge_non_null_json_value(
            json!({"network": {"userAgent": "b", "readTimeout": null}}),
            &mut target,
        );
        assert_eq!(
            target,
            json!({"network": {"userAgent": "b", "readTimeout": "10s"}, "x": 1})
        );
    }

    #[test]
    fn difference_only_reports_changed_leaves() {
        let current = json!({"updater": {"autoCheck": true, "notifyDelayTicks": 100}});
        let update = json!({"updater": {"autoCheck": false, "notifyDelayTicks": 100}});
        assert_eq!(
            json_difference(current, &update),
            json!({"updater": {"autoCheck": false}})
        );
    }

    #[test]
    fn difference_of_equal_values_is_empty() {
        let value = json!({"a": {"b": 1}});
        assert_eq!(json_difference(value.clone(), &value), json!({}));
    }
}

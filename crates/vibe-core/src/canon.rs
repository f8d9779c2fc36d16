use serde::Serialize;
use serde_json::Value;

/// Canonical JSON bytes for any serializable record: object keys sorted
/// lexicographically at every depth, arrays in original order, no whitespace.
pub fn canonical_json<T: Serialize>(record: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(record)?;
    serde_json::to_vec(&sort_keys(&value))
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canon_str(value: &Value) -> String {
        String::from_utf8(canonical_json(value).unwrap()).unwrap()
    }

    #[test]
    fn rule_keys_are_sorted() {
        let rule = json!({"op": "at_least", "axis": "planning_signal", "value": 65});
        assert_eq!(
            canon_str(&rule),
            r#"{"axis":"planning_signal","op":"at_least","value":65}"#
        );
    }

    #[test]
    fn nested_records_are_sorted() {
        let table = json!({"version": 2, "fallback": {"name": "B", "id": "b"}});
        assert_eq!(
            canon_str(&table),
            r#"{"fallback":{"id":"b","name":"B"},"version":2}"#
        );
    }

    #[test]
    fn rule_order_is_preserved() {
        let table = json!({"rules": ["prompt-sprinter", "architect", "craftsperson"]});
        assert_eq!(
            canon_str(&table),
            r#"{"rules":["prompt-sprinter","architect","craftsperson"]}"#
        );
    }
}

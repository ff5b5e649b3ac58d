//! Response projection
//!
//! Stored response rows have drifted over time: partial writes left null
//! `answers`, and an old client double-wrapped the answers object. The
//! projector flattens all of that into one externally-visible shape so
//! downstream contracts never see the drift. It is total: any input row
//! produces a view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Externally-visible shape of a stored response
#[derive(Serialize, Clone, Debug)]
pub struct ResponseView {
    pub id: Option<Uuid>,
    pub form_id: Option<Uuid>,
    /// Never null: absent or null answers become an empty mapping
    pub answers: Map<String, Value>,
    pub device_hash: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Normalize one raw storage row
pub fn normalize(raw: &Value) -> ResponseView {
    ResponseView {
        id: uuid_field(raw, "id"),
        form_id: uuid_field(raw, "form_id"),
        answers: normalize_answers(raw.get("answers")),
        device_hash: raw
            .get("device_hash")
            .and_then(Value::as_str)
            .map(str::to_string),
        created_at: raw
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
    }
}

fn uuid_field(raw: &Value, key: &str) -> Option<Uuid> {
    raw.get(key)?.as_str()?.parse().ok()
}

fn normalize_answers(answers: Option<&Value>) -> Map<String, Value> {
    let Some(Value::Object(map)) = answers else {
        return Map::new();
    };

    // Unwrap one level of {"answers": {...}} double-wrapping
    if map.len() == 1 {
        if let Some(Value::Object(inner)) = map.get("answers") {
            return inner.clone();
        }
    }

    map.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_answers_become_empty_map() {
        let view = normalize(&json!({
            "id": "4b1c6f2e-6f9a-4c1e-9b7d-2a62c0a7f3d1",
            "form_id": "9d3b0e58-1c2f-4f4e-8a7b-5f6c7d8e9f0a",
            "answers": null,
            "device_hash": "ab12",
            "created_at": "2026-07-01T09:00:00+00:00"
        }));

        assert!(view.answers.is_empty());
        assert!(view.id.is_some());
        assert_eq!(view.device_hash.as_deref(), Some("ab12"));
        assert!(view.created_at.is_some());
    }

    #[test]
    fn test_double_wrapped_answers_are_unwrapped() {
        let view = normalize(&json!({
            "answers": {"answers": {"q1": "yes", "q2": ["a", "b"]}}
        }));

        assert_eq!(view.answers.get("q1"), Some(&json!("yes")));
        assert_eq!(view.answers.len(), 2);
    }

    #[test]
    fn test_plain_answers_pass_through() {
        let view = normalize(&json!({
            "answers": {"q1": "no"}
        }));

        assert_eq!(view.answers.get("q1"), Some(&json!("no")));
    }

    #[test]
    fn test_total_on_garbage_row() {
        let view = normalize(&json!("not even an object"));

        assert!(view.id.is_none());
        assert!(view.form_id.is_none());
        assert!(view.answers.is_empty());
        assert!(view.created_at.is_none());
    }

    #[test]
    fn test_single_answer_named_answers_is_not_unwrapped_to_scalar() {
        // A real answer whose value is not an object must survive
        let view = normalize(&json!({
            "answers": {"answers": "free text"}
        }));

        assert_eq!(view.answers.get("answers"), Some(&json!("free text")));
    }
}

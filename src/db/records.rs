//! Record shapes for the storage tables
//!
//! Mirrors the persisted columns of the `forms`, `responses`, and
//! `hosts` tables. Response rows are handled as raw JSON and normalized
//! by the response projector, so no response record lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Table name for forms
pub const FORM_TABLE: &str = "forms";

/// Table name for responses
pub const RESPONSE_TABLE: &str = "responses";

/// Table name for host profiles
pub const HOST_TABLE: &str = "hosts";

/// Legacy rows predate the `closed` column and carry null there; read
/// both null and absent as false.
pub(crate) fn nullable_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// One question inside a form definition
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Question {
    pub id: String,
    pub question: String,
    /// short_answer, paragraph, multiple_choice, checkboxes, dropdown,
    /// linear_scale, date, time
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    /// Present for choice-based question types
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// Full form row as stored and returned to its owner
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FormRecord {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub is_active: bool,
    /// Persisted but forced true at the API layer
    pub anonymous: bool,
    /// Persisted but forced true at the API layer
    pub one_response_per_device: bool,
    /// One-way terminal flag; checked before `is_active`
    #[serde(default, deserialize_with = "nullable_bool")]
    pub closed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormRecord {
    /// The flag pair the lifecycle guard derives acceptance state from
    pub fn lifecycle_flags(&self) -> LifecycleFlags {
        LifecycleFlags {
            is_active: self.is_active,
            closed: self.closed,
        }
    }
}

/// Trimmed form row for list views
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FormListItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub closed: bool,
    pub created_at: DateTime<Utc>,
}

/// The two stored flags the lifecycle guard derives state from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifecycleFlags {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub closed: bool,
}

/// Host profile row, created lazily on first form creation
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HostRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub active_forms_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_null_closed_reads_as_false() {
        let item: FormListItem = serde_json::from_value(json!({
            "id": "4b1c6f2e-6f9a-4c1e-9b7d-2a62c0a7f3d1",
            "title": "Lunch survey",
            "description": null,
            "is_active": true,
            "closed": null,
            "created_at": "2026-07-01T09:00:00+00:00"
        }))
        .unwrap();

        assert!(!item.closed);
        assert!(item.is_active);
    }

    #[test]
    fn test_missing_closed_reads_as_false() {
        let flags: LifecycleFlags = serde_json::from_value(json!({
            "is_active": false
        }))
        .unwrap();

        assert!(!flags.closed);
        assert!(!flags.is_active);
    }

    #[test]
    fn test_question_type_field_name() {
        let question: Question = serde_json::from_value(json!({
            "id": "q1",
            "question": "Which days work for you?",
            "type": "checkboxes",
            "required": true,
            "options": ["Monday", "Wednesday"]
        }))
        .unwrap();

        assert_eq!(question.kind, "checkboxes");
        let back = serde_json::to_value(&question).unwrap();
        assert_eq!(back["type"], "checkboxes");
    }
}

//! Submission deduplication
//!
//! At most one accepted response per (form, device fingerprint) pair.
//! The deduplicator runs entirely on the anonymous scoped channel; it
//! never touches privileged storage.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::db::{eq, LifecycleFlags, ScopedClient, FORM_TABLE, RESPONSE_TABLE};
use crate::services::lifecycle;
use crate::types::{EaseformError, Result};

/// Storage operations the deduplicator needs. Implemented by the
/// anonymous scoped channel; tests substitute an in-memory store.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn fetch_form(&self, form_id: Uuid) -> Result<Option<LifecycleFlags>>;

    async fn find_response(&self, form_id: Uuid, device_hash: &str) -> Result<Option<Uuid>>;

    async fn insert_response(
        &self,
        form_id: Uuid,
        device_hash: &str,
        answers: &Map<String, Value>,
    ) -> Result<Uuid>;
}

/// Accept or reject one submission, returning the stored response id.
///
/// The existence check and the insert are two storage calls, not one
/// transaction: two truly concurrent submissions from the same device
/// can both pass the check and leave one extra row. Accepted relaxation;
/// a unique index on (form_id, device_hash) at the storage layer would
/// close the race without changing this call's contract.
pub async fn try_submit<S: SubmissionStore>(
    store: &S,
    form_id: Uuid,
    device_hash: &str,
    answers: &Map<String, Value>,
) -> Result<Uuid> {
    let flags = store
        .fetch_form(form_id)
        .await?
        .ok_or_else(|| EaseformError::NotFound("Form not found".into()))?;

    if !lifecycle::evaluate(&flags).accepts_submissions() {
        return Err(EaseformError::AcceptanceClosed);
    }

    if store.find_response(form_id, device_hash).await?.is_some() {
        return Err(EaseformError::DuplicateConflict);
    }

    store.insert_response(form_id, device_hash, answers).await
}

#[async_trait]
impl SubmissionStore for ScopedClient {
    async fn fetch_form(&self, form_id: Uuid) -> Result<Option<LifecycleFlags>> {
        self.select_one(FORM_TABLE, &[eq("id", form_id)], "id,is_active,closed")
            .await?
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| EaseformError::Storage(format!("malformed form row: {}", e)))
            })
            .transpose()
    }

    async fn find_response(&self, form_id: Uuid, device_hash: &str) -> Result<Option<Uuid>> {
        let row = self
            .select_one(
                RESPONSE_TABLE,
                &[eq("form_id", form_id), eq("device_hash", device_hash)],
                "id",
            )
            .await?;

        Ok(row
            .as_ref()
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()))
    }

    async fn insert_response(
        &self,
        form_id: Uuid,
        device_hash: &str,
        answers: &Map<String, Value>,
    ) -> Result<Uuid> {
        let rows = self
            .insert(
                RESPONSE_TABLE,
                &json!({
                    "form_id": form_id,
                    "device_hash": device_hash,
                    "answers": answers,
                }),
            )
            .await?;

        rows.first()
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| EaseformError::Storage("insert returned no response id".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::device_fingerprint;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryStore {
        forms: HashMap<Uuid, LifecycleFlags>,
        responses: Mutex<Vec<(Uuid, Uuid, String, Map<String, Value>)>>,
    }

    impl MemoryStore {
        fn with_form(form_id: Uuid, closed: bool, is_active: bool) -> Self {
            let mut forms = HashMap::new();
            forms.insert(form_id, LifecycleFlags { is_active, closed });
            Self {
                forms,
                responses: Mutex::new(Vec::new()),
            }
        }

        fn stored(&self) -> Vec<(Uuid, Uuid, String, Map<String, Value>)> {
            self.responses.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SubmissionStore for MemoryStore {
        async fn fetch_form(&self, form_id: Uuid) -> Result<Option<LifecycleFlags>> {
            Ok(self.forms.get(&form_id).copied())
        }

        async fn find_response(&self, form_id: Uuid, device_hash: &str) -> Result<Option<Uuid>> {
            Ok(self
                .responses
                .lock()
                .unwrap()
                .iter()
                .find(|(_, fid, hash, _)| *fid == form_id && hash == device_hash)
                .map(|(id, ..)| *id))
        }

        async fn insert_response(
            &self,
            form_id: Uuid,
            device_hash: &str,
            answers: &Map<String, Value>,
        ) -> Result<Uuid> {
            let id = Uuid::from_u128(self.responses.lock().unwrap().len() as u128 + 1);
            self.responses.lock().unwrap().push((
                id,
                form_id,
                device_hash.to_string(),
                answers.clone(),
            ));
            Ok(id)
        }
    }

    fn answers(value: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("q1".to_string(), Value::String(value.to_string()));
        map
    }

    #[tokio::test]
    async fn test_second_submission_from_same_device_conflicts() {
        let form_id = Uuid::from_u128(7);
        let store = MemoryStore::with_form(form_id, false, true);

        try_submit(&store, form_id, "h1", &answers("yes"))
            .await
            .unwrap();
        let err = try_submit(&store, form_id, "h1", &answers("no"))
            .await
            .unwrap_err();

        assert!(matches!(err, EaseformError::DuplicateConflict));
        let stored = store.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].3, answers("yes"));
    }

    #[tokio::test]
    async fn test_distinct_devices_both_accepted() {
        let form_id = Uuid::from_u128(7);
        let store = MemoryStore::with_form(form_id, false, true);

        try_submit(&store, form_id, "h1", &answers("yes"))
            .await
            .unwrap();
        try_submit(&store, form_id, "h2", &answers("no"))
            .await
            .unwrap();

        assert_eq!(store.stored().len(), 2);
    }

    #[tokio::test]
    async fn test_same_device_on_two_forms_gets_two_fingerprints() {
        let form_a = Uuid::from_u128(1);
        let form_b = Uuid::from_u128(2);
        let mut store = MemoryStore::with_form(form_a, false, true);
        store
            .forms
            .insert(form_b, LifecycleFlags { is_active: true, closed: false });

        let ua = Some("Mozilla/5.0");
        let ip = "203.0.113.7".parse().ok();
        let fp_a = device_fingerprint(ua, ip, form_a);
        let fp_b = device_fingerprint(ua, ip, form_b);
        assert_ne!(fp_a, fp_b);

        try_submit(&store, form_a, &fp_a, &answers("yes"))
            .await
            .unwrap();
        try_submit(&store, form_b, &fp_b, &answers("yes"))
            .await
            .unwrap();

        assert_eq!(store.stored().len(), 2);
    }

    #[tokio::test]
    async fn test_closed_form_rejects_even_when_active() {
        let form_id = Uuid::from_u128(7);
        let store = MemoryStore::with_form(form_id, true, true);

        let err = try_submit(&store, form_id, "h1", &answers("yes"))
            .await
            .unwrap_err();

        assert!(matches!(err, EaseformError::AcceptanceClosed));
        assert!(store.stored().is_empty());
    }

    #[tokio::test]
    async fn test_draft_form_rejects() {
        let form_id = Uuid::from_u128(7);
        let store = MemoryStore::with_form(form_id, false, false);

        let err = try_submit(&store, form_id, "h1", &answers("yes"))
            .await
            .unwrap_err();

        assert!(matches!(err, EaseformError::AcceptanceClosed));
    }

    #[tokio::test]
    async fn test_unknown_form_is_not_found() {
        let store = MemoryStore::with_form(Uuid::from_u128(7), false, true);

        let err = try_submit(&store, Uuid::from_u128(8), "h1", &answers("yes"))
            .await
            .unwrap_err();

        assert!(matches!(err, EaseformError::NotFound(_)));
    }
}

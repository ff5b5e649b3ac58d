//! Public form routes
//!
//! Anonymous reads over the anonymous scoped channel. Closed forms are
//! still returned so the frontend can render a closed-form page; drafts
//! answer exactly like a form that never existed.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{eq, FormRecord, FORM_TABLE};
use crate::routes::json_response;
use crate::server::AppState;
use crate::services::lifecycle;
use crate::types::{EaseformError, Result};

/// GET /public/forms/{id}
pub async fn handle_get_public_form(
    form_id: Uuid,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let row = state
        .public
        .select_one(FORM_TABLE, &[eq("id", form_id)], "*")
        .await?
        .ok_or_else(|| EaseformError::NotFound("Form not found".into()))?;

    let form: FormRecord = serde_json::from_value(row)
        .map_err(|e| EaseformError::Storage(format!("malformed form row: {}", e)))?;

    if !lifecycle::evaluate(&form.lifecycle_flags()).publicly_visible() {
        return Err(EaseformError::NotFound("Form not found".into()));
    }

    Ok(json_response(StatusCode::OK, &form))
}

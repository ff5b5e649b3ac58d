//! Form management routes
//!
//! All owner-scoped operations resolve through the ownership resolver.
//! Anonymous collection and one-per-device dedup are not configurable:
//! the privacy flags are forced server-side on every write, whatever the
//! client sent.

use bytes::Bytes;
use chrono::Utc;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{
    eq, FormListItem, FormRecord, PrivilegedClient, Question, ScopedClient, FORM_TABLE,
};
use crate::hosts;
use crate::routes::{authenticate, json_response, parse_json_body};
use crate::server::AppState;
use crate::services::{require_owned, Resource};
use crate::types::{EaseformError, Result};

const FORM_MISSING: &str = "Form not found or permission denied";

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FormCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct FormUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

// =============================================================================
// Validation and row builders
// =============================================================================

fn validate_title(title: &str) -> Result<()> {
    let length = title.chars().count();
    if length == 0 || length > 200 {
        return Err(EaseformError::BadRequest(
            "Title must be between 1 and 200 characters".into(),
        ));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<()> {
    if description.is_some_and(|d| d.chars().count() > 1000) {
        return Err(EaseformError::BadRequest(
            "Description must be at most 1000 characters".into(),
        ));
    }
    Ok(())
}

/// Row for a form insert. Privacy flags are forced on; `closed` always
/// starts false regardless of client input.
fn new_form_row(host_id: Uuid, body: &FormCreate) -> Value {
    json!({
        "host_id": host_id,
        "title": body.title,
        "description": body.description,
        "questions": body.questions,
        "is_active": body.is_active,
        "anonymous": true,
        "one_response_per_device": true,
        "closed": false,
    })
}

/// Patch for a form update: only provided fields, forced privacy flags,
/// and a fresh `updated_at`. `closed` is never touched here; only the
/// stop operation sets it.
fn update_patch(body: &FormUpdate) -> Value {
    let mut patch = Map::new();
    if let Some(ref title) = body.title {
        patch.insert("title".into(), json!(title));
    }
    if let Some(ref description) = body.description {
        patch.insert("description".into(), json!(description));
    }
    if let Some(ref questions) = body.questions {
        patch.insert("questions".into(), json!(questions));
    }
    if let Some(is_active) = body.is_active {
        patch.insert("is_active".into(), json!(is_active));
    }
    patch.insert("anonymous".into(), json!(true));
    patch.insert("one_response_per_device".into(), json!(true));
    patch.insert("updated_at".into(), json!(Utc::now()));
    Value::Object(patch)
}

/// Patch for the stop operation: the terminal state, nothing else.
/// Re-applying it to an already-closed form rewrites the same values,
/// which is what makes stop idempotent.
fn stop_patch() -> Value {
    json!({
        "closed": true,
        "is_active": false,
    })
}

fn parse_form_row(row: Value) -> Result<FormRecord> {
    serde_json::from_value(row)
        .map_err(|e| EaseformError::Storage(format!("malformed form row: {}", e)))
}

fn first_form(rows: Vec<Value>) -> Result<Option<FormRecord>> {
    rows.into_iter().next().map(parse_form_row).transpose()
}

// =============================================================================
// Channel helpers (scoped / privileged variants of the same operations)
// =============================================================================

pub(crate) async fn fetch_form_scoped(
    client: &ScopedClient,
    form_id: Uuid,
) -> Result<Option<FormRecord>> {
    client
        .select_one(FORM_TABLE, &[eq("id", form_id)], "*")
        .await?
        .map(parse_form_row)
        .transpose()
}

pub(crate) async fn fetch_form_privileged(
    client: &PrivilegedClient,
    form_id: Uuid,
) -> Result<Option<FormRecord>> {
    client
        .select_one(FORM_TABLE, &[eq("id", form_id)], "*")
        .await?
        .map(parse_form_row)
        .transpose()
}

async fn update_form_scoped(
    client: &ScopedClient,
    form_id: Uuid,
    patch: Value,
) -> Result<Option<FormRecord>> {
    first_form(client.update(FORM_TABLE, &[eq("id", form_id)], &patch).await?)
}

async fn update_form_privileged(
    client: &PrivilegedClient,
    form_id: Uuid,
    patch: Value,
) -> Result<Option<FormRecord>> {
    first_form(client.update(FORM_TABLE, &[eq("id", form_id)], &patch).await?)
}

async fn delete_form_scoped(client: &ScopedClient, form_id: Uuid) -> Result<Option<Value>> {
    Ok(client
        .delete(FORM_TABLE, &[eq("id", form_id)])
        .await?
        .into_iter()
        .next())
}

async fn delete_form_privileged(
    client: &PrivilegedClient,
    form_id: Uuid,
) -> Result<Option<Value>> {
    Ok(client
        .delete(FORM_TABLE, &[eq("id", form_id)])
        .await?
        .into_iter()
        .next())
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /forms
///
/// Bootstraps the host profile on first use, then inserts the form on
/// the caller's scoped channel.
pub async fn handle_create_form(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let (principal, scoped) = authenticate(&req, &state)?;
    let body: FormCreate = parse_json_body(req).await?;

    validate_title(&body.title)?;
    validate_description(body.description.as_deref())?;

    hosts::ensure_profile(&state.privileged, &principal).await?;

    info!(host = %principal.id, title = %body.title, "creating form");

    let rows = scoped
        .insert(FORM_TABLE, &new_form_row(principal.id, &body))
        .await?;
    let form = first_form(rows)?
        .ok_or_else(|| EaseformError::Storage("create returned no form row".into()))?;

    Ok(json_response(StatusCode::CREATED, &form))
}

/// GET /forms
pub async fn handle_list_forms(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let (principal, scoped) = authenticate(&req, &state)?;

    let rows = scoped
        .select(
            FORM_TABLE,
            &[eq("host_id", principal.id)],
            "id,title,description,is_active,closed,created_at",
            Some("created_at.desc"),
        )
        .await?;

    let forms: Vec<FormListItem> = rows
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| EaseformError::Storage(format!("malformed form row: {}", e)))
        })
        .collect::<Result<_>>()?;

    Ok(json_response(StatusCode::OK, &forms))
}

/// GET /forms/{id}
pub async fn handle_get_form(
    form_id: Uuid,
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let (principal, scoped) = authenticate(&req, &state)?;

    let outcome = state
        .resolver
        .resolve(
            Resource::Form(form_id),
            &principal,
            fetch_form_scoped(&scoped, form_id),
            |privileged| fetch_form_privileged(privileged, form_id),
        )
        .await?;

    let form = require_owned(outcome, FORM_MISSING)?;
    Ok(json_response(StatusCode::OK, &form))
}

/// PUT /forms/{id}
pub async fn handle_update_form(
    form_id: Uuid,
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let (principal, scoped) = authenticate(&req, &state)?;
    let body: FormUpdate = parse_json_body(req).await?;

    if let Some(ref title) = body.title {
        validate_title(title)?;
    }
    validate_description(body.description.as_deref())?;

    let patch = update_patch(&body);

    let outcome = state
        .resolver
        .resolve(
            Resource::Form(form_id),
            &principal,
            update_form_scoped(&scoped, form_id, patch.clone()),
            move |privileged| update_form_privileged(privileged, form_id, patch),
        )
        .await?;

    let form = require_owned(outcome, FORM_MISSING)?;
    Ok(json_response(StatusCode::OK, &form))
}

/// PATCH /forms/{id}/stop
///
/// One-way: sets `closed = true, is_active = false`. Stopping an
/// already-closed form rewrites the same terminal state and succeeds.
pub async fn handle_stop_form(
    form_id: Uuid,
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let (principal, scoped) = authenticate(&req, &state)?;

    info!(host = %principal.id, form = %form_id, "stopping form");

    let patch = stop_patch();

    let outcome = state
        .resolver
        .resolve(
            Resource::Form(form_id),
            &principal,
            update_form_scoped(&scoped, form_id, patch.clone()),
            move |privileged| update_form_privileged(privileged, form_id, patch),
        )
        .await?;

    let form = require_owned(outcome, FORM_MISSING)?;
    Ok(json_response(StatusCode::OK, &form))
}

/// DELETE /forms/{id}
///
/// Responses go with the form (storage-side cascade).
pub async fn handle_delete_form(
    form_id: Uuid,
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let (principal, scoped) = authenticate(&req, &state)?;

    let outcome = state
        .resolver
        .resolve(
            Resource::Form(form_id),
            &principal,
            delete_form_scoped(&scoped, form_id),
            |privileged| delete_form_privileged(privileged, form_id),
        )
        .await?;

    require_owned(outcome, "Form not found or you don't have permission to delete it")?;

    info!(host = %principal.id, form = %form_id, "form deleted");

    Ok(json_response(
        StatusCode::OK,
        &json!({
            "message": "Form deleted successfully",
            "id": form_id,
        }),
    ))
}

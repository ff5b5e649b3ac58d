//! Response routes
//!
//! Anonymous submission (fingerprint → lifecycle → dedup → insert) and
//! owner-side listing and deletion.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{eq, PrivilegedClient, ScopedClient, RESPONSE_TABLE};
use crate::routes::forms::{fetch_form_privileged, fetch_form_scoped};
use crate::routes::{authenticate, empty_response, json_response, parse_json_body};
use crate::server::AppState;
use crate::services::{device_fingerprint, normalize, require_owned, try_submit, Resource, ResponseView};
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct ResponseSubmit {
    /// Question id → answer value; shape depends on the question type
    pub answers: Map<String, Value>,
}

/// POST /public/forms/{id}/responses
///
/// Public endpoint. One response per device, enforced by fingerprint.
pub async fn handle_submit_response(
    form_id: Uuid,
    req: Request<Incoming>,
    addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let user_agent = req
        .headers()
        .get(hyper::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body: ResponseSubmit = parse_json_body(req).await?;

    let device_hash = device_fingerprint(user_agent.as_deref(), Some(addr.ip()), form_id);
    let response_id = try_submit(&state.public, form_id, &device_hash, &body.answers).await?;

    info!(form = %form_id, response = %response_id, "response accepted");

    Ok(json_response(
        StatusCode::CREATED,
        &json!({
            "message": "Response submitted successfully",
            "response_id": response_id,
        }),
    ))
}

/// GET /forms/{id}/responses
///
/// Ownership of the parent form resolves first; the rows then pass
/// through the projector so callers never see storage-shape drift.
pub async fn handle_list_responses(
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
    require_owned(outcome, "Form not found")?;

    let rows = scoped
        .select(
            RESPONSE_TABLE,
            &[eq("form_id", form_id)],
            "*",
            Some("created_at.desc"),
        )
        .await?;

    let views: Vec<ResponseView> = rows.iter().map(normalize).collect();
    Ok(json_response(StatusCode::OK, &views))
}

async fn delete_response_scoped(
    client: &ScopedClient,
    response_id: Uuid,
) -> Result<Option<Value>> {
    Ok(client
        .delete(RESPONSE_TABLE, &[eq("id", response_id)])
        .await?
        .into_iter()
        .next())
}

async fn delete_response_privileged(
    client: &PrivilegedClient,
    response_id: Uuid,
) -> Result<Option<Value>> {
    Ok(client
        .delete(RESPONSE_TABLE, &[eq("id", response_id)])
        .await?
        .into_iter()
        .next())
}

/// DELETE /responses/{id}
pub async fn handle_delete_response(
    response_id: Uuid,
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let (principal, scoped) = authenticate(&req, &state)?;

    let outcome = state
        .resolver
        .resolve(
            Resource::Response(response_id),
            &principal,
            delete_response_scoped(&scoped, response_id),
            |privileged| delete_response_privileged(privileged, response_id),
        )
        .await?;

    require_owned(
        outcome,
        "Response not found or you don't have permission to delete it",
    )?;

    info!(host = %principal.id, response = %response_id, "response deleted");

    Ok(empty_response(StatusCode::NO_CONTENT))
}

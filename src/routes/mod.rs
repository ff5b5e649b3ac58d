//! HTTP routes for EaseForm

pub mod forms;
pub mod health;
pub mod public_forms;
pub mod responses;

pub use forms::{
    handle_create_form, handle_delete_form, handle_get_form, handle_list_forms, handle_stop_form,
    handle_update_form,
};
pub use health::{health_check, root_check};
pub use public_forms::handle_get_public_form;
pub use responses::{handle_delete_response, handle_list_responses, handle_submit_response};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_token_from_header, Principal};
use crate::db::ScopedClient;
use crate::server::AppState;
use crate::types::{EaseformError, Result};

/// Largest accepted request body; form definitions stay well under this
const MAX_BODY_BYTES: usize = 64 * 1024;

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub(crate) fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| EaseformError::BadRequest(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(EaseformError::BadRequest("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| EaseformError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Resolve the caller's principal and scoped storage channel from the
/// Authorization header. Management endpoints fail with 401 here before
/// touching storage.
pub(crate) fn authenticate(
    req: &Request<Incoming>,
    state: &AppState,
) -> Result<(Principal, ScopedClient)> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = extract_token_from_header(header)
        .ok_or_else(|| EaseformError::Unauthenticated("missing bearer token".into()))?;

    let principal = state.jwt.verify(token)?;
    Ok((principal, state.scoped_for(token)))
}

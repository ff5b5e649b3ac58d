//! Health check endpoints
//!
//! `/` answers liveness for load balancers; `/health` adds environment
//! detail for deployment verification.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::json_response;
use crate::server::AppState;

#[derive(Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handle liveness probe (GET /)
pub fn root_check() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &RootResponse {
            status: "ok",
            service: "EaseForm API",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: String,
    pub storage_configured: bool,
}

/// Handle detailed health check (GET /health)
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "healthy",
            environment: state.args.environment.clone(),
            storage_configured: !state.args.supabase_url.is_empty(),
        },
    )
}

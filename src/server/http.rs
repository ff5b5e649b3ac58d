//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one spawned task per connection. The
//! request boundary here is also the error boundary: every handler
//! failure is translated into the structured JSON error shape, and the
//! CORS and security headers are attached in one place on the way out.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::ORIGIN;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::{PrivilegedClient, ScopedClient};
use crate::routes;
use crate::services::OwnershipResolver;
use crate::types::{EaseformError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub jwt: JwtValidator,
    /// Anonymous scoped channel for the public read and submission paths
    pub public: ScopedClient,
    /// Privileged channel, held for the host-profile bootstrap only
    pub privileged: PrivilegedClient,
    /// Two-tier authorization resolver; owns its own privileged channel
    pub resolver: OwnershipResolver<PrivilegedClient>,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(args: Args) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.request_timeout_ms))
            .build()
            .map_err(|e| {
                EaseformError::Config(format!("failed to build storage client: {}", e))
            })?;

        let jwt = JwtValidator::new(&args.jwt_secret());
        let public = ScopedClient::anonymous(&args, http.clone());
        let privileged = PrivilegedClient::new(&args, http.clone());
        let resolver = OwnershipResolver::new(PrivilegedClient::new(&args, http.clone()));

        Ok(Self {
            args,
            jwt,
            public,
            privileged,
            resolver,
            http,
        })
    }

    /// Scoped channel acting on behalf of the bearer of `token`
    pub fn scoped_for(&self, token: &str) -> ScopedClient {
        ScopedClient::for_token(&self.args, self.http.clone(), token)
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("EaseForm listening on {}", state.args.listen);
    if state.args.is_development() {
        warn!("Development environment - storage error detail exposed in responses");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    info!("[{}] {} {}", addr, method, path);

    let mut response = if method == Method::OPTIONS {
        preflight_response()
    } else {
        match route(Arc::clone(&state), addr, req, &method, &path).await {
            Ok(response) => response,
            Err(err) => error_response(err, &state.args),
        }
    };

    apply_security_headers(response.headers_mut());
    apply_cors_headers(response.headers_mut(), origin.as_deref(), &state.args);

    Ok(response.map(|body| body.map_err(|never| match never {}).boxed()))
}

/// Dispatch one request to its handler
async fn route(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
    method: &Method,
    path: &str,
) -> Result<Response<Full<Bytes>>> {
    // Health endpoints live outside the API prefix
    if method == Method::GET && path == "/" {
        return Ok(routes::root_check());
    }
    if method == Method::GET && path == "/health" {
        return Ok(routes::health_check(state));
    }

    let api_path = path
        .strip_prefix(state.args.api_prefix.as_str())
        .ok_or_else(|| EaseformError::NotFound(format!("No route for {}", path)))?
        .to_string();
    let segments: Vec<&str> = api_path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        (&Method::POST, &["forms"]) => routes::handle_create_form(req, state).await,
        (&Method::GET, &["forms"]) => routes::handle_list_forms(req, state).await,
        (&Method::GET, &["forms", id]) => {
            routes::handle_get_form(parse_uuid(id, "form")?, req, state).await
        }
        (&Method::PUT, &["forms", id]) => {
            routes::handle_update_form(parse_uuid(id, "form")?, req, state).await
        }
        (&Method::PATCH, &["forms", id, "stop"]) => {
            routes::handle_stop_form(parse_uuid(id, "form")?, req, state).await
        }
        (&Method::DELETE, &["forms", id]) => {
            routes::handle_delete_form(parse_uuid(id, "form")?, req, state).await
        }
        (&Method::GET, &["forms", id, "responses"]) => {
            routes::handle_list_responses(parse_uuid(id, "form")?, req, state).await
        }
        (&Method::GET, &["public", "forms", id]) => {
            routes::handle_get_public_form(parse_uuid(id, "form")?, state).await
        }
        (&Method::POST, &["public", "forms", id, "responses"]) => {
            routes::handle_submit_response(parse_uuid(id, "form")?, req, addr, state).await
        }
        (&Method::DELETE, &["responses", id]) => {
            routes::handle_delete_response(parse_uuid(id, "response")?, req, state).await
        }
        _ => Err(EaseformError::NotFound(format!(
            "No route for {} {}",
            method, path
        ))),
    }
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|_| EaseformError::BadRequest(format!("Invalid {} id", what)))
}

/// Translate a handler failure into the structured error body
fn error_response(err: EaseformError, args: &Args) -> Response<Full<Bytes>> {
    let status = err.status_code();

    match &err {
        EaseformError::Storage(_)
        | EaseformError::Internal(_)
        | EaseformError::Bootstrap(_)
        | EaseformError::Config(_) => error!("request failed: {}", err),
        EaseformError::Forbidden(_) => warn!("foreign resource access masked as not-found"),
        _ => info!("request rejected ({}): {}", status, err),
    }

    let body = json!({
        "error": true,
        "message": err.public_message(args.is_development()),
        "status_code": status.as_u16(),
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// CORS preflight response; cached by browsers for an hour
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS, PATCH",
        )
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "3600")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());
    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());
    headers.insert(
        "Content-Security-Policy",
        "default-src 'self' https://*.supabase.co; img-src 'self' data: https://*; \
         font-src 'self' https://fonts.gstatic.com"
            .parse()
            .unwrap(),
    );
    headers.insert(
        "Strict-Transport-Security",
        "max-age=31536000; includeSubDomains".parse().unwrap(),
    );
}

/// Echo the Origin back only when it is on the allow-list
fn apply_cors_headers(headers: &mut HeaderMap, origin: Option<&str>, args: &Args) {
    let Some(origin) = origin.filter(|o| args.origin_allowed(o)) else {
        return;
    };
    let Ok(value) = origin.parse() else {
        return;
    };

    headers.insert("Access-Control-Allow-Origin", value);
    headers.insert("Access-Control-Allow-Credentials", "true".parse().unwrap());
    headers.insert("Vary", "Origin".parse().unwrap());
}

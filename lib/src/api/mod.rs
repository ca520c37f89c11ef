// Copyright (c) 2022-2023 The MobileCoin Foundation

//! HTTP API
//!
//! Device endpoints are mounted twice, under `/api/v1` for the USB device
//! and `/api/v1/emulator` for the emulator, each bound to its own
//! [Gateway]. All responses use the [HttpResponse] envelope.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{Request, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE, HOST, ORIGIN, REFERER},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

use hw_daemon_proto::MessageKind;

use crate::{
    csrf::{CsrfTokens, CSRF_HEADER_NAME},
    dispatch::Resolution,
    gateway::Gateway,
    Error,
};

pub mod handlers;
pub mod requests;

/// Default daemon listen address
pub const DEFAULT_LISTEN: &str = "127.0.0.1:9510";

/// Non-standard status for requests abandoned by the client
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Response envelope, exactly one of `error` or `data` is set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse<T = serde_json::Value> {
    pub error: Option<HttpError>,
    pub data: Option<T>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HttpError {
    pub code: u16,
    pub message: String,
}

/// Build a 200 response carrying `data`
pub fn ok<T: Serialize>(data: T) -> Response {
    Json(HttpResponse {
        error: None,
        data: Some(data),
    })
    .into_response()
}

/// API error, rendered as an [HttpResponse] envelope
#[derive(Clone, Debug, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Create an error, an empty message is replaced by the status reason
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = status.canonical_reason().unwrap_or_default().to_string();
        }

        Self { status, message }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = HttpResponse::<()> {
            error: Some(HttpError {
                code: self.status.as_u16(),
                message: self.message,
            }),
            data: None,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::ClientClosed => {
                let status = StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                    .unwrap_or(StatusCode::BAD_REQUEST);
                return Self::new(status, "Client Closed Request");
            }
            Error::Decode {
                kind: MessageKind::Success,
                ..
            } => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!("Device operation failed: {}", e);

        Self::new(status, e.to_string())
    }
}

/// Marker returned while the device waits on user input
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub request_type: String,
}

impl IntoResponse for Resolution {
    fn into_response(self) -> Response {
        match self {
            Resolution::Complete(p) => ok(p),
            Resolution::Interaction(i) => ok(InteractionRequest {
                request_type: i.to_string(),
            }),
            Resolution::Failure(message) => {
                ApiError::new(StatusCode::CONFLICT, message).into_response()
            }
        }
    }
}

/// HTTP server configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Host (and port) the daemon is reachable at
    pub host: String,
    /// Additional hosts permitted in Host / Origin / Referer headers
    pub host_whitelist: Vec<String>,
    /// Enable Host / Origin / Referer checks
    pub header_check: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LISTEN.to_string(),
            host_whitelist: vec![],
            header_check: true,
        }
    }
}

impl ServerConfig {
    /// Hosts accepted in request headers
    pub fn allowed_hosts(&self) -> Vec<String> {
        let mut hosts = vec![self.host.clone()];

        // Loopback listeners are also reachable as localhost
        if let Some(port) = self.host.strip_prefix("127.0.0.1:") {
            hosts.push(format!("localhost:{port}"));
        }

        hosts.extend(self.host_whitelist.iter().cloned());
        hosts
    }

    fn cors(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .allowed_hosts()
            .iter()
            .filter_map(|h| HeaderValue::from_str(&format!("http://{h}")).ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                ORIGIN,
                ACCEPT,
                CONTENT_TYPE,
                HeaderName::from_static("x-requested-with"),
                HeaderName::from_static("x-csrf-token"),
            ])
    }
}

/// Shared API state
#[derive(Clone)]
pub struct ApiState {
    /// Gateway for the USB device
    pub usb: Gateway,
    /// Gateway for the emulator
    pub emulator: Gateway,
    /// CSRF token service, `None` when CSRF checks are disabled
    pub csrf: Option<Arc<CsrfTokens>>,
}

/// Build the API router
pub fn router(config: ServerConfig, state: ApiState) -> Router {
    let mut app = device_routes("/api/v1", state.usb)
        .merge(device_routes("/api/v1/emulator", state.emulator))
        .merge(
            Router::new()
                .route(
                    "/api/v1/csrf",
                    get(csrf_token).fallback(method_not_allowed),
                )
                .with_state(state.csrf.clone()),
        )
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.csrf, csrf_check));

    let cors = config.cors();
    if config.header_check {
        app = app.layer(middleware::from_fn_with_state(
            Arc::new(config),
            header_check,
        ));
    }

    app.layer(cors).layer(middleware::from_fn(log_request))
}

/// Device endpoints under `prefix`, bound to `gateway`
fn device_routes(prefix: &str, gateway: Gateway) -> Router {
    use handlers::*;

    let p = |path: &str| format!("{prefix}{path}");

    Router::new()
        .route(
            &p("/generateAddresses"),
            post(generate_addresses).fallback(method_not_allowed),
        )
        .route(
            &p("/applySettings"),
            post(apply_settings).fallback(method_not_allowed),
        )
        .route(&p("/backup"), post(backup).fallback(method_not_allowed))
        .route(&p("/cancel"), put(cancel).fallback(method_not_allowed))
        .route(
            &p("/checkMessageSignature"),
            post(check_message_signature).fallback(method_not_allowed),
        )
        .route(&p("/features"), get(features).fallback(method_not_allowed))
        .route(
            &p("/generateMnemonic"),
            post(generate_mnemonic).fallback(method_not_allowed),
        )
        .route(&p("/recovery"), post(recovery).fallback(method_not_allowed))
        .route(
            &p("/setMnemonic"),
            post(set_mnemonic).fallback(method_not_allowed),
        )
        .route(
            &p("/setPinCode"),
            post(set_pin_code).fallback(method_not_allowed),
        )
        .route(
            &p("/signMessage"),
            post(sign_message).fallback(method_not_allowed),
        )
        .route(
            &p("/transactionSign"),
            post(transaction_sign).fallback(method_not_allowed),
        )
        .route(&p("/wipe"), delete(wipe).fallback(method_not_allowed))
        .route(
            &p("/intermediate/pinmatrix"),
            post(pin_matrix).fallback(method_not_allowed),
        )
        .route(
            &p("/intermediate/passphrase"),
            post(passphrase).fallback(method_not_allowed),
        )
        .route(
            &p("/intermediate/word"),
            post(word).fallback(method_not_allowed),
        )
        .with_state(gateway)
}

/// Issue a CSRF token
async fn csrf_token(State(csrf): State<Option<Arc<CsrfTokens>>>) -> Response {
    let csrf = match csrf {
        Some(c) => c,
        None => return ApiError::new(StatusCode::NOT_FOUND, "").into_response(),
    };

    match csrf.issue() {
        Ok(t) => ok(t),
        Err(e) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to create a csrf token: {e}"),
        )
        .into_response(),
    }
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "")
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "")
}

/// Require a valid CSRF token on state-changing requests
async fn csrf_check(
    State(csrf): State<Option<Arc<CsrfTokens>>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(csrf) = csrf {
        if matches!(*req.method(), Method::POST | Method::PUT | Method::DELETE) {
            let token = req
                .headers()
                .get(CSRF_HEADER_NAME)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();

            if let Err(e) = csrf.verify(token) {
                warn!("CSRF check failed for {}: {}", req.uri().path(), e);
                return ApiError::new(StatusCode::FORBIDDEN, e.to_string()).into_response();
            }
        }
    }

    next.run(req).await
}

/// Extract `host[:port]` from an Origin or Referer value
fn url_host(v: &str) -> Option<String> {
    let u = Url::parse(v).ok()?;
    let host = u.host_str()?;

    match u.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

/// Reject requests with unexpected Host, Origin or Referer headers
async fn header_check(State(config): State<Arc<ServerConfig>>, req: Request, next: Next) -> Response {
    let hosts = config.allowed_hosts();
    let allowed = |h: &str| hosts.iter().any(|a| a.eq_ignore_ascii_case(h));

    let host = req.headers().get(HOST).and_then(|v| v.to_str().ok());
    if !host.map(|h| allowed(h)).unwrap_or(false) {
        warn!("Rejecting request with Host: {:?}", host);
        return ApiError::new(StatusCode::FORBIDDEN, "Invalid Host").into_response();
    }

    for (name, message) in [(ORIGIN, "Invalid Origin"), (REFERER, "Invalid Referer")] {
        let v = match req.headers().get(&name) {
            Some(v) => v,
            None => continue,
        };

        if !v
            .to_str()
            .ok()
            .and_then(url_host)
            .map(|h| allowed(&h))
            .unwrap_or(false)
        {
            warn!("Rejecting request with {}: {:?}", name, v);
            return ApiError::new(StatusCode::FORBIDDEN, message).into_response();
        }
    }

    next.run(req).await
}

/// Log request completion with elapsed time
async fn log_request(req: Request, next: Next) -> Response {
    let (method, path) = (req.method().clone(), req.uri().path().to_string());
    let start = Instant::now();

    let resp = next.run(req).await;

    info!(
        "{} {} {} {:?}",
        method,
        path,
        resp.status().as_u16(),
        start.elapsed()
    );

    resp
}

// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP glue for the guard.
//!
//! Thin adapters over the library contracts: a token issuance endpoint, a
//! guard middleware that applies the rate limiter and (for mutating
//! methods) the CSRF verifier, plus health and metrics. The actual board
//! handlers live upstream; here a placeholder route stands in for them.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::csrf::{CsrfStore, CSRF_WIRE_CODE};
use crate::identity::{cookie_value, session_key};
use crate::limiter::RateLimiter;

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub csrf: CsrfStore,
    pub config: Config,
}

/// Machine-readable error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message: message.into(),
            },
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Token issuance response body.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "board-api-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render(),
    )
        .into_response()
}

/// Issue a CSRF token for the caller's session.
///
/// Sets the HttpOnly cookie copy and returns the plaintext value for the
/// header channel. Reissues the same value while the token is unexpired.
pub async fn issue_csrf(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let session = session_key(&headers, &state.config.session_cookie);
    let issued = state.csrf.issue(&session).await;

    let mut response = Json(TokenResponse {
        token: issued.value,
    })
    .into_response();

    match HeaderValue::from_str(&issued.set_cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(_) => {
            // Misconfigured cookie attributes; do not hand out a token the
            // client cannot double-submit.
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("TOKEN_ISSUE_FAILED", "could not set token cookie")),
            )
                .into_response()
        }
    }
}

/// Placeholder for the guarded upstream. In deployment the validated
/// request is forwarded to the board API; here we just acknowledge it.
pub async fn upstream_placeholder(request: Request<Body>) -> Response {
    debug!(
        method = %request.method(),
        path = %request.uri().path(),
        "Request passed the guard"
    );
    (
        StatusCode::OK,
        [("X-Guard-Validated", "true")],
        "Request validated successfully",
    )
        .into_response()
}

/// Guard middleware: rate limit every request, then verify CSRF on
/// mutating methods. Both rejections are terminal; no handler runs after
/// either check fails.
pub async fn guard(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    let peer = peer_ip(&request);
    let headers = request.headers().clone();

    let decision = state.limiter.check(&method, &path, &headers, peer).await;
    if !decision.allowed {
        info!(method = %method, path = %path, "Rejecting rate-limited request");
        return rate_limited_response(&decision);
    }

    if is_mutating(&method) {
        let session = session_key(&headers, &state.config.session_cookie);
        let cookie = cookie_value(&headers, state.csrf.cookie_name());
        let header_token = headers
            .get(state.csrf.header_name())
            .and_then(|v| v.to_str().ok());

        if let Err(e) = state.csrf.verify(cookie, header_token, &session).await {
            info!(
                method = %method,
                path = %path,
                reason = e.reason(),
                "Rejecting request with invalid CSRF token"
            );
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorBody::new(CSRF_WIRE_CODE, e.to_string())),
            )
                .into_response();
        }
    }

    let mut response = next.run(request).await;
    rate_limit_headers(response.headers_mut(), decision.remaining, decision.reset_at_ms);
    response
}

/// Mutating methods require the double-submit token.
fn is_mutating(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH" | "DELETE")
}

fn peer_ip(request: &Request<Body>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn rate_limited_response(decision: &crate::limiter::RateLimitDecision) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody::new(
            "RATE_LIMIT_EXCEEDED",
            "Too many requests, slow down",
        )),
    )
        .into_response();

    rate_limit_headers(response.headers_mut(), decision.remaining, decision.reset_at_ms);
    if let Ok(value) = HeaderValue::from_str(&decision.retry_after.as_secs().to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

fn rate_limit_headers(headers: &mut HeaderMap, remaining: u32, reset_at_ms: i64) {
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&reset_at_ms.to_string()) {
        headers.insert("x-ratelimit-reset", value);
    }
}

/// Build the service router: issuance, health, metrics, and the guarded
/// catch-all standing in for the upstream board API.
pub fn router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::get;

    let mut router = axum::Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/csrf", get(issue_csrf));

    if state.config.metrics.enabled {
        router = router.route(state.config.metrics.path.as_str(), get(metrics));
    }

    router
        .fallback(upstream_placeholder)
        .layer(axum::middleware::from_fn_with_state(state.clone(), guard))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Board API Guard Service
//!
//! Ingress abuse protection for the members board API:
//!
//! - Per-identifier, per-endpoint fixed-window rate limiting (429 +
//!   `X-RateLimit-Remaining` / `X-RateLimit-Reset` / `Retry-After`)
//! - CSRF double-submit verification on every mutating method (403 with
//!   code `CSRF_VALIDATION_FAILED`)
//! - `GET /csrf` token issuance for clients
//!
//! ## Configuration
//!
//! Loaded from an optional JSON file plus environment overrides:
//!
//! - `CONFIG_PATH`: path to a JSON config file
//! - `BIND_ADDR`: server bind address (default: 0.0.0.0:8080)
//! - `SESSION_COOKIE`: session cookie name (default: board-session)
//! - `MAX_TRACKED_ENTRIES`: counter store capacity (default: 10000)
//! - `CSRF_TOKEN_TTL_SECS`: token lifetime (default: 3600)
//! - `CSRF_SECURE_COOKIE`: set the Secure cookie attribute (default: false)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use board_api_guard::{
    config::Config,
    csrf::CsrfStore,
    handlers::{router, AppState},
    limiter::RateLimiter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config()?;
    info!(
        bind_addr = %config.bind_addr,
        max_tracked_entries = config.rate_limit.max_entries,
        policies = config.rate_limit.policies.len(),
        csrf_token_ttl_secs = config.csrf.token_ttl_secs,
        "Starting board API guard"
    );

    // Create application state
    let limiter = RateLimiter::new(&config);
    let csrf = CsrfStore::new(config.csrf.clone());

    let state = Arc::new(AppState {
        limiter,
        csrf,
        config: config.clone(),
    });

    // Spawn TTL sweep task
    let sweep_state = state.clone();
    let sweep_interval = config.rate_limit.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            sweep_state.limiter.sweep().await;
            sweep_state.csrf.remove_expired().await;
        }
    });

    // Build router and start server
    let app = router(state);
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration: JSON file if `CONFIG_PATH` is set, then environment
/// overrides on top.
fn load_config() -> anyhow::Result<Config> {
    let mut config = match std::env::var("CONFIG_PATH") {
        Ok(path) => {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        }
        Err(_) => Config::default(),
    };

    if let Ok(addr) = std::env::var("BIND_ADDR") {
        config.bind_addr = addr;
    }
    if let Ok(cookie) = std::env::var("SESSION_COOKIE") {
        config.session_cookie = cookie;
    }
    if let Some(max) = env_parse("MAX_TRACKED_ENTRIES") {
        config.rate_limit.max_entries = max;
    }
    if let Some(ttl) = env_parse("CSRF_TOKEN_TTL_SECS") {
        config.csrf.token_ttl_secs = ttl;
    }
    if let Some(secure) = env_parse("CSRF_SECURE_COOKIE") {
        config.csrf.secure_cookie = secure;
    }

    Ok(config)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

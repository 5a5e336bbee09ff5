// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the board API guard.
//!
//! Default policy values mirror the limits the board API enforces on its
//! mutating endpoints. Everything can be overridden via a JSON config file
//! or the environment variables read in `main.rs`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Name of the session cookie used for identity fingerprinting
    /// and CSRF session binding (default: board-session)
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CSRF token configuration
    #[serde(default)]
    pub csrf: CsrfConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Hard cap on tracked (identifier, endpoint) entries; LRU eviction
    /// beyond this (default: 10000)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Interval between TTL sweeps of expired windows in seconds
    /// (default: 60)
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,

    /// Fallback policy for endpoints without an explicit entry
    #[serde(default)]
    pub default_policy: PolicyConfig,

    /// Ordered per-endpoint policy table; first wildcard match wins
    #[serde(default = "default_policies")]
    pub policies: Vec<PolicyEntryConfig>,
}

/// A single window/limit pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Maximum requests per window
    pub max_requests: u32,
}

/// One endpoint policy. `path` segments written as `:name` match any
/// single segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEntryConfig {
    pub method: String,
    pub path: String,
    pub window_ms: u64,
    pub max_requests: u32,
}

/// CSRF token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfConfig {
    /// Cookie carrying the server copy of the token (default: csrf-token)
    #[serde(default = "default_csrf_cookie")]
    pub cookie_name: String,

    /// Header carrying the client copy of the token (default: x-csrf-token)
    #[serde(default = "default_csrf_header")]
    pub header_name: String,

    /// Token lifetime in seconds (default: 3600)
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Mark the cookie Secure; enable behind HTTPS (default: false)
    #[serde(default)]
    pub secure_cookie: bool,

    /// SameSite attribute for the token cookie (default: Lax)
    #[serde(default = "default_same_site")]
    pub same_site: String,

    /// Hard cap on concurrently tracked tokens (default: 10000)
    #[serde(default = "default_max_entries")]
    pub max_tokens: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_session_cookie() -> String {
    "board-session".to_string()
}

fn default_max_entries() -> usize {
    10_000
}

fn default_sweep_secs() -> u64 {
    60
}

fn default_csrf_cookie() -> String {
    "csrf-token".to_string()
}

fn default_csrf_header() -> String {
    "x-csrf-token".to_string()
}

fn default_token_ttl_secs() -> u64 {
    3600
}

fn default_same_site() -> String {
    "Lax".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_policies() -> Vec<PolicyEntryConfig> {
    // Limits the board API applies to its endpoints. Auth endpoints are
    // strict; content mutation is moderate; reads of shared resources get
    // a looser per-minute cap.
    [
        ("GET", "/csrf", 60_000, 30),
        ("POST", "/api/posts", 60_000, 10),
        ("PUT", "/api/posts/:id", 60_000, 10),
        ("DELETE", "/api/posts/:id", 60_000, 5),
        ("POST", "/api/posts/:id/like", 60_000, 30),
        ("POST", "/api/posts/:id/comments", 60_000, 10),
        ("POST", "/api/follow/:userId", 60_000, 20),
        ("POST", "/api/auth/register", 900_000, 5),
        ("POST", "/api/auth/resend", 600_000, 3),
        ("GET", "/api/search", 60_000, 30),
    ]
    .into_iter()
    .map(|(method, path, window_ms, max_requests)| PolicyEntryConfig {
        method: method.to_string(),
        path: path.to_string(),
        window_ms,
        max_requests,
    })
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            session_cookie: default_session_cookie(),
            rate_limit: RateLimitConfig::default(),
            csrf: CsrfConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_secs(),
            default_policy: PolicyConfig::default(),
            policies: default_policies(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 100,
        }
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_csrf_cookie(),
            header_name: default_csrf_header(),
            token_ttl_secs: default_token_ttl_secs(),
            secure_cookie: false,
            same_site: default_same_site(),
            max_tokens: default_max_entries(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl PolicyConfig {
    /// Get the window as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl CsrfConfig {
    /// Get the token lifetime as a `Duration`.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

impl RateLimitConfig {
    /// Get the sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

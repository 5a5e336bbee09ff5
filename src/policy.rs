// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Endpoint rate-limit policy table.
//!
//! Maps `(method, path)` to a [`RateLimitPolicy`]: exact match first, then
//! wildcard patterns in insertion order, then the default policy. Patterns
//! are matched segment-by-segment — a `:name` segment matches any single
//! path segment — so no regular expressions are built per lookup.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::RateLimitConfig;

/// Immutable window/limit pair an endpoint resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Maximum requests per window
    pub max_requests: u32,
}

impl RateLimitPolicy {
    /// Get the window as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// A configured pattern entry with at least one wildcard segment.
#[derive(Debug, Clone)]
struct WildcardEntry {
    method: String,
    segments: Vec<String>,
    policy: RateLimitPolicy,
}

/// Static policy table, built once at startup.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    /// Exact lookups keyed by `METHOD:path`
    exact: HashMap<String, RateLimitPolicy>,
    /// Wildcard entries in configuration (insertion) order
    wildcards: Vec<WildcardEntry>,
    default_policy: RateLimitPolicy,
}

impl PolicyTable {
    /// Build the table from configuration. Order of configured entries is
    /// preserved for wildcard matching.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let mut exact = HashMap::new();
        let mut wildcards = Vec::new();

        for entry in &config.policies {
            let method = entry.method.to_uppercase();
            let policy = RateLimitPolicy {
                window_ms: entry.window_ms,
                max_requests: entry.max_requests,
            };

            if entry.path.split('/').any(|s| s.starts_with(':')) {
                wildcards.push(WildcardEntry {
                    method,
                    segments: entry.path.split('/').map(str::to_string).collect(),
                    policy,
                });
            } else {
                exact.insert(format!("{}:{}", method, entry.path), policy);
            }
        }

        Self {
            exact,
            wildcards,
            default_policy: RateLimitPolicy {
                window_ms: config.default_policy.window_ms,
                max_requests: config.default_policy.max_requests,
            },
        }
    }

    /// Resolve the policy for a request. Every request resolves to exactly
    /// one policy; unknown methods and unlisted paths get the default.
    pub fn resolve(&self, method: &str, path: &str) -> RateLimitPolicy {
        let method = method.to_uppercase();

        if let Some(policy) = self.exact.get(&format!("{}:{}", method, path)) {
            return *policy;
        }

        let segments: Vec<&str> = path.split('/').collect();
        for entry in &self.wildcards {
            if entry.method == method && segments_match(&entry.segments, &segments) {
                return entry.policy;
            }
        }

        self.default_policy
    }

    /// The fallback policy.
    pub fn default_policy(&self) -> RateLimitPolicy {
        self.default_policy
    }
}

/// Segment-wise comparison; a `:name` pattern segment matches anything.
fn segments_match(pattern: &[String], path: &[&str]) -> bool {
    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(path)
            .all(|(p, s)| p.starts_with(':') || p == s)
}

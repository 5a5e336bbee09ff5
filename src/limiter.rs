// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-endpoint rate limiter.
//!
//! Composes identity extraction, policy resolution, and the bounded window
//! counter store into a single `check` answering "is this request allowed
//! right now". An internal store failure fails closed — a broken limiter
//! must not become an open gate — which is the opposite of the client-side
//! token path, where failures surface to the caller after retries.

use axum::http::HeaderMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::identity::IdentityExtractor;
use crate::policy::{PolicyTable, RateLimitPolicy};
use crate::store::WindowCounterStore;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Quota left in the current window
    pub remaining: u32,
    /// When the window resets, as epoch milliseconds
    pub reset_at_ms: i64,
    /// The resolved per-window limit
    pub limit: u32,
    /// Time until the window resets
    pub retry_after: Duration,
}

/// The request-facing rate limiter.
pub struct RateLimiter {
    extractor: IdentityExtractor,
    policies: PolicyTable,
    store: WindowCounterStore,
}

impl RateLimiter {
    /// Build a limiter from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            extractor: IdentityExtractor::new(config.session_cookie.clone()),
            policies: PolicyTable::from_config(&config.rate_limit),
            store: WindowCounterStore::new(config.rate_limit.max_entries),
        }
    }

    /// Check whether a request is allowed right now, counting it.
    pub async fn check(
        &self,
        method: &str,
        path: &str,
        headers: &HeaderMap,
        peer: Option<IpAddr>,
    ) -> RateLimitDecision {
        crate::metrics::CHECKS_TOTAL.inc();

        let identifier = self.extractor.extract(headers, peer);
        let policy = self.policies.resolve(method, path);
        let key = composite_key(&identifier, method, path);

        let observation = match self.store.increment(&key, policy.window()).await {
            Ok(obs) => obs,
            Err(e) => {
                // Fail closed: deny rather than wave traffic through a
                // broken limiter.
                error!(key = %key, error = %e, "Counter store failure, denying request");
                crate::metrics::LIMITED_TOTAL.inc();
                return denied_now(policy);
            }
        };

        let allowed = observation.count <= policy.max_requests;
        let remaining = policy.max_requests.saturating_sub(observation.count);
        let retry_after = observation
            .reset_at
            .saturating_duration_since(Instant::now());

        if allowed {
            debug!(key = %key, remaining, "Request allowed");
        } else {
            crate::metrics::LIMITED_TOTAL.inc();
            info!(
                key = %key,
                limit = policy.max_requests,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
        }

        RateLimitDecision {
            allowed,
            remaining,
            reset_at_ms: epoch_ms_after(retry_after),
            limit: policy.max_requests,
            retry_after,
        }
    }

    /// Remove all counters for an identifier (manual unblock, test
    /// teardown). Returns the number of entries removed.
    pub async fn reset(&self, identifier: &str) -> usize {
        self.store.remove_prefix(&format!("{}:", identifier)).await
    }

    /// Wipe every counter.
    pub async fn clear(&self) {
        self.store.clear().await;
    }

    /// Drop lapsed windows; called from the periodic sweep task.
    pub async fn sweep(&self) -> usize {
        self.store.remove_expired().await
    }

    /// Number of tracked (identifier, endpoint) keys.
    pub async fn tracked_keys(&self) -> usize {
        self.store.len().await
    }
}

fn composite_key(identifier: &str, method: &str, path: &str) -> String {
    format!("{}:{}:{}", identifier, method.to_uppercase(), path)
}

fn denied_now(policy: RateLimitPolicy) -> RateLimitDecision {
    RateLimitDecision {
        allowed: false,
        remaining: 0,
        reset_at_ms: epoch_ms_after(policy.window()),
        limit: policy.max_requests,
        retry_after: policy.window(),
    }
}

/// Epoch milliseconds `after` from now, for the wire contract.
fn epoch_ms_after(after: Duration) -> i64 {
    chrono::Utc::now().timestamp_millis() + after.as_millis() as i64
}

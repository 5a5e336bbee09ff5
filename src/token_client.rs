// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client-side CSRF token manager.
//!
//! Guarantees that a valid token is available before any mutating call
//! fires, without duplicating acquisitions under concurrent callers:
//!
//! - a cached token is returned until its client-side TTL lapses
//! - at most one acquisition is in flight at a time; concurrent callers
//!   await the same shared future and observe the same outcome
//! - a failed acquisition is retried with exponential backoff before the
//!   error surfaces to every waiter
//!
//! The manager is an explicitly constructed component — callers hold it in
//! an `Arc` and pass it where needed; there is no process-global instance.
//! The retry loop carries no external cancellation; a caller that goes away
//! mid-retry leaves the flight to finish on its own. Known limitation.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Token acquisition failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcquireError {
    /// The token endpoint could not be reached or answered non-2xx
    #[error("Token request failed: {0}")]
    Request(String),

    /// The token endpoint answered with an unusable body
    #[error("Malformed token response: {0}")]
    BadResponse(String),

    /// Every attempt failed; surfaced to all waiters of the flight
    #[error("Token acquisition failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Where tokens come from. The production implementation is
/// [`HttpTokenSource`]; tests script their own.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    /// Fetch a fresh token. One network round trip, no retries here.
    async fn fetch(&self) -> Result<String, AcquireError>;
}

/// Retry behavior for a single acquisition flight.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt (default: 3)
    pub max_retries: u32,
    /// First backoff delay, doubled per retry (default: 2s)
    pub base_delay: Duration,
    /// Backoff cap (default: 30s)
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Manager tuning.
#[derive(Debug, Clone)]
pub struct TokenClientConfig {
    /// Client-side token lifetime; the wire format carries only the token
    /// string, so expiry is decided here (default: 1h)
    pub token_ttl: Duration,
    pub retry: RetryConfig,
}

impl Default for TokenClientConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(3600),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

type Flight = Shared<BoxFuture<'static, Result<String, AcquireError>>>;

#[derive(Default)]
struct ManagerState {
    cached: Option<CachedToken>,
    in_flight: Option<Flight>,
    /// Bumped on refresh/reset so a superseded flight cannot clobber
    /// newer state when it completes
    generation: u64,
}

struct ManagerInner {
    source: Arc<dyn TokenSource>,
    config: TokenClientConfig,
    state: Mutex<ManagerState>,
}

/// Single-flight, retrying, expiring cache around token acquisition.
#[derive(Clone)]
pub struct CsrfTokenManager {
    inner: Arc<ManagerInner>,
}

impl CsrfTokenManager {
    /// Create a manager over the given source.
    pub fn new(source: Arc<dyn TokenSource>, config: TokenClientConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                source,
                config,
                state: Mutex::new(ManagerState::default()),
            }),
        }
    }

    /// Return a valid token, acquiring one if needed.
    ///
    /// Concurrent callers while no token is cached share one acquisition
    /// and resolve to the same value (or the same error).
    pub async fn ensure_token(&self) -> Result<String, AcquireError> {
        let flight = {
            let mut state = self.inner.state.lock().await;

            if let Some(cached) = &state.cached {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.value.clone());
                }
            }

            match &state.in_flight {
                Some(flight) => flight.clone(),
                None => {
                    let flight = start_flight(self.inner.clone(), state.generation);
                    state.in_flight = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Invalidate the cache and any in-flight acquisition, then acquire a
    /// fresh token. Used to self-heal after a verified 403 from the server.
    pub async fn refresh_token(&self) -> Result<String, AcquireError> {
        {
            let mut state = self.inner.state.lock().await;
            state.cached = None;
            state.in_flight = None;
            state.generation += 1;
        }
        self.ensure_token().await
    }

    /// The cached token, if present and unexpired.
    pub async fn current_token(&self) -> Option<String> {
        let state = self.inner.state.lock().await;
        state
            .cached
            .as_ref()
            .filter(|c| Instant::now() < c.expires_at)
            .map(|c| c.value.clone())
    }

    /// Seed the cache with an externally obtained token (e.g. one embedded
    /// in the initial page), skipping the first acquisition.
    pub async fn set_token(&self, value: impl Into<String>) {
        let mut state = self.inner.state.lock().await;
        state.cached = Some(CachedToken {
            value: value.into(),
            expires_at: Instant::now() + self.inner.config.token_ttl,
        });
    }

    /// Drop all cached and in-flight state. Test hook.
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        state.cached = None;
        state.in_flight = None;
        state.generation += 1;
    }
}

/// Build the shared acquisition future for one flight.
fn start_flight(inner: Arc<ManagerInner>, generation: u64) -> Flight {
    async move {
        let result = acquire_with_retry(inner.source.as_ref(), &inner.config.retry).await;

        let mut state = inner.state.lock().await;
        if state.generation == generation {
            state.in_flight = None;
            if let Ok(value) = &result {
                state.cached = Some(CachedToken {
                    value: value.clone(),
                    expires_at: Instant::now() + inner.config.token_ttl,
                });
            }
        }
        result
    }
    .boxed()
    .shared()
}

/// One acquisition flight: initial attempt plus bounded exponential-backoff
/// retries. Never loops forever.
async fn acquire_with_retry(
    source: &dyn TokenSource,
    retry: &RetryConfig,
) -> Result<String, AcquireError> {
    let mut delay = retry.base_delay;
    let mut last = String::new();

    for attempt in 0..=retry.max_retries {
        if attempt > 0 {
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(retry.max_delay);
        }

        match source.fetch().await {
            Ok(value) => {
                debug!(attempt, "CSRF token acquired");
                return Ok(value);
            }
            Err(e) => {
                warn!(attempt, error = %e, "CSRF token acquisition attempt failed");
                last = e.to_string();
            }
        }
    }

    Err(AcquireError::Exhausted {
        attempts: retry.max_retries + 1,
        last,
    })
}

/// Fetches tokens from the guard's `GET /csrf` endpoint.
pub struct HttpTokenSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTokenSource {
    /// Create a source targeting `endpoint` (e.g. `https://host/csrf`).
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

/// Wire shape of the issuance response.
#[derive(Debug, serde::Deserialize)]
struct TokenBody {
    token: String,
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch(&self) -> Result<String, AcquireError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| AcquireError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Request(format!(
                "token endpoint answered {}",
                status
            )));
        }

        let body: TokenBody = response
            .json()
            .await
            .map_err(|e| AcquireError::BadResponse(e.to_string()))?;

        if body.token.is_empty() {
            return Err(AcquireError::BadResponse("empty token".to_string()));
        }
        Ok(body.token)
    }
}

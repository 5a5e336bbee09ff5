// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Server-side CSRF token store and verifier.
//!
//! Implements the double-submit cookie pattern: the token is set in an
//! HttpOnly cookie and the same value must arrive in a request header on
//! every mutating call. An attacker who cannot read cookies cross-origin
//! cannot forge the matching header.
//!
//! Verification is a pure read — tokens are reusable until expiry, not
//! single-use. Issuing for a session that already holds an unexpired token
//! returns that token rather than rotating it.

use rand::RngCore;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::CsrfConfig;

/// Bytes of entropy per token (hex-encoded on the wire).
const TOKEN_BYTES: usize = 32;

/// Stable machine-readable code surfaced with every CSRF rejection.
pub const CSRF_WIRE_CODE: &str = "CSRF_VALIDATION_FAILED";

/// CSRF verification failures. All map to HTTP 403 with [`CSRF_WIRE_CODE`],
/// distinct from 401 (authentication) and 429 (rate limiting).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsrfError {
    #[error("CSRF cookie missing")]
    MissingCookie,

    #[error("CSRF header missing")]
    MissingHeader,

    #[error("CSRF token mismatch between cookie and header")]
    Mismatch,

    #[error("CSRF token expired")]
    Expired,

    #[error("CSRF token not bound to this session")]
    SessionMismatch,
}

impl CsrfError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CsrfError::MissingCookie => "missing_cookie",
            CsrfError::MissingHeader => "missing_header",
            CsrfError::Mismatch => "mismatch",
            CsrfError::Expired => "expired",
            CsrfError::SessionMismatch => "session_mismatch",
        }
    }
}

/// A token issued to one session.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Plaintext token value for the non-cookie channel
    pub value: String,
    /// Ready-made Set-Cookie header value for the cookie channel
    pub set_cookie: String,
}

#[derive(Debug, Clone)]
struct TokenRecord {
    value: String,
    expires_at: Instant,
}

/// In-memory token store keyed by session fragment.
pub struct CsrfStore {
    config: CsrfConfig,
    tokens: Mutex<HashMap<String, TokenRecord>>,
}

impl CsrfStore {
    /// Create a store with the given configuration.
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// The header the client copy must arrive in.
    pub fn header_name(&self) -> &str {
        &self.config.header_name
    }

    /// The cookie the server copy is set in.
    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Issue a token bound to `session`. A session holding an unexpired
    /// token gets the same value back; otherwise a fresh high-entropy token
    /// is generated.
    pub async fn issue(&self, session: &str) -> IssuedToken {
        let now = Instant::now();
        let mut tokens = self.tokens.lock().await;

        if let Some(record) = tokens.get(session) {
            if now < record.expires_at {
                return self.issued(record.value.clone());
            }
        }

        if tokens.len() >= self.config.max_tokens {
            evict_soonest_expiry(&mut tokens);
        }

        let value = generate_token();
        debug!(session = %session, "Issued new CSRF token");
        crate::metrics::CSRF_ISSUED.inc();
        tokens.insert(
            session.to_string(),
            TokenRecord {
                value: value.clone(),
                expires_at: now + self.config.token_ttl(),
            },
        );

        self.issued(value)
    }

    /// Verify the double-submit pair for `session`.
    ///
    /// Valid iff both copies are present, non-empty, byte-equal, the token
    /// is bound to this session, and its expiry has not elapsed. Does not
    /// consume the token.
    pub async fn verify(
        &self,
        cookie: Option<&str>,
        header: Option<&str>,
        session: &str,
    ) -> Result<(), CsrfError> {
        let result = self.verify_inner(cookie, header, session).await;
        let outcome = match &result {
            Ok(()) => "ok",
            Err(e) => e.reason(),
        };
        crate::metrics::CSRF_VERIFICATIONS
            .with_label_values(&[outcome])
            .inc();
        result
    }

    async fn verify_inner(
        &self,
        cookie: Option<&str>,
        header: Option<&str>,
        session: &str,
    ) -> Result<(), CsrfError> {
        let cookie = cookie.filter(|v| !v.is_empty()).ok_or(CsrfError::MissingCookie)?;
        let header = header.filter(|v| !v.is_empty()).ok_or(CsrfError::MissingHeader)?;

        if !constant_time_eq(cookie.as_bytes(), header.as_bytes()) {
            return Err(CsrfError::Mismatch);
        }

        let tokens = self.tokens.lock().await;
        let record = tokens.get(session).ok_or(CsrfError::Expired)?;

        if !constant_time_eq(record.value.as_bytes(), cookie.as_bytes()) {
            return Err(CsrfError::SessionMismatch);
        }
        if Instant::now() >= record.expires_at {
            return Err(CsrfError::Expired);
        }

        Ok(())
    }

    /// Drop expired tokens; called from the periodic sweep task.
    pub async fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, r| now < r.expires_at);
        before - tokens.len()
    }

    /// Number of tracked tokens.
    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    /// Whether no tokens are tracked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn issued(&self, value: String) -> IssuedToken {
        let set_cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite={}{}",
            self.config.cookie_name,
            value,
            self.config.token_ttl_secs,
            self.config.same_site,
            if self.config.secure_cookie {
                "; Secure"
            } else {
                ""
            }
        );
        IssuedToken { value, set_cookie }
    }
}

/// Generate a fresh hex-encoded token with [`TOKEN_BYTES`] of entropy.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Byte comparison that does not short-circuit on the first difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Drop the record closest to expiry to make room for a new one.
fn evict_soonest_expiry(tokens: &mut HashMap<String, TokenRecord>) {
    if let Some(session) = tokens
        .iter()
        .min_by_key(|(_, r)| r.expires_at)
        .map(|(s, _)| s.clone())
    {
        tokens.remove(&session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store() -> CsrfStore {
        CsrfStore::new(CsrfConfig::default())
    }

    #[tokio::test]
    async fn test_issue_generates_high_entropy_token() {
        let store = store();

        let issued = store.issue("sess-a").await;
        assert_eq!(issued.value.len(), TOKEN_BYTES * 2);
        assert!(issued.set_cookie.starts_with("csrf-token="));
        assert!(issued.set_cookie.contains("HttpOnly"));
        assert!(issued.set_cookie.contains("SameSite=Lax"));
    }

    #[tokio::test]
    async fn test_issue_is_stable_within_ttl() {
        let store = store();

        let first = store.issue("sess-a").await;
        let second = store.issue("sess-a").await;
        assert_eq!(first.value, second.value);

        let other = store.issue("sess-b").await;
        assert_ne!(first.value, other.value);
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_rotates_after_expiry() {
        let store = store();

        let first = store.issue("sess-a").await;
        tokio::time::advance(Duration::from_secs(3601)).await;
        let second = store.issue("sess-a").await;

        assert_ne!(first.value, second.value);
    }

    #[tokio::test]
    async fn test_matching_pair_verifies() {
        let store = store();
        let issued = store.issue("sess-a").await;

        let result = store
            .verify(Some(&issued.value), Some(&issued.value), "sess-a")
            .await;
        assert_eq!(result, Ok(()));

        // Pure read: still valid afterwards
        let again = store
            .verify(Some(&issued.value), Some(&issued.value), "sess-a")
            .await;
        assert_eq!(again, Ok(()));
    }

    #[tokio::test]
    async fn test_missing_copies_are_distinct_failures() {
        let store = store();
        let issued = store.issue("sess-a").await;

        assert_eq!(
            store.verify(None, Some(&issued.value), "sess-a").await,
            Err(CsrfError::MissingCookie)
        );
        assert_eq!(
            store.verify(Some(&issued.value), None, "sess-a").await,
            Err(CsrfError::MissingHeader)
        );
        assert_eq!(
            store.verify(Some(""), Some(&issued.value), "sess-a").await,
            Err(CsrfError::MissingCookie)
        );
    }

    #[tokio::test]
    async fn test_mismatched_pair_fails() {
        let store = store();
        let issued = store.issue("sess-a").await;

        let result = store
            .verify(Some(&issued.value), Some("forged-value"), "sess-a")
            .await;
        assert_eq!(result, Err(CsrfError::Mismatch));
    }

    #[tokio::test]
    async fn test_token_from_other_session_fails() {
        let store = store();
        let issued = store.issue("sess-a").await;
        store.issue("sess-b").await;

        let result = store
            .verify(Some(&issued.value), Some(&issued.value), "sess-b")
            .await;
        assert_eq!(result, Err(CsrfError::SessionMismatch));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_token_fails() {
        let store = store();
        let issued = store.issue("sess-a").await;

        tokio::time::advance(Duration::from_secs(3601)).await;

        let result = store
            .verify(Some(&issued.value), Some(&issued.value), "sess-a")
            .await;
        assert_eq!(result, Err(CsrfError::Expired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_tokens() {
        let store = store();
        store.issue("sess-a").await;

        tokio::time::advance(Duration::from_secs(3601)).await;
        store.issue("sess-b").await;

        let removed = store.remove_expired().await;
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let mut config = CsrfConfig::default();
        config.max_tokens = 5;
        let store = CsrfStore::new(config);

        for i in 0..20 {
            store.issue(&format!("sess-{}", i)).await;
        }
        assert!(store.len().await <= 5);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}

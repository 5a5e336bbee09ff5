// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client identifier extraction.
//!
//! Derives a stable composite identifier for a caller from connection
//! metadata: forwarded address headers first, then the transport peer
//! address, then a constant fallback; combined with a short non-reversible
//! fragment of the session cookie. Extraction never fails — callers with no
//! usable signal all share the `unknown:anonymous` identifier, which is a
//! documented degradation, not an error.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::net::IpAddr;

/// Length of the hex session fragment appended to the address.
const SESSION_FRAGMENT_LEN: usize = 8;

/// Extracts a composite client identifier from request metadata.
#[derive(Debug, Clone)]
pub struct IdentityExtractor {
    session_cookie: String,
}

impl IdentityExtractor {
    /// Create an extractor reading the given session cookie name.
    pub fn new(session_cookie: impl Into<String>) -> Self {
        Self {
            session_cookie: session_cookie.into(),
        }
    }

    /// Build the composite identifier `address:session-fragment`.
    pub fn extract(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> String {
        let address = client_address(headers, peer);
        let fragment = cookie_value(headers, &self.session_cookie)
            .map(session_fragment)
            .unwrap_or_else(|| "anonymous".to_string());
        format!("{}:{}", address, fragment)
    }
}

/// Resolve the client address: x-forwarded-for (first hop), then
/// x-real-ip, then the transport peer, then "unknown".
fn client_address(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = header_str(headers, "x-real-ip") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    match peer {
        Some(ip) => ip.to_string(),
        None => "unknown".to_string(),
    }
}

/// Session key for CSRF binding: the same non-reversible fragment used in
/// the composite identifier, or `"anonymous"` when no session cookie is
/// present.
pub fn session_key(headers: &HeaderMap, session_cookie: &str) -> String {
    cookie_value(headers, session_cookie)
        .map(session_fragment)
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Short non-reversible fragment of the session cookie value.
fn session_fragment(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest)[..SESSION_FRAGMENT_LEN].to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Find a cookie value in the Cookie header.
pub(crate) fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let raw = header_str(headers, "cookie")?;
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

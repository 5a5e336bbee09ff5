// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for abuse simulation.

use axum::http::HeaderMap;

/// Generate a pool of client IP strings in the 10.x.x.x range.
pub fn generate_ips(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            format!("10.{}.{}.{}", a, b, c)
        })
        .collect()
}

/// Generate a pool of session cookie values.
pub fn generate_sessions(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("session-{:08x}", i)).collect()
}

/// Generate forged token values an attacker might try: empty, truncated,
/// wrong-length, and plausible-looking hex that was never issued.
pub fn generate_forged_tokens() -> Vec<&'static str> {
    vec![
        "",
        "deadbeef",
        "0000000000000000000000000000000000000000000000000000000000000000",
        "not-hex-at-all-but-64-chars-long-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
    ]
}

/// Build request headers for a simulated client. `session` and `csrf`
/// land in the Cookie header; `csrf_header` in x-csrf-token.
pub fn request_headers(
    ip: &str,
    session: Option<&str>,
    csrf_cookie: Option<&str>,
    csrf_header: Option<&str>,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", ip.parse().unwrap());

    let mut cookies = Vec::new();
    if let Some(session) = session {
        cookies.push(format!("board-session={}", session));
    }
    if let Some(token) = csrf_cookie {
        cookies.push(format!("csrf-token={}", token));
    }
    if !cookies.is_empty() {
        headers.insert("cookie", cookies.join("; ").parse().unwrap());
    }

    if let Some(token) = csrf_header {
        headers.insert("x-csrf-token", token.parse().unwrap());
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ips_are_unique() {
        let ips = generate_ips(512);
        assert_eq!(ips.len(), 512);
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 512);
    }

    #[test]
    fn test_request_headers_combine_cookies() {
        let headers = request_headers("10.0.0.1", Some("abc"), Some("tok"), None);
        let cookie = headers.get("cookie").unwrap().to_str().unwrap();
        assert_eq!(cookie, "board-session=abc; csrf-token=tok");
    }
}

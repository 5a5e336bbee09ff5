// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the guard.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

/// Rate limit checks performed.
pub static CHECKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("guard_rate_limit_checks_total", "Rate limit checks performed").unwrap()
});

/// Requests denied by the rate limiter.
pub static LIMITED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "guard_rate_limited_total",
        "Requests denied by the rate limiter"
    )
    .unwrap()
});

/// LRU evictions from the counter store.
pub static STORE_EVICTIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "guard_store_evictions_total",
        "LRU evictions from the counter store"
    )
    .unwrap()
});

/// CSRF tokens issued.
pub static CSRF_ISSUED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("guard_csrf_tokens_issued_total", "CSRF tokens issued").unwrap()
});

/// CSRF verification outcomes, labelled by result.
pub static CSRF_VERIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "guard_csrf_verifications_total",
        "CSRF verification outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Render the default registry in the Prometheus text format.
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder
        .encode(&prometheus::gather(), &mut buffer)
        .is_err()
    {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

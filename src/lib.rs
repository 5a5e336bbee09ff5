// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Board API Guard
//!
//! This crate provides the request abuse protection layer that gates every
//! mutating call to the members board API:
//!
//! - Per-identifier, per-endpoint fixed-window rate limiting with a bounded
//!   (LRU + TTL) in-memory counter store
//! - CSRF protection via the double-submit cookie pattern: server-side token
//!   issuance/verification plus a client-side single-flight token manager
//!   with exponential-backoff retry
//!
//! Route handlers, sessions, and the board features themselves are external
//! consumers of these contracts; the HTTP glue in [`handlers`] is a thin
//! adapter over the library types.

pub mod config;
pub mod csrf;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod limiter;
pub mod metrics;
pub mod policy;
pub mod store;
pub mod token_client;

pub use config::Config;
pub use csrf::{CsrfError, CsrfStore};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use policy::{PolicyTable, RateLimitPolicy};
pub use token_client::{CsrfTokenManager, TokenSource};

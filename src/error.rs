// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the board API guard.
//!
//! Rate-limit and CSRF rejections are terminal for the current request and
//! carry distinct wire codes (429 vs 403); nothing here is fatal to the
//! process.

use thiserror::Error;

/// Main error type for guard operations.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal counter-store failure; the limiter treats this as
    /// not-allowed (fail closed)
    #[error("Counter store error: {0}")]
    Store(String),

    /// CSRF verification failure
    #[error(transparent)]
    Csrf(#[from] crate::csrf::CsrfError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

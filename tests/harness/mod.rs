// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for guard abuse simulation.
//!
//! This module provides utilities for simulating flood and forgery
//! patterns against the rate limiter and CSRF store to validate the
//! abuse protections.

pub mod attacks;
pub mod generators;
pub mod metrics;

// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse patterns for security testing.

/// How the simulated clients present CSRF credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBehavior {
    /// Obtain and correctly double-submit a real token
    Valid,
    /// Send no token at all
    Missing,
    /// Send a forged value in both channels
    Forged,
    /// Double-submit a token issued to a different session
    CrossSession,
}

/// Abuse pattern configuration.
#[derive(Debug, Clone)]
pub struct AbuseConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Number of unique client IPs to simulate
    pub unique_ips: usize,
    /// Number of unique sessions spread across those IPs
    pub unique_sessions: usize,
    /// How clients present CSRF tokens
    pub token_behavior: TokenBehavior,
    /// Target endpoint (method, path)
    pub endpoint: (&'static str, &'static str),
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_ips: 1,
            unique_sessions: 1,
            token_behavior: TokenBehavior::Valid,
            endpoint: ("POST", "/api/posts"),
        }
    }
}

/// Predefined abuse patterns.
impl AbuseConfig {
    /// Single client hammering one endpoint with valid tokens.
    pub fn single_client_flood() -> Self {
        Self {
            total_requests: 200,
            ..Default::default()
        }
    }

    /// Many IPs, few requests each; probes the tracking bound rather
    /// than any one quota.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            unique_ips: 250,
            unique_sessions: 250,
            ..Default::default()
        }
    }

    /// Cross-site forgery attempt: mutating requests with no token.
    pub fn forgery_without_token() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 5,
            unique_sessions: 5,
            token_behavior: TokenBehavior::Missing,
            ..Default::default()
        }
    }

    /// Forgery with guessed token values.
    pub fn forgery_with_guessed_token() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 5,
            unique_sessions: 5,
            token_behavior: TokenBehavior::Forged,
            ..Default::default()
        }
    }

    /// Replay of a stolen token against a different session.
    pub fn cross_session_replay() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 5,
            unique_sessions: 5,
            token_behavior: TokenBehavior::CrossSession,
            ..Default::default()
        }
    }
}

/// Expected outcome bounds for an abuse pattern.
pub struct AbuseExpectations {
    /// Maximum ratio of requests that may be allowed
    pub max_allowed_ratio: f64,
    /// Description of expected behavior
    pub description: &'static str,
}

impl AbuseConfig {
    pub fn expectations(&self) -> AbuseExpectations {
        match self.token_behavior {
            TokenBehavior::Missing | TokenBehavior::Forged | TokenBehavior::CrossSession => {
                AbuseExpectations {
                    max_allowed_ratio: 0.0,
                    description: "Every forged mutating request must be rejected",
                }
            }
            TokenBehavior::Valid if self.unique_ips == 1 => AbuseExpectations {
                // One window's quota out of the whole run
                max_allowed_ratio: 10.0 / self.total_requests as f64,
                description: "Single client capped at one window's quota",
            },
            TokenBehavior::Valid => AbuseExpectations {
                max_allowed_ratio: 1.0,
                description: "Distributed clients each hold their own quota",
            },
        }
    }
}

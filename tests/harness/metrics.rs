// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for abuse simulation results.

use std::collections::HashMap;

/// Possible outcomes for a simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    RateLimited,
    CsrfMissing,
    CsrfMismatch,
    CsrfCrossSession,
    CsrfExpired,
}

/// Tallies outcomes during an abuse simulation.
#[derive(Debug, Default)]
pub struct AbuseMetrics {
    outcomes: HashMap<Outcome, usize>,
    requests_per_ip: HashMap<String, usize>,
}

impl AbuseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request outcome.
    pub fn record(&mut self, outcome: Outcome, ip: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_ip.entry(ip.to_string()).or_insert(0) += 1;
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Every CSRF rejection, regardless of reason.
    pub fn csrf_rejected(&self) -> usize {
        self.count(Outcome::CsrfMissing)
            + self.count(Outcome::CsrfMismatch)
            + self.count(Outcome::CsrfCrossSession)
            + self.count(Outcome::CsrfExpired)
    }

    /// Ratio of blocked to total (0.0-1.0).
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let allowed = self.count(Outcome::Allowed);
        (total - allowed) as f64 / total as f64
    }

    pub fn unique_ips(&self) -> usize {
        self.requests_per_ip.len()
    }

    /// Generate a summary report.
    pub fn report(&self) -> AbuseReport {
        AbuseReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            rate_limited: self.count(Outcome::RateLimited),
            csrf_rejected: self.csrf_rejected(),
            block_rate: self.block_rate(),
            unique_ips: self.unique_ips(),
        }
    }
}

/// Summary report of an abuse simulation.
#[derive(Debug, Clone)]
pub struct AbuseReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub rate_limited: usize,
    pub csrf_rejected: usize,
    pub block_rate: f64,
    pub unique_ips: usize,
}

impl std::fmt::Display for AbuseReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Abuse Simulation Report ===")?;
        writeln!(f, "Total Requests: {}", self.total_requests)?;
        writeln!(f, "Allowed:        {}", self.allowed)?;
        writeln!(f, "Rate Limited:   {}", self.rate_limited)?;
        writeln!(f, "CSRF Rejected:  {}", self.csrf_rejected)?;
        writeln!(f, "Block Rate:     {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Unique IPs:     {}", self.unique_ips)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AbuseMetrics::new();
        metrics.record(Outcome::Allowed, "10.0.0.1");
        metrics.record(Outcome::Allowed, "10.0.0.1");
        metrics.record(Outcome::RateLimited, "10.0.0.2");
        metrics.record(Outcome::CsrfMismatch, "10.0.0.2");

        assert_eq!(metrics.total_requests(), 4);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.csrf_rejected(), 1);
        assert_eq!(metrics.unique_ips(), 2);
        assert!((metrics.block_rate() - 0.5).abs() < 0.01);
    }
}

//! Session result accounting.
//!
//! ResultAggregator collects one DistributionResult per attempt and turns
//! them into a SessionSummary when the session ends.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::classify::FailureClass;

/// Why an attempt did not deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptError {
    /// The endpoint refused with a structured code
    Rejected { code: String, class: FailureClass },
    /// No structured verdict arrived
    Network { message: String },
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Rejected { code, class } => write!(f, "{} ({})", code, class),
            AttemptError::Network { message } => write!(f, "network: {}", message),
        }
    }
}

/// Outcome of one transfer attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionResult {
    pub recipient_id: String,
    pub label: String,
    pub requested: u64,
    pub delivered: u64,
    pub error: Option<AttemptError>,
}

impl DistributionResult {
    pub fn delivered(recipient_id: &str, label: &str, requested: u64, delivered: u64) -> Self {
        Self {
            recipient_id: recipient_id.to_string(),
            label: label.to_string(),
            requested,
            delivered,
            error: None,
        }
    }

    pub fn failed(recipient_id: &str, label: &str, requested: u64, error: AttemptError) -> Self {
        Self {
            recipient_id: recipient_id.to_string(),
            label: label.to_string(),
            requested,
            delivered: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The live pool reported nothing left to distribute
    PoolExhausted,
    /// No candidate remained and no retry pass was pending
    RecipientsExhausted,
    /// `stop()` was called
    Stopped,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::PoolExhausted => write!(f, "pool exhausted"),
            EndReason::RecipientsExhausted => write!(f, "recipients exhausted"),
            EndReason::Stopped => write!(f, "stopped"),
        }
    }
}

/// How a summary should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryTone {
    /// At least one unit was delivered
    Success,
    /// Something was requested but nothing delivered
    Failure,
    /// Nothing was ever attempted
    Silent,
}

/// End-of-session report
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub end_reason: EndReason,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub total_sent: u64,
    pub total_requested: u64,
    pub attempts: usize,
    pub successes: usize,
    /// Distinct recipients skipped for the rest of the session (incl. unknown codes)
    pub permanent_skips: usize,
    /// Distinct recipients that were only ever skipped temporarily
    pub temporary_skips: usize,
    pub network_failures: usize,
    pub any_success: bool,
    pub results: Vec<DistributionResult>,
}

impl SessionSummary {
    pub fn tone(&self) -> SummaryTone {
        if self.total_sent > 0 {
            SummaryTone::Success
        } else if self.total_requested > 0 {
            SummaryTone::Failure
        } else {
            SummaryTone::Silent
        }
    }
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sent {}/{} in {} attempts ({} ok, {} permanent skips, {} temporary skips) over {}s, {}",
            self.total_sent,
            self.total_requested,
            self.attempts,
            self.successes,
            self.permanent_skips,
            self.temporary_skips,
            self.elapsed.as_secs(),
            self.end_reason
        )
    }
}

/// Accumulates attempt results for one session
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<DistributionResult>,
    total_sent: u64,
    total_requested: u64,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt. Delivered is clamped to requested.
    pub fn record(&mut self, mut result: DistributionResult) {
        if result.delivered > result.requested {
            log::warn!(
                "{} reported {} delivered for {} requested, clamping",
                result.recipient_id,
                result.delivered,
                result.requested
            );
            result.delivered = result.requested;
        }
        self.total_requested += result.requested;
        self.total_sent += result.delivered;
        self.results.push(result);
    }

    pub fn total_sent(&self) -> u64 {
        self.total_sent
    }

    pub fn total_requested(&self) -> u64 {
        self.total_requested
    }

    pub fn results(&self) -> &[DistributionResult] {
        &self.results
    }

    /// Build the summary for a finished session
    pub fn finish(self, end_reason: EndReason, started_at: DateTime<Utc>, elapsed: Duration) -> SessionSummary {
        let mut permanent = HashSet::new();
        let mut temporary = HashSet::new();
        let mut network_failures = 0;

        for result in &self.results {
            match &result.error {
                Some(AttemptError::Rejected { class, .. }) if class.is_retryable() => {
                    temporary.insert(result.recipient_id.as_str());
                }
                Some(AttemptError::Rejected { .. }) => {
                    permanent.insert(result.recipient_id.as_str());
                }
                Some(AttemptError::Network { .. }) => network_failures += 1,
                None => {}
            }
        }
        let temporary_skips = temporary.difference(&permanent).count();
        let permanent_skips = permanent.len();
        let successes = self.results.iter().filter(|r| r.is_success()).count();

        SessionSummary {
            end_reason,
            started_at,
            elapsed,
            total_sent: self.total_sent,
            total_requested: self.total_requested,
            attempts: self.results.len(),
            successes,
            permanent_skips,
            temporary_skips,
            network_failures,
            any_success: self.total_sent > 0,
            results: self.results,
        }
    }
}

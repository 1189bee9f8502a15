//! Session summary notifications
//!
//! The controller hands exactly one summary per session to a Notifier, and
//! only when the summary is not silent. Delivery channels (push, toast, chat)
//! live outside this crate; LogNotifier writes the summary to the log.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::distribution::{SessionSummary, SummaryTone};

/// Receives end-of-session summaries
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &SessionSummary);
}

/// Writes summaries to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &SessionSummary) {
        match summary.tone() {
            SummaryTone::Success => log::info!("Distribution finished: {}", summary),
            SummaryTone::Failure => log::warn!("Distribution delivered nothing: {}", summary),
            SummaryTone::Silent => log::debug!("Distribution had nothing to do: {}", summary),
        }
    }
}

/// Keeps every summary it receives
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    received: Arc<Mutex<Vec<SessionSummary>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<SessionSummary> {
        self.received.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, summary: &SessionSummary) {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(summary.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{DistributionResult, EndReason, ResultAggregator};
    use chrono::Utc;
    use std::time::Duration;

    fn summary(sent: u64) -> SessionSummary {
        let mut agg = ResultAggregator::new();
        agg.record(DistributionResult::delivered("alice", "Alice", sent, sent));
        agg.finish(EndReason::PoolExhausted, Utc::now(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        notifier.notify(&summary(4)).await;
        notifier.notify(&summary(2)).await;

        assert_eq!(notifier.count(), 2);
        assert_eq!(notifier.received()[0].total_sent, 4);
    }

    #[tokio::test]
    async fn test_memory_notifier_clones_share_state() {
        let notifier = MemoryNotifier::new();
        let handle = notifier.clone();
        handle.notify(&summary(1)).await;
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_does_not_panic() {
        LogNotifier.notify(&summary(3)).await;
        LogNotifier.notify(&summary(0)).await;
    }
}

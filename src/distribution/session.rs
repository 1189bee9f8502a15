//! Distribution session state and candidate planning.
//!
//! A DistributionSession is created when a run starts and dropped when it
//! ends. It owns the ordered candidate list, the cursor into it, the skip
//! list, and the result log. Nothing in it outlives the run.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::aggregator::{AttemptError, DistributionResult, EndReason, ResultAggregator, SessionSummary};
use super::eligibility::{EligibilityParams, ExclusionReason, filter_eligible};
use super::priority::order_candidates;
use super::skip_list::SkipListManager;
use crate::domain::{Recipient, RecipientSettings};
use crate::sources::{PoolSource, SettingsSource, SourceError};

/// Filtered, ordered candidates for a run, plus the pool size they were planned against
#[derive(Debug, Clone)]
pub struct CandidatePlan {
    pub available: u64,
    pub caller_id: String,
    pub ordered: Vec<Recipient>,
    pub excluded: BTreeMap<ExclusionReason, usize>,
}

/// Fetch pool and settings, filter, and order.
///
/// A settings failure degrades to "no additional restrictions"; a pool
/// failure is returned to the caller.
pub async fn plan_candidates(
    pool: &dyn PoolSource,
    settings: &dyn SettingsSource,
    now: DateTime<Utc>,
    params: &EligibilityParams,
) -> Result<CandidatePlan, SourceError> {
    let snapshot = pool.fetch_pool_and_recipients().await?;

    let settings: HashMap<String, RecipientSettings> = match settings.fetch_recipient_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Settings fetch failed, continuing without account restrictions: {}", e);
            HashMap::new()
        }
    };

    let report = filter_eligible(&snapshot.recipients, &settings, &snapshot.caller_id, now, params);
    let ordered = order_candidates(report.eligible);

    Ok(CandidatePlan {
        available: snapshot.available,
        caller_id: snapshot.caller_id,
        ordered,
        excluded: report.excluded,
    })
}

/// Live totals published while a session runs
#[derive(Debug, Clone, Copy)]
pub struct SessionProgress {
    pub started_at: Instant,
    pub total_sent: u64,
    pub total_requested: u64,
    pub waiting_for_retry_pass: bool,
}

impl SessionProgress {
    pub fn new(started_at: Instant) -> Self {
        Self {
            started_at,
            total_sent: 0,
            total_requested: 0,
            waiting_for_retry_pass: false,
        }
    }
}

/// State of one distribution run
#[derive(Debug)]
pub struct DistributionSession {
    ordered: Vec<Recipient>,
    index: usize,
    skips: SkipListManager,
    served: HashSet<String>,
    retry_pass_done: bool,
    in_retry_pass: bool,
    started_at: Instant,
    started_at_wall: DateTime<Utc>,
    results: ResultAggregator,
    ticks: u64,
}

impl DistributionSession {
    pub fn new(ordered: Vec<Recipient>, started_at_wall: DateTime<Utc>) -> Self {
        Self {
            ordered,
            index: 0,
            skips: SkipListManager::new(),
            served: HashSet::new(),
            retry_pass_done: false,
            in_retry_pass: false,
            started_at: Instant::now(),
            started_at_wall,
            results: ResultAggregator::new(),
            ticks: 0,
        }
    }

    pub fn ordered(&self) -> &[Recipient] {
        &self.ordered
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn skips(&self) -> &SkipListManager {
        &self.skips
    }

    pub fn skips_mut(&mut self) -> &mut SkipListManager {
        &mut self.skips
    }

    pub fn retry_pass_done(&self) -> bool {
        self.retry_pass_done
    }

    pub fn in_retry_pass(&self) -> bool {
        self.in_retry_pass
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    /// Next recipient at or after the cursor that may be attempted at `now`.
    ///
    /// The cursor moves past skipped and already-served recipients but stays
    /// on the returned one; call `advance` once it has been attempted.
    pub fn next_candidate(&mut self, now: Instant) -> Option<Recipient> {
        while let Some(recipient) = self.ordered.get(self.index) {
            if self.served.contains(&recipient.id) || self.skips.is_skipped(&recipient.id, now) {
                self.index += 1;
                continue;
            }
            return Some(recipient.clone());
        }
        None
    }

    pub fn advance(&mut self) {
        self.index += 1;
    }

    /// Use up the single retry pass; the cursor is reset when it begins
    pub fn schedule_retry_pass(&mut self) {
        self.retry_pass_done = true;
    }

    pub fn begin_retry_pass(&mut self) {
        self.index = 0;
        self.in_retry_pass = true;
    }

    pub fn record_delivery(&mut self, recipient: &Recipient, requested: u64, delivered: u64) {
        self.served.insert(recipient.id.clone());
        self.results.record(DistributionResult::delivered(
            &recipient.id,
            &recipient.label,
            requested,
            delivered,
        ));
    }

    pub fn record_failure(&mut self, recipient: &Recipient, requested: u64, error: AttemptError) {
        self.results
            .record(DistributionResult::failed(&recipient.id, &recipient.label, requested, error));
    }

    pub fn total_sent(&self) -> u64 {
        self.results.total_sent()
    }

    pub fn total_requested(&self) -> u64 {
        self.results.total_requested()
    }

    pub fn results(&self) -> &[DistributionResult] {
        self.results.results()
    }

    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            started_at: self.started_at,
            total_sent: self.total_sent(),
            total_requested: self.total_requested(),
            waiting_for_retry_pass: false,
        }
    }

    pub fn finish(self, end_reason: EndReason) -> SessionSummary {
        let elapsed = self.started_at.elapsed();
        self.results.finish(end_reason, self.started_at_wall, elapsed)
    }
}

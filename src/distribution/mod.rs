//! Drip-feed distribution engine
//!
//! Leaves first:
//! - eligibility: which recipients may receive at all right now
//! - priority: the order they are tried in
//! - skip_list: per-session permanent and temporary exclusions
//! - classify: refusal code to skip policy
//! - aggregator: per-attempt results and the end-of-session summary
//! - timer: interval timer with a one-shot retry delay mode
//! - session: state of one run
//! - controller: the start/stop/status state machine driving it all

pub mod aggregator;
pub mod classify;
pub mod controller;
pub mod eligibility;
pub mod priority;
pub mod session;
pub mod skip_list;
pub mod timer;

pub use aggregator::{AttemptError, DistributionResult, EndReason, ResultAggregator, SessionSummary, SummaryTone};
pub use classify::{ErrorClassifier, FailureClass};
pub use controller::{
    Collaborators, ControllerState, DistributionConfig, DistributionController, FixedClock, StartOutcome,
    StatusSnapshot, SystemClock, WallClock,
};
pub use eligibility::{EligibilityParams, EligibilityReport, ExclusionReason, filter_eligible};
pub use priority::order_candidates;
pub use session::{CandidatePlan, DistributionSession, plan_candidates};
pub use skip_list::{SkipEntry, SkipExpiry, SkipListManager};
pub use timer::{TickScheduler, TimerEvent};

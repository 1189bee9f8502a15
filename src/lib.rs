//! Dripfeed - a drip-feed distribution scheduler
//!
//! Dripfeed hands out a capped, replenishable pool to a changing set of
//! recipients over time: one successful transfer per tick, largest capacity
//! first, with permanent and temporary skips for recipients that refuse.

pub mod distribution;
pub mod domain;
pub mod error;
pub mod history;
pub mod notify;
pub mod sources;

pub use distribution::{DistributionController, SessionSummary, StartOutcome, StatusSnapshot};
pub use error::{DripfeedError, Result};

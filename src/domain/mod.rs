//! Domain types for dripfeed
//!
//! This module contains the core data handed between collaborators and the
//! distribution engine:
//! - Recipient: a destination account with a declared per-transfer capacity
//! - RecipientSettings: account-level restrictions from the settings source
//! - TimeWindow: an hour range (possibly wrapping midnight) a recipient accepts in
//! - PoolSnapshot: the live pool size plus the raw recipient list

pub mod recipient;
pub mod window;

pub use recipient::{PoolSnapshot, Recipient, RecipientId, RecipientSettings};
pub use window::TimeWindow;

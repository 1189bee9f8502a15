//! Recipient records and the pool snapshot returned by the pool source

use serde::{Deserialize, Serialize};

use super::window::TimeWindow;

/// Opaque recipient identity
pub type RecipientId = String;

/// A destination that may receive part of the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Opaque identity, unique per account
    pub id: RecipientId,

    /// Display label used in logs and summaries
    pub label: String,

    /// Upper bound on how much this recipient absorbs in one transfer
    pub capacity: u64,

    /// Recipient-level disable flag
    #[serde(default)]
    pub disabled: bool,

    /// Current level of the secondary resource gating eligibility (None = unknown)
    #[serde(default)]
    pub reserve: Option<u64>,

    /// Hours during which the recipient accepts transfers
    #[serde(default)]
    pub window: Option<TimeWindow>,
}

impl Recipient {
    /// Create an enabled recipient with no reserve reading and no window
    pub fn new(id: impl Into<String>, label: impl Into<String>, capacity: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            capacity,
            disabled: false,
            reserve: None,
            window: None,
        }
    }

    pub fn with_reserve(mut self, reserve: u64) -> Self {
        self.reserve = Some(reserve);
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Account-level restrictions supplied by the settings source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientSettings {
    /// Second, independent disable flag
    pub disabled: bool,

    /// Overrides the recipient's own window when present
    pub window: Option<TimeWindow>,
}

impl RecipientSettings {
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            window: None,
        }
    }

    pub fn with_window(window: TimeWindow) -> Self {
        Self {
            disabled: false,
            window: Some(window),
        }
    }
}

/// Live pool state plus the raw recipient list, fetched fresh per tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Units currently available to distribute
    pub available: u64,

    /// Identity of the sending account
    pub caller_id: RecipientId,

    /// Every candidate known to the pool source, unfiltered
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

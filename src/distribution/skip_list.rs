//! Per-session exclusion tracking.
//!
//! A recipient that fails a transfer is either skipped for the rest of the
//! session (permanent) or until a retry instant (temporary). Both kinds live
//! in one map keyed by recipient id.

use std::collections::HashMap;

use tokio::time::Instant;

/// How long a skip lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipExpiry {
    /// Skipped for the rest of the session
    Permanent,
    /// Eligible again once `now >= retry_at`
    Temporary { retry_at: Instant },
}

/// Why and for how long a recipient is excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipEntry {
    /// Error code (or internal reason) that caused the skip
    pub reason: String,
    pub expiry: SkipExpiry,
}

impl SkipEntry {
    pub fn is_permanent(&self) -> bool {
        matches!(self.expiry, SkipExpiry::Permanent)
    }

    pub fn retry_at(&self) -> Option<Instant> {
        match self.expiry {
            SkipExpiry::Permanent => None,
            SkipExpiry::Temporary { retry_at } => Some(retry_at),
        }
    }
}

/// Skip state for one session
#[derive(Debug, Default)]
pub struct SkipListManager {
    entries: HashMap<String, SkipEntry>,
}

impl SkipListManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude `id` for the remainder of the session
    pub fn mark_permanent(&mut self, id: &str, reason: impl Into<String>) {
        self.entries.insert(
            id.to_string(),
            SkipEntry {
                reason: reason.into(),
                expiry: SkipExpiry::Permanent,
            },
        );
    }

    /// Exclude `id` until `retry_at`. A permanent entry is never downgraded.
    pub fn mark_temporary(&mut self, id: &str, reason: impl Into<String>, retry_at: Instant) {
        if self.entries.get(id).is_some_and(SkipEntry::is_permanent) {
            return;
        }
        self.entries.insert(
            id.to_string(),
            SkipEntry {
                reason: reason.into(),
                expiry: SkipExpiry::Temporary { retry_at },
            },
        );
    }

    /// Check whether `id` is excluded at `now`.
    ///
    /// An expired temporary entry is removed, so the recipient becomes an
    /// ordinary candidate again.
    pub fn is_skipped(&mut self, id: &str, now: Instant) -> bool {
        let Some(expiry) = self.entries.get(id).map(|e| e.expiry) else {
            return false;
        };
        match expiry {
            SkipExpiry::Permanent => true,
            SkipExpiry::Temporary { retry_at } if retry_at > now => true,
            SkipExpiry::Temporary { .. } => {
                self.entries.remove(id);
                false
            }
        }
    }

    /// Whether any temporary entry exists, expired or not
    pub fn has_any_temporary(&self) -> bool {
        self.entries.values().any(|e| !e.is_permanent())
    }

    pub fn get(&self, id: &str) -> Option<&SkipEntry> {
        self.entries.get(id)
    }

    pub fn permanent_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_permanent()).count()
    }

    pub fn temporary_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_permanent()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

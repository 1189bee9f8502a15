//! In-memory backend for tests and dry runs
//!
//! MemoryBackend implements every collaborator trait over a shared,
//! mutex-guarded state. Successful transfers drain the pool the same way a
//! real backend would, so tick-to-tick pool re-reads see the new size.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{PoolSource, SettingsSource, SourceError, TransferOutcome, TransferSender};
use crate::domain::{PoolSnapshot, Recipient, RecipientSettings};

/// How the backend answers a transfer to a given recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Credit the requested amount (bounded by what the pool holds)
    Deliver,
    /// Refuse with an error code
    Reject(String),
    /// Fail at the transport layer
    NetworkError(String),
}

/// One transfer attempt observed by the backend
#[derive(Debug, Clone)]
pub struct SentTransfer {
    pub recipient_id: String,
    pub amount: u64,
    pub at: Instant,
    pub reply: ScriptedReply,
}

#[derive(Debug, Default)]
struct BackendState {
    available: u64,
    caller_id: String,
    recipients: Vec<Recipient>,
    settings: HashMap<String, RecipientSettings>,
    queued: HashMap<String, VecDeque<ScriptedReply>>,
    sticky: HashMap<String, ScriptedReply>,
    attempts: Vec<SentTransfer>,
    pool_failures: u32,
    settings_failing: bool,
    pool_fetches: u32,
}

/// Shared in-memory pool, settings store, and transfer endpoint
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    /// Create a backend holding `available` units for `caller_id`
    pub fn new(caller_id: impl Into<String>, available: u64) -> Self {
        let state = BackendState {
            available,
            caller_id: caller_id.into(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_recipients(self, recipients: Vec<Recipient>) -> Self {
        self.lock().recipients = recipients;
        self
    }

    pub fn with_settings(self, id: impl Into<String>, settings: RecipientSettings) -> Self {
        self.lock().settings.insert(id.into(), settings);
        self
    }

    /// Answer every transfer to `id` with `reply` once the queue is empty
    pub fn respond(&self, id: impl Into<String>, reply: ScriptedReply) {
        self.lock().sticky.insert(id.into(), reply);
    }

    /// Answer the next transfer to `id` with `reply`, ahead of the sticky reply
    pub fn respond_once(&self, id: impl Into<String>, reply: ScriptedReply) {
        self.lock().queued.entry(id.into()).or_default().push_back(reply);
    }

    /// Remove units from the pool, as activity outside the scheduler would
    pub fn drain(&self, amount: u64) {
        let mut state = self.lock();
        state.available = state.available.saturating_sub(amount);
    }

    pub fn set_available(&self, available: u64) {
        self.lock().available = available;
    }

    pub fn fail_next_pool_fetches(&self, count: u32) {
        self.lock().pool_failures = count;
    }

    pub fn set_settings_failing(&self, failing: bool) {
        self.lock().settings_failing = failing;
    }

    pub fn available(&self) -> u64 {
        self.lock().available
    }

    pub fn pool_fetches(&self) -> u32 {
        self.lock().pool_fetches
    }

    /// Every attempt in the order it arrived
    pub fn attempts(&self) -> Vec<SentTransfer> {
        self.lock().attempts.clone()
    }

    /// Attempts addressed to one recipient
    pub fn attempts_for(&self, id: &str) -> Vec<SentTransfer> {
        self.attempts().into_iter().filter(|a| a.recipient_id == id).collect()
    }

    /// `(recipient, amount)` pairs for attempts that delivered
    pub fn deliveries(&self) -> Vec<(String, u64)> {
        self.attempts()
            .into_iter()
            .filter(|a| a.reply == ScriptedReply::Deliver)
            .map(|a| (a.recipient_id, a.amount))
            .collect()
    }
}

#[async_trait]
impl PoolSource for MemoryBackend {
    async fn fetch_pool_and_recipients(&self) -> Result<PoolSnapshot, SourceError> {
        let mut state = self.lock();
        state.pool_fetches += 1;
        if state.pool_failures > 0 {
            state.pool_failures -= 1;
            return Err(SourceError::Unavailable("pool fetch failed".to_string()));
        }
        Ok(PoolSnapshot {
            available: state.available,
            caller_id: state.caller_id.clone(),
            recipients: state.recipients.clone(),
        })
    }
}

#[async_trait]
impl SettingsSource for MemoryBackend {
    async fn fetch_recipient_settings(&self) -> Result<HashMap<String, RecipientSettings>, SourceError> {
        let state = self.lock();
        if state.settings_failing {
            return Err(SourceError::Unavailable("settings fetch failed".to_string()));
        }
        Ok(state.settings.clone())
    }
}

#[async_trait]
impl TransferSender for MemoryBackend {
    async fn send(&self, recipient_id: &str, amount: u64) -> Result<TransferOutcome, SourceError> {
        let mut state = self.lock();
        let queued = state.queued.get_mut(recipient_id).and_then(|q| q.pop_front());
        let reply = queued
            .or_else(|| state.sticky.get(recipient_id).cloned())
            .unwrap_or(ScriptedReply::Deliver);

        let delivered = amount.min(state.available);
        state.attempts.push(SentTransfer {
            recipient_id: recipient_id.to_string(),
            amount: delivered,
            at: Instant::now(),
            reply: reply.clone(),
        });

        match reply {
            ScriptedReply::Deliver => {
                state.available -= delivered;
                Ok(TransferOutcome::Delivered { amount: delivered })
            }
            ScriptedReply::Reject(code) => Ok(TransferOutcome::Rejected { code }),
            ScriptedReply::NetworkError(message) => Err(SourceError::Unavailable(message)),
        }
    }
}

//! DistributionController - session lifecycle and the tick loop.
//!
//! The controller owns at most one running session. `start()` spawns a driver
//! task that runs the first tick immediately, then alternates between waiting
//! on the TickScheduler and running ticks until the pool or the candidate list
//! is exhausted, or `stop()` is called.
//!
//! Within a tick:
//! - a successful transfer ends the tick; the next send waits a full interval
//! - a refused or failed transfer moves straight on to the next candidate
//!
//! When the primary pass runs out while temporary skips are pending, the
//! interval is suspended for the retry delay and a single retry pass begins
//! from the top of the list.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::aggregator::{AttemptError, EndReason, SessionSummary, SummaryTone};
use super::classify::{ErrorClassifier, FailureClass};
use super::eligibility::EligibilityParams;
use super::session::{DistributionSession, SessionProgress, plan_candidates};
use super::timer::{TickScheduler, TimerEvent};
use crate::notify::Notifier;
use crate::sources::{PoolSource, SettingsSource, TransferOutcome, TransferSender};

/// Default time between ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(120);

/// Default wait before the retry pass, and the temporary skip lifetime
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(15 * 60);

/// Controller tunables
#[derive(Debug, Clone)]
pub struct DistributionConfig {
    /// Whether non-manual starts are allowed
    pub auto_enabled: bool,
    pub tick_interval: Duration,
    pub retry_delay: Duration,
    pub eligibility: EligibilityParams,
    pub classifier: ErrorClassifier,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            auto_enabled: true,
            tick_interval: DEFAULT_TICK_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
            eligibility: EligibilityParams::default(),
            classifier: ErrorClassifier::default(),
        }
    }
}

impl DistributionConfig {
    pub fn with_auto_enabled(mut self, enabled: bool) -> Self {
        self.auto_enabled = enabled;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_eligibility(mut self, params: EligibilityParams) -> Self {
        self.eligibility = params;
        self
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }
}

/// The collaborators a controller drives
#[derive(Clone)]
pub struct Collaborators {
    pub pool: Arc<dyn PoolSource>,
    pub settings: Arc<dyn SettingsSource>,
    pub sender: Arc<dyn TransferSender>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    pub fn new(
        pool: Arc<dyn PoolSource>,
        settings: Arc<dyn SettingsSource>,
        sender: Arc<dyn TransferSender>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            settings,
            sender,
            notifier,
        }
    }

    /// Use one backend for the pool, settings, and transfer roles
    pub fn from_backend<B>(backend: B, notifier: Arc<dyn Notifier>) -> Self
    where
        B: PoolSource + SettingsSource + TransferSender + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            pool: backend.clone(),
            settings: backend.clone(),
            sender: backend,
            notifier,
        }
    }
}

/// Source of "now" for time-window checks
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl WallClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Active,
    /// Primary pass exhausted; the interval is suspended until the retry pass
    WaitingForRetryPass,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Idle => write!(f, "idle"),
            ControllerState::Active => write!(f, "active"),
            ControllerState::WaitingForRetryPass => write!(f, "waiting for retry pass"),
        }
    }
}

/// Read-only view for a UI or health check.
///
/// While idle, totals and elapsed describe the last finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub active: bool,
    pub state: ControllerState,
    pub total_sent: u64,
    pub total_requested: u64,
    pub elapsed: Duration,
}

impl StatusSnapshot {
    fn idle() -> Self {
        Self {
            active: false,
            state: ControllerState::Idle,
            total_sent: 0,
            total_requested: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Result of a `start()` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub started: bool,
    /// Why the session did not start
    pub reason: Option<String>,
    pub status: StatusSnapshot,
}

impl StartOutcome {
    fn started(status: StatusSnapshot) -> Self {
        Self {
            started: true,
            reason: None,
            status,
        }
    }

    fn declined(reason: impl Into<String>, status: StatusSnapshot) -> Self {
        Self {
            started: false,
            reason: Some(reason.into()),
            status,
        }
    }
}

/// What the driver should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickStep {
    /// Wait one interval, then tick again
    Continue,
    /// Suspend the interval until the retry pass is due
    RetryPass,
    Finished(EndReason),
}

struct ActiveSession {
    generation: u64,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<Option<SessionSummary>>>,
    progress: SessionProgress,
}

enum Slot {
    Idle,
    Active(ActiveSession),
}

struct Shared {
    collab: Collaborators,
    clock: Arc<dyn WallClock>,
    config: DistributionConfig,
    slot: Mutex<Slot>,
    summaries: watch::Sender<Option<SessionSummary>>,
    next_generation: AtomicU64,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self, slot: &Slot) -> StatusSnapshot {
        match slot {
            Slot::Active(active) => {
                let progress = &active.progress;
                StatusSnapshot {
                    active: true,
                    state: if progress.waiting_for_retry_pass {
                        ControllerState::WaitingForRetryPass
                    } else {
                        ControllerState::Active
                    },
                    total_sent: progress.total_sent,
                    total_requested: progress.total_requested,
                    elapsed: progress.started_at.elapsed(),
                }
            }
            Slot::Idle => match &*self.summaries.borrow() {
                Some(last) => StatusSnapshot {
                    total_sent: last.total_sent,
                    total_requested: last.total_requested,
                    elapsed: last.elapsed,
                    ..StatusSnapshot::idle()
                },
                None => StatusSnapshot::idle(),
            },
        }
    }

    fn with_session<F>(&self, generation: u64, update: F)
    where
        F: FnOnce(&mut ActiveSession),
    {
        if let Slot::Active(active) = &mut *self.lock_slot() {
            if active.generation == generation {
                update(active);
            }
        }
    }

    fn publish_progress(&self, generation: u64, session: &DistributionSession) {
        let progress = session.progress();
        self.with_session(generation, |active| {
            active.progress.total_sent = progress.total_sent;
            active.progress.total_requested = progress.total_requested;
        });
    }

    fn set_waiting(&self, generation: u64, waiting: bool) {
        self.with_session(generation, |active| active.progress.waiting_for_retry_pass = waiting);
    }

    fn release(&self, generation: u64) {
        let mut slot = self.lock_slot();
        if matches!(&*slot, Slot::Active(active) if active.generation == generation) {
            *slot = Slot::Idle;
        }
    }
}

/// Returns the slot to Idle when the driver exits, however it exits
struct SlotGuard {
    shared: Arc<Shared>,
    generation: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.shared.release(self.generation);
    }
}

/// Drip-feed distribution controller.
///
/// Cheap to clone; clones share the same session slot.
#[derive(Clone)]
pub struct DistributionController {
    shared: Arc<Shared>,
}

impl DistributionController {
    pub fn new(collab: Collaborators, config: DistributionConfig) -> Self {
        Self::with_clock(collab, config, Arc::new(SystemClock))
    }

    pub fn with_clock(collab: Collaborators, config: DistributionConfig, clock: Arc<dyn WallClock>) -> Self {
        let (summaries, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                collab,
                clock,
                config,
                slot: Mutex::new(Slot::Idle),
                summaries,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.shared.config
    }

    /// Start a session and run its first tick.
    ///
    /// `manual` bypasses the `auto_enabled` gate but not the single-session
    /// guard. Returns once the first tick has finished, or with
    /// `started: false` and a reason when there is nothing to do.
    pub async fn start(&self, manual: bool) -> StartOutcome {
        if !manual && !self.shared.config.auto_enabled {
            log::debug!("Automatic distribution is disabled, ignoring start");
            return StartOutcome::declined("automatic distribution is disabled", self.status());
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        {
            let mut slot = self.shared.lock_slot();
            if matches!(&*slot, Slot::Active(_)) {
                let status = self.shared.snapshot(&slot);
                log::debug!("Distribution already running, ignoring start");
                return StartOutcome::declined("already running", status);
            }

            let generation = self.shared.next_generation.fetch_add(1, Ordering::SeqCst);
            let (stop_tx, stop_rx) = watch::channel(false);
            let handle = tokio::spawn(drive(self.shared.clone(), generation, stop_rx, ready_tx));
            *slot = Slot::Active(ActiveSession {
                generation,
                stop_tx: Some(stop_tx),
                handle: Some(handle),
                progress: SessionProgress::new(Instant::now()),
            });
            tracing::info!(generation, manual, "Distribution session starting");
        }

        match ready_rx.await {
            Ok(Ok(())) => StartOutcome::started(self.status()),
            Ok(Err(reason)) => StartOutcome::declined(reason, self.status()),
            Err(_) => StartOutcome::declined("distribution task exited before its first tick", self.status()),
        }
    }

    /// Stop the running session and return its summary.
    ///
    /// Returns None when idle, or when another caller is already stopping it.
    pub async fn stop(&self) -> Option<SessionSummary> {
        let (stop_tx, handle) = {
            let mut slot = self.shared.lock_slot();
            match &mut *slot {
                Slot::Active(active) => (active.stop_tx.take(), active.handle.take()),
                Slot::Idle => return None,
            }
        };
        let (Some(stop_tx), Some(handle)) = (stop_tx, handle) else {
            return None;
        };

        let _ = stop_tx.send(true);
        match handle.await {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Distribution task failed: {}", e);
                None
            }
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let slot = self.shared.lock_slot();
        self.shared.snapshot(&slot)
    }

    pub fn is_active(&self) -> bool {
        matches!(&*self.shared.lock_slot(), Slot::Active(_))
    }

    /// Receiver that sees each session's summary as it finishes
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionSummary>> {
        self.shared.summaries.subscribe()
    }

    /// Summary of the most recently finished session
    pub fn last_summary(&self) -> Option<SessionSummary> {
        self.shared.summaries.borrow().clone()
    }
}

async fn drive(
    shared: Arc<Shared>,
    generation: u64,
    mut stop_rx: watch::Receiver<bool>,
    ready_tx: oneshot::Sender<Result<(), String>>,
) -> Option<SessionSummary> {
    let guard = SlotGuard {
        shared: shared.clone(),
        generation,
    };

    let plan = match plan_candidates(
        shared.collab.pool.as_ref(),
        shared.collab.settings.as_ref(),
        shared.clock.now(),
        &shared.config.eligibility,
    )
    .await
    {
        Ok(plan) if plan.available == 0 => Err("pool is empty".to_string()),
        Ok(plan) if plan.ordered.is_empty() => Err("no eligible recipients".to_string()),
        Ok(plan) => Ok(plan),
        Err(e) => Err(format!("pool fetch failed: {}", e)),
    };
    let plan = match plan {
        Ok(plan) => plan,
        Err(reason) => {
            tracing::info!(generation, reason = %reason, "Distribution session not started");
            drop(guard);
            let _ = ready_tx.send(Err(reason));
            return None;
        }
    };

    tracing::info!(
        generation,
        available = plan.available,
        candidates = plan.ordered.len(),
        excluded = plan.excluded.values().sum::<usize>(),
        "Distribution session started"
    );

    let mut session = DistributionSession::new(plan.ordered, shared.clock.now());
    let mut timer = TickScheduler::new(shared.config.tick_interval);
    let mut ready_tx = Some(ready_tx);
    let mut prefetched = Some(plan.available);

    let end_reason = loop {
        let step = run_tick_guarded(&shared, generation, &mut session, prefetched.take(), &stop_rx).await;
        match step {
            TickStep::Continue => timer.arm_interval(),
            TickStep::RetryPass => {
                timer.arm_retry_delay(shared.config.retry_delay);
                shared.set_waiting(generation, true);
            }
            TickStep::Finished(_) => {}
        }
        if let Some(ready_tx) = ready_tx.take() {
            let _ = ready_tx.send(Ok(()));
        }
        if let TickStep::Finished(reason) = step {
            break reason;
        }

        let event = tokio::select! {
            biased;
            _ = stop_rx.changed() => None,
            event = timer.fired() => Some(event),
        };
        match event {
            None => break EndReason::Stopped,
            Some(TimerEvent::RetryPassDue) => {
                tracing::info!(generation, "Retry pass starting");
                session.begin_retry_pass();
                shared.set_waiting(generation, false);
            }
            Some(TimerEvent::Tick) => {}
        }
    };

    let summary = session.finish(end_reason);
    tracing::info!(generation, summary = %summary, "Distribution session ended");

    if summary.tone() != SummaryTone::Silent {
        shared.collab.notifier.notify(&summary).await;
    }

    drop(guard);
    shared.summaries.send_replace(Some(summary.clone()));
    Some(summary)
}

/// Run one tick, turning a panic into a logged, skipped tick
async fn run_tick_guarded(
    shared: &Shared,
    generation: u64,
    session: &mut DistributionSession,
    prefetched: Option<u64>,
    stop_rx: &watch::Receiver<bool>,
) -> TickStep {
    let tick = run_tick(shared, generation, session, prefetched, stop_rx);
    match AssertUnwindSafe(tick).catch_unwind().await {
        Ok(step) => step,
        Err(panic) => {
            tracing::error!(generation, panic = %panic_message(panic.as_ref()), "Distribution tick panicked");
            TickStep::Continue
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn run_tick(
    shared: &Shared,
    generation: u64,
    session: &mut DistributionSession,
    prefetched: Option<u64>,
    stop_rx: &watch::Receiver<bool>,
) -> TickStep {
    session.record_tick();
    let tick = session.ticks();

    let available = match prefetched {
        Some(available) => available,
        None => match shared.collab.pool.fetch_pool_and_recipients().await {
            Ok(snapshot) => snapshot.available,
            Err(e) => {
                tracing::warn!(generation, tick, error = %e, "Pool fetch failed, skipping tick");
                return TickStep::Continue;
            }
        },
    };
    if available == 0 {
        tracing::debug!(generation, tick, "Pool exhausted");
        return TickStep::Finished(EndReason::PoolExhausted);
    }

    loop {
        if *stop_rx.borrow() {
            return TickStep::Finished(EndReason::Stopped);
        }

        let Some(recipient) = session.next_candidate(Instant::now()) else {
            if session.skips().has_any_temporary() && !session.retry_pass_done() {
                session.schedule_retry_pass();
                tracing::info!(
                    generation,
                    tick,
                    temporary = session.skips().temporary_count(),
                    delay_secs = shared.config.retry_delay.as_secs(),
                    "Primary pass exhausted, scheduling retry pass"
                );
                return TickStep::RetryPass;
            }
            tracing::debug!(generation, tick, "No candidates left");
            return TickStep::Finished(EndReason::RecipientsExhausted);
        };

        let amount = available.min(recipient.capacity);
        session.advance();

        match shared.collab.sender.send(&recipient.id, amount).await {
            Ok(TransferOutcome::Delivered { amount: delivered }) => {
                tracing::info!(generation, tick, recipient = %recipient.id, requested = amount, delivered, "Transfer delivered");
                session.record_delivery(&recipient, amount, delivered);
                shared.publish_progress(generation, session);
                return TickStep::Continue;
            }
            Ok(TransferOutcome::Rejected { code }) => {
                let class = shared.config.classifier.classify(&code);
                match class {
                    FailureClass::Permanent => {
                        tracing::info!(generation, recipient = %recipient.id, code = %code, "Recipient skipped for the session");
                        session.skips_mut().mark_permanent(&recipient.id, code.clone());
                    }
                    FailureClass::Unknown => {
                        tracing::warn!(
                            generation,
                            recipient = %recipient.id,
                            code = %code,
                            "Unclassified refusal code, skipping recipient for the session"
                        );
                        session.skips_mut().mark_permanent(&recipient.id, code.clone());
                    }
                    FailureClass::Temporary => {
                        let retry_at = Instant::now() + shared.config.retry_delay;
                        tracing::info!(generation, recipient = %recipient.id, code = %code, "Recipient skipped until retry");
                        session.skips_mut().mark_temporary(&recipient.id, code.clone(), retry_at);
                    }
                }
                session.record_failure(&recipient, amount, AttemptError::Rejected { code, class });
            }
            Err(e) => {
                tracing::warn!(
                    generation,
                    recipient = %recipient.id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Transfer failed without a verdict"
                );
                session.record_failure(&recipient, amount, AttemptError::Network { message: e.to_string() });
            }
        }
        shared.publish_progress(generation, session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Recipient;
    use crate::notify::MemoryNotifier;
    use crate::sources::{MemoryBackend, ScriptedReply};

    fn controller(backend: &MemoryBackend, notifier: &MemoryNotifier) -> DistributionController {
        DistributionController::new(
            Collaborators::from_backend(backend.clone(), Arc::new(notifier.clone())),
            DistributionConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_first_tick_immediately() {
        let backend = MemoryBackend::new("me", 12).with_recipients(vec![
            Recipient::new("alice", "Alice", 10),
            Recipient::new("bob", "Bob", 5),
        ]);
        let notifier = MemoryNotifier::new();
        let ctl = controller(&backend, &notifier);

        let outcome = ctl.start(true).await;
        assert!(outcome.started);
        assert!(outcome.status.active);
        assert_eq!(outcome.status.total_sent, 10);
        assert_eq!(backend.deliveries(), vec![("alice".to_string(), 10)]);

        ctl.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_start_respects_gate() {
        let backend = MemoryBackend::new("me", 12).with_recipients(vec![Recipient::new("alice", "Alice", 10)]);
        let notifier = MemoryNotifier::new();
        let ctl = DistributionController::new(
            Collaborators::from_backend(backend.clone(), Arc::new(notifier.clone())),
            DistributionConfig::default().with_auto_enabled(false),
        );

        let outcome = ctl.start(false).await;
        assert!(!outcome.started);
        assert_eq!(outcome.reason.as_deref(), Some("automatic distribution is disabled"));
        assert!(backend.attempts().is_empty());

        let outcome = ctl.start(true).await;
        assert!(outcome.started);
        ctl.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_declines_when_nothing_to_do() {
        let notifier = MemoryNotifier::new();

        let empty_pool = MemoryBackend::new("me", 0).with_recipients(vec![Recipient::new("alice", "Alice", 10)]);
        let outcome = controller(&empty_pool, &notifier).start(true).await;
        assert!(!outcome.started);
        assert_eq!(outcome.reason.as_deref(), Some("pool is empty"));

        let nobody = MemoryBackend::new("me", 10).with_recipients(vec![Recipient::new("me", "Me", 10)]);
        let ctl = controller(&nobody, &notifier);
        let outcome = ctl.start(true).await;
        assert!(!outcome.started);
        assert_eq!(outcome.reason.as_deref(), Some("no eligible recipients"));
        assert!(!ctl.is_active());
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_noop() {
        let backend = MemoryBackend::new("me", 10);
        let ctl = controller(&backend, &MemoryNotifier::new());
        assert!(ctl.stop().await.is_none());
        assert_eq!(ctl.status().state, ControllerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_wait() {
        let backend = MemoryBackend::new("me", 20).with_recipients(vec![
            Recipient::new("dave", "Dave", 10),
            Recipient::new("erin", "Erin", 8),
            Recipient::new("frank", "Frank", 5),
        ]);
        backend.respond("dave", ScriptedReply::Reject("not_accepting".to_string()));
        backend.respond("erin", ScriptedReply::NetworkError("connection reset".to_string()));
        let notifier = MemoryNotifier::new();
        let ctl = controller(&backend, &notifier);

        let start = Instant::now();
        let outcome = ctl.start(true).await;
        assert!(outcome.started);

        let attempts = backend.attempts();
        assert_eq!(attempts.len(), 3);
        assert!(attempts.iter().all(|a| a.at == start));
        assert_eq!(backend.deliveries(), vec![("frank".to_string(), 5)]);

        ctl.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_waiting_for_retry_pass() {
        let backend = MemoryBackend::new("me", 20).with_recipients(vec![Recipient::new("dave", "Dave", 10)]);
        backend.respond_once("dave", ScriptedReply::Reject("not_accepting".to_string()));
        let ctl = controller(&backend, &MemoryNotifier::new());

        let outcome = ctl.start(true).await;
        assert!(outcome.started);
        assert_eq!(outcome.status.state, ControllerState::WaitingForRetryPass);

        let summary = ctl.stop().await.unwrap();
        assert_eq!(summary.end_reason, EndReason::Stopped);
        assert_eq!(summary.temporary_skips, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_panic_is_contained() {
        struct PanickingSender;

        #[async_trait::async_trait]
        impl TransferSender for PanickingSender {
            async fn send(&self, _recipient_id: &str, _amount: u64) -> Result<TransferOutcome, crate::sources::SourceError> {
                panic!("sender blew up");
            }
        }

        let backend = MemoryBackend::new("me", 10).with_recipients(vec![Recipient::new("alice", "Alice", 10)]);
        let backend = Arc::new(backend);
        let collab = Collaborators::new(
            backend.clone(),
            backend.clone(),
            Arc::new(PanickingSender),
            Arc::new(MemoryNotifier::new()),
        );
        let ctl = DistributionController::new(collab, DistributionConfig::default());

        let outcome = ctl.start(true).await;
        assert!(outcome.started);
        assert!(ctl.is_active());

        let summary = ctl.stop().await.unwrap();
        assert_eq!(summary.end_reason, EndReason::Stopped);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[test]
    fn test_config_builders() {
        let config = DistributionConfig::default()
            .with_auto_enabled(false)
            .with_tick_interval(Duration::from_secs(5))
            .with_retry_delay(Duration::from_secs(30));
        assert!(!config.auto_enabled);
        assert_eq!(config.tick_interval, Duration::from_secs(5));
        assert_eq!(config.retry_delay, Duration::from_secs(30));
        assert_eq!(DistributionConfig::default().tick_interval, DEFAULT_TICK_INTERVAL);
    }
}

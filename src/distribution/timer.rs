//! Tick timer for the distribution driver.
//!
//! One timer, two modes: the recurring tick interval and the one-shot retry
//! delay. The driver owns a single TickScheduler, so cancelling the driver
//! cancels whichever mode is armed.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// What the timer was armed for when it fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Regular tick
    Tick,
    /// The retry delay elapsed; the retry pass should begin
    RetryPassDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Interval,
    RetryDelay,
}

/// Interval timer with a one-shot delay mode
#[derive(Debug)]
pub struct TickScheduler {
    interval: Duration,
    deadline: Instant,
    mode: Mode,
}

impl TickScheduler {
    /// Create a timer whose first tick is one interval from now
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Instant::now() + interval,
            mode: Mode::Interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_retry_delay(&self) -> bool {
        self.mode == Mode::RetryDelay
    }

    /// Schedule the next tick one full interval from now
    pub fn arm_interval(&mut self) {
        self.deadline = Instant::now() + self.interval;
        self.mode = Mode::Interval;
    }

    /// Suspend the interval and fire once after `delay`
    pub fn arm_retry_delay(&mut self, delay: Duration) {
        self.deadline = Instant::now() + delay;
        self.mode = Mode::RetryDelay;
    }

    /// Wait for the armed deadline. Cancel-safe: dropping the future leaves
    /// the timer armed as it was.
    pub async fn fired(&self) -> TimerEvent {
        sleep_until(self.deadline).await;
        match self.mode {
            Mode::Interval => TimerEvent::Tick,
            Mode::RetryDelay => TimerEvent::RetryPassDue,
        }
    }
}

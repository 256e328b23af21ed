//! Fixed-interval tick scheduler for Robot Race.
//!
//! Drives the pre-race countdown: one tick per interval (one second by
//! default) until the session reports it is Playing. The scheduler only
//! decides *when* a tick fires; what a tick does is up to the caller.
//!
//! # Integration
//!
//! The hub runs one scheduler per counting-down session inside a spawned
//! task:
//!
//! ```ignore
//! let mut scheduler = TickScheduler::new(config);
//! loop {
//!     let info = scheduler.wait_for_tick().await;
//!     if session.lock().await.decrement_countdown() != SessionState::CountingDown {
//!         break;
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. Clamped to at least [`Self::MIN_INTERVAL`].
    pub interval: Duration,
    /// Random jitter (0..max) added to the *first* tick, so countdowns
    /// started in the same instant don't all wake together.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            initial_jitter: Duration::ZERO,
        }
    }
}

impl TickConfig {
    /// Shortest supported interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_secs_f64() * 1000.0,
                "tick interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired late (more than 10% of an interval).
    pub overrun: bool,
    /// Whole intervals lost to the overrun (0 in normal operation).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval tick scheduler. One per running countdown.
///
/// A late tick never shifts the cadence: ticks stay on the grid laid out
/// from the first one, and slots that passed while the caller was busy
/// are dropped.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// When the next tick should fire.
    next_tick: Instant,
}

impl TickScheduler {
    /// Create a new scheduler. The first tick is due one interval from
    /// now, plus jitter.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_us = u64::try_from(config.initial_jitter.as_micros()).unwrap_or(u64::MAX);
            Duration::from_micros(rand::rng().random_range(0..max_us.max(1)))
        };

        debug!(
            interval_ms = config.interval.as_secs_f64() * 1000.0,
            jitter_us = jitter.as_micros() as u64,
            "tick scheduler created"
        );

        Self {
            next_tick: Instant::now() + config.interval + jitter,
            config,
            tick_count: 0,
        }
    }

    /// Wait until the next tick is due. Returns [`TickInfo`] for the tick.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = self.next_tick;
        let interval = self.config.interval;

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > interval / 10;
        let behind = (late_by.as_nanos() / interval.as_nanos()) as u64;

        // Keep the original cadence: the next tick is the first slot on the
        // grid still ahead of now. Missed slots are dropped, never replayed
        // in a burst.
        if behind > 0 {
            warn!(
                tick = self.tick_count,
                dropped = behind,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun, dropping missed ticks"
            );
        }
        self.next_tick = u32::try_from(behind + 1)
            .ok()
            .and_then(|slots| interval.checked_mul(slots))
            .map_or(now + interval, |ahead| next + ahead);

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped: behind,
        }
    }
}

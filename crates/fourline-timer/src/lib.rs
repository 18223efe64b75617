//! Cancellable per-turn countdown for Fourline sessions.
//!
//! One [`TurnTimer`] lives inside each session actor. It is armed when a
//! turn becomes some seat's responsibility, disarmed when a move lands or
//! the session leaves the in-progress state, and fires at most once per
//! arm. On expiry the actor forfeits the turn — the turn passes to the
//! other seat without a piece being placed.
//!
//! # Handle invalidation
//!
//! Every `arm()` bumps a monotonic generation counter and returns it.
//! A caller that remembers the returned generation can discard an expiry
//! carrying an older one, so a countdown started for a previous turn can
//! never forfeit the current one (the classic stale-timer bug).
//!
//! # Integration
//!
//! The timer is designed to sit inside a session actor's
//! `tokio::select!` loop; [`TurnTimer::expired`] pends forever while the
//! timer is disarmed, so the select just ignores that branch:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* moves, joins, rematch */ }
//!         expiry = timer.expired() => {
//!             if expiry.generation == armed_generation {
//!                 /* forfeit the turn, re-arm for the other seat */
//!             }
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timer settings for one session.
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// How long a seat has to move before its turn is forfeited.
    pub turn_budget: Duration,
}

impl TimerConfig {
    /// The default per-turn budget.
    pub const DEFAULT_TURN_BUDGET: Duration = Duration::from_secs(30);
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            turn_budget: Self::DEFAULT_TURN_BUDGET,
        }
    }
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

/// Returned by [`TurnTimer::expired`] when a countdown runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnExpiry {
    /// The generation of the countdown that expired. Compare against the
    /// value returned by the matching [`TurnTimer::arm`] call; anything
    /// older is stale and must be ignored.
    pub generation: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Single-instance countdown with monotonically invalidated handles.
///
/// Exactly one countdown can be pending at a time: arming again
/// implicitly cancels the previous one.
pub struct TurnTimer {
    config: TimerConfig,
    /// Bumped on every arm. Never reset, even across rematches.
    generation: u64,
    deadline: Option<TokioInstant>,
}

impl TurnTimer {
    /// Creates a disarmed timer.
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            generation: 0,
            deadline: None,
        }
    }

    /// Creates a disarmed timer with the given per-turn budget.
    pub fn with_budget(turn_budget: Duration) -> Self {
        Self::new(TimerConfig { turn_budget })
    }

    /// Starts (or restarts) the countdown and returns its generation.
    ///
    /// Any previously pending countdown is cancelled: its generation is
    /// now stale and an expiry carrying it must be discarded.
    pub fn arm(&mut self) -> u64 {
        self.generation += 1;
        self.deadline = Some(TokioInstant::now() + self.config.turn_budget);
        trace!(generation = self.generation, "turn timer armed");
        self.generation
    }

    /// Cancels the pending countdown, if any. Idempotent.
    pub fn disarm(&mut self) {
        if self.deadline.take().is_some() {
            debug!(generation = self.generation, "turn timer disarmed");
        }
    }

    /// Whether a countdown is currently pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The generation of the most recent arm (0 if never armed).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The configured per-turn budget.
    pub fn turn_budget(&self) -> Duration {
        self.config.turn_budget
    }

    /// Waits for the pending countdown to run out.
    ///
    /// Pends forever while disarmed — inside `tokio::select!` the other
    /// branches keep running. Fires at most once per arm: the countdown
    /// is consumed on expiry, and the caller decides whether to re-arm.
    pub async fn expired(&mut self) -> TurnExpiry {
        let Some(deadline) = self.deadline else {
            // Disarmed: this future never resolves on its own.
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(deadline).await;
        self.deadline = None;

        debug!(generation = self.generation, "turn timer expired");
        TurnExpiry {
            generation: self.generation,
        }
    }
}

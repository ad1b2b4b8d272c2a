//! Timer state engine
//!
//! [`TimerState`] is the countdown state machine shared by the authoritative
//! service and every client replica. All mutation goes through its methods,
//! which keep two invariants:
//!
//! - `remaining_seconds` never underflows (saturating arithmetic, clamped input)
//! - `running` is false whenever `remaining_seconds` is zero
//!
//! # States
//!
//! ```text
//!            start (remaining > 0)
//!   Idle ─────────────────────────▶ Running ──tick──▶ Running
//!    ▲  ▲                            │   ▲              │
//!    │  │           pause            │   │ start        │ tick hits 0
//!    │  │        ┌───────────────────┘   │              ▼
//!    │  │        ▼                       │           Idle (expired)
//!    │  └──── Paused ────────────────────┘
//!    │
//!  reset (from any state)
//! ```

mod drift;
mod goal;

#[cfg(test)]
mod engine_tests;

pub use drift::{Recovery, recover};
pub use goal::{Goal, GoalClamp};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::TimeGrant;

/// Coarse run state derived from `running` and `remaining_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Nothing left on the clock.
    Idle,
    /// Time left, not counting down.
    Paused,
    Running,
}

/// Outcome of a single [`TimerState::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not running or already at zero; nothing changed.
    Idle,
    /// Decremented by one second and still running.
    Decremented { remaining: u64 },
    /// This tick reached zero and stopped the timer.
    Expired,
}

/// How often (in remaining seconds) routine ticks are worth persisting.
pub const TICK_SNAPSHOT_INTERVAL: u64 = 10;

impl Tick {
    /// Routine decrements are persisted on every tenth second; expiry always is.
    pub fn wants_snapshot(self) -> bool {
        match self {
            Tick::Idle => false,
            Tick::Decremented { remaining } => remaining % TICK_SNAPSHOT_INTERVAL == 0,
            Tick::Expired => true,
        }
    }
}

/// The canonical countdown state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    remaining_seconds: u64,
    running: bool,
    total_contributions: u64,
    total_seconds_granted: u64,
    /// Wall-clock instant this state was last known to be correct.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_observed_at: DateTime<Utc>,
}

impl TimerState {
    /// A zeroed, paused timer observed at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            remaining_seconds: 0,
            running: false,
            total_contributions: 0,
            total_seconds_granted: 0,
            last_observed_at: now,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn total_contributions(&self) -> u64 {
        self.total_contributions
    }

    pub fn total_seconds_granted(&self) -> u64 {
        self.total_seconds_granted
    }

    pub fn last_observed_at(&self) -> DateTime<Utc> {
        self.last_observed_at
    }

    pub fn phase(&self) -> Phase {
        if self.running {
            Phase::Running
        } else if self.remaining_seconds > 0 {
            Phase::Paused
        } else {
            Phase::Idle
        }
    }

    /// Begin counting down. No-op when already running or when nothing is left.
    /// Returns whether the state changed.
    pub fn start(&mut self) -> bool {
        if self.running || self.remaining_seconds == 0 {
            return false;
        }
        self.running = true;
        true
    }

    /// Stop counting down. Returns whether the state changed.
    pub fn pause(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    /// Pause and zero the clock and both lifetime counters.
    pub fn reset(&mut self) {
        self.pause();
        self.remaining_seconds = 0;
        self.total_contributions = 0;
        self.total_seconds_granted = 0;
    }

    /// Overwrite the remaining time. Negative input clamps to zero.
    ///
    /// Run state is kept, except that a running timer set to zero stops.
    pub fn set_remaining(&mut self, seconds: i64) {
        self.remaining_seconds = seconds.max(0) as u64;
        self.enforce_floor();
    }

    /// Fold a grant into the state: remaining and lifetime seconds grow by
    /// `seconds_to_add`, contributions by `unit_count`. Never auto-starts.
    pub fn apply(&mut self, grant: &TimeGrant) {
        self.remaining_seconds = self.remaining_seconds.saturating_add(grant.seconds_to_add);
        self.total_seconds_granted = self
            .total_seconds_granted
            .saturating_add(grant.seconds_to_add);
        self.total_contributions = self
            .total_contributions
            .saturating_add(u64::from(grant.unit_count));
    }

    /// Advance the countdown by exactly one second.
    pub fn tick(&mut self) -> Tick {
        if !self.running || self.remaining_seconds == 0 {
            return Tick::Idle;
        }
        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            self.running = false;
            return Tick::Expired;
        }
        Tick::Decremented {
            remaining: self.remaining_seconds,
        }
    }

    /// Operator override of the lifetime counters (merge requests).
    pub fn overwrite_totals(&mut self, contributions: Option<u64>, seconds_granted: Option<u64>) {
        if let Some(contributions) = contributions {
            self.total_contributions = contributions;
        }
        if let Some(seconds_granted) = seconds_granted {
            self.total_seconds_granted = seconds_granted;
        }
    }

    /// Clear the lifetime counters without touching the clock.
    pub fn clear_totals(&mut self) {
        self.total_contributions = 0;
        self.total_seconds_granted = 0;
    }

    /// Record that this state is correct as of `now`.
    pub fn observe(&mut self, now: DateTime<Utc>) {
        self.last_observed_at = now;
    }

    /// Restore the zero-means-stopped invariant after any direct overwrite.
    fn enforce_floor(&mut self) {
        if self.remaining_seconds == 0 {
            self.running = false;
        }
    }
}

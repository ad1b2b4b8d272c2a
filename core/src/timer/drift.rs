use chrono::{DateTime, Utc};

use super::TimerState;

/// What happened when a persisted state was brought up to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// No usable snapshot; started from a zeroed state.
    Fresh,
    /// The snapshot was not running, so downtime does not count.
    Stopped,
    /// Downtime was subtracted and the timer keeps running.
    Resumed { elapsed: u64 },
    /// The timer ran out while nothing was ticking it.
    ExpiredWhileDown { elapsed: u64 },
}

/// Drift-correct a persisted state: a running timer loses the whole-second
/// downtime between `last_observed_at` and `now`. A clock that moved
/// backwards counts as zero downtime.
pub fn recover(mut state: TimerState, now: DateTime<Utc>) -> (TimerState, Recovery) {
    let recovery = if state.running {
        let elapsed = now
            .signed_duration_since(state.last_observed_at)
            .num_seconds()
            .max(0) as u64;
        state.remaining_seconds = state.remaining_seconds.saturating_sub(elapsed);
        if state.remaining_seconds == 0 {
            state.running = false;
            Recovery::ExpiredWhileDown { elapsed }
        } else {
            Recovery::Resumed { elapsed }
        }
    } else {
        Recovery::Stopped
    };

    state.enforce_floor();
    state.observe(now);
    (state, recovery)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional wall-clock deadline the countdown may never extend past.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub deadline: Option<DateTime<Utc>>,
    /// Set once a grant or set-time was cut short by the deadline.
    #[serde(default)]
    pub reached: bool,
}

/// How a requested grant fared against the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalClamp {
    Full(u64),
    Truncated { granted: u64, requested: u64 },
    Rejected,
}

impl GoalClamp {
    pub fn granted(self) -> u64 {
        match self {
            GoalClamp::Full(seconds) => seconds,
            GoalClamp::Truncated { granted, .. } => granted,
            GoalClamp::Rejected => 0,
        }
    }
}

impl Goal {
    /// Replace the deadline; a new goal has not been reached yet.
    pub fn set_deadline(&mut self, deadline: Option<DateTime<Utc>>) {
        self.deadline = deadline;
        self.reached = false;
    }

    /// Seconds that can still be added on top of `remaining`, or `None` without a goal.
    pub fn max_addable(&self, remaining: u64, now: DateTime<Utc>) -> Option<u64> {
        let deadline = self.deadline?;
        let until_goal = deadline.signed_duration_since(now).num_seconds();
        let remaining = i64::try_from(remaining).unwrap_or(i64::MAX);
        Some(until_goal.saturating_sub(remaining).max(0) as u64)
    }

    /// Clamp a grant of `requested` seconds so the countdown stays within the goal.
    pub fn clamp_grant(&mut self, requested: u64, remaining: u64, now: DateTime<Utc>) -> GoalClamp {
        let Some(max) = self.max_addable(remaining, now) else {
            return GoalClamp::Full(requested);
        };
        if max == 0 {
            self.reached = true;
            return GoalClamp::Rejected;
        }
        if requested > max {
            self.reached = true;
            return GoalClamp::Truncated {
                granted: max,
                requested,
            };
        }
        GoalClamp::Full(requested)
    }

    /// Clamp an absolute set-time request to the time left until the goal.
    pub fn clamp_remaining(&mut self, requested: i64, now: DateTime<Utc>) -> i64 {
        let Some(deadline) = self.deadline else {
            return requested;
        };
        let until_goal = deadline.signed_duration_since(now).num_seconds();
        if requested > until_goal {
            self.reached = true;
            return until_goal;
        }
        requested
    }
}

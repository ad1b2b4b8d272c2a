//! The authoritative timer and everything persisted beside it.
//!
//! [`TimerAuthority`] is plain synchronous state. The service loop owns the
//! only instance and calls into it one command at a time, so no method here
//! ever observes a half-applied update. Every method takes `now` explicitly.

use chrono::{DateTime, Utc};
use subathon_core::events::{FeedNotice, Normalized, RawEvent, TimeGrant, normalize};
use subathon_core::state::{
    ActivityEntry, AddTimeRequest, ServiceStats, Snapshot, SnapshotStore, StatePatch, TimerView,
};
use subathon_core::timer::{Goal, GoalClamp, Recovery, Tick};
use subathon_core::{GrantConfig, NormalizationError, RequestError};
use subathon_types::formatting::format_added;
use thiserror::Error;

/// A state-changing request, serialized through the service loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Start,
    Pause,
    Reset,
    SetTime(i64),
    SetGoal(Option<DateTime<Utc>>),
    AddTime(AddTimeRequest),
    AddBits(u64),
    Merge(StatePatch),
    ResetList,
    FullReset,
    Feed(RawEvent),
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            WriteOp::Start => "start",
            WriteOp::Pause => "pause",
            WriteOp::Reset => "reset",
            WriteOp::SetTime(_) => "set_time",
            WriteOp::SetGoal(_) => "set_goal",
            WriteOp::AddTime(_) => "add_time",
            WriteOp::AddBits(_) => "add_bits",
            WriteOp::Merge(_) => "merge",
            WriteOp::ResetList => "reset_list",
            WriteOp::FullReset => "full_reset",
            WriteOp::Feed(_) => "feed",
        }
    }
}

/// A write that was refused. The authoritative state is unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("notification dropped: {0}")]
    Notification(#[from] NormalizationError),
}

/// Activity-log details a grant does not carry itself.
#[derive(Debug, Clone, Copy, Default)]
struct EntryDetails {
    months: u32,
    is_prime: bool,
}

fn is_prime_plan(plan: Option<&str>) -> bool {
    plan.is_some_and(|plan| plan.eq_ignore_ascii_case("prime"))
}

pub struct TimerAuthority {
    snapshot: Snapshot,
    stats: ServiceStats,
    /// Grant config restored by a full reset.
    defaults: GrantConfig,
}

impl TimerAuthority {
    pub fn new(snapshot: Snapshot, defaults: GrantConfig) -> Self {
        Self {
            snapshot,
            stats: ServiceStats::default(),
            defaults,
        }
    }

    /// Load the last snapshot from `store` and drift-correct it to `now`.
    pub fn restore(
        store: &SnapshotStore,
        defaults: GrantConfig,
        now: DateTime<Utc>,
    ) -> (Self, Recovery) {
        let (snapshot, recovery) = store.restore(now, &defaults);
        (Self::new(snapshot, defaults), recovery)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats
    }

    pub fn view(&self, now: DateTime<Utc>) -> TimerView {
        TimerView::from_snapshot(&self.snapshot, self.stats, now)
    }

    pub fn count_request(&mut self) {
        self.stats.total_requests += 1;
    }

    /// A feed line that could not even be decoded.
    pub fn record_dropped(&mut self) {
        self.stats.dropped_notifications += 1;
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        let tick = self.snapshot.timer.tick();
        self.snapshot.timer.observe(now);
        if tick == Tick::Expired {
            tracing::info!("Timer expired");
        }
        tick
    }

    /// Apply one write. On error nothing has been mutated.
    pub fn execute(&mut self, op: WriteOp, now: DateTime<Utc>) -> Result<(), WriteError> {
        match op {
            WriteOp::Start => {
                if self.snapshot.timer.start() {
                    tracing::info!(remaining = self.remaining(), "Timer started");
                } else {
                    tracing::debug!(remaining = self.remaining(), "Start ignored");
                }
            }
            WriteOp::Pause => {
                if self.snapshot.timer.pause() {
                    tracing::info!(remaining = self.remaining(), "Timer paused");
                }
            }
            WriteOp::Reset => {
                self.snapshot.timer.reset();
                self.snapshot.goal.reached = false;
                tracing::info!("Timer reset");
            }
            WriteOp::SetTime(seconds) => self.set_time(seconds, now),
            WriteOp::SetGoal(deadline) => {
                self.snapshot.goal.set_deadline(deadline);
                match deadline {
                    Some(deadline) => tracing::info!(%deadline, "Goal set"),
                    None => tracing::info!("Goal cleared"),
                }
            }
            WriteOp::AddTime(request) => self.add_time(&request, now)?,
            WriteOp::AddBits(bits) => {
                self.snapshot.total_bits = self.snapshot.total_bits.saturating_add(bits);
                tracing::info!(bits, total = self.snapshot.total_bits, "Bits added");
            }
            WriteOp::Merge(patch) => self.merge(patch)?,
            WriteOp::ResetList => {
                self.snapshot.activity.clear();
                self.snapshot.timer.clear_totals();
                self.snapshot.total_bits = 0;
                tracing::info!("Activity list and totals cleared");
            }
            WriteOp::FullReset => {
                self.snapshot.timer.reset();
                self.snapshot.goal = Goal::default();
                self.snapshot.start_timestamp = None;
                self.snapshot.activity.clear();
                self.snapshot.total_bits = 0;
                self.snapshot.config = self.defaults.clone();
                self.stats = ServiceStats::default();
                tracing::info!("Full reset");
            }
            WriteOp::Feed(event) => self.ingest(&event, now)?,
        }
        self.snapshot.timer.observe(now);
        Ok(())
    }

    fn remaining(&self) -> u64 {
        self.snapshot.timer.remaining_seconds()
    }

    fn set_time(&mut self, seconds: i64, now: DateTime<Utc>) {
        let clamped = self.snapshot.goal.clamp_remaining(seconds, now);
        if clamped != seconds {
            tracing::info!(requested = seconds, clamped, "Set time limited by goal");
        }
        self.snapshot.timer.set_remaining(clamped);
        tracing::info!(remaining = self.remaining(), "Time set");
    }

    fn add_time(&mut self, request: &AddTimeRequest, now: DateTime<Utc>) -> Result<(), WriteError> {
        let grant = request.to_grant()?;
        let details = request.contributor_info.as_ref().map(|info| EntryDetails {
            months: info.months,
            is_prime: info.is_prime,
        });
        self.apply_grant(&grant, details, now);
        Ok(())
    }

    fn merge(&mut self, patch: StatePatch) -> Result<(), WriteError> {
        patch.validate()?;

        if let Some(config) = patch.config {
            self.snapshot.config = config;
            tracing::info!("Grant config replaced");
        }
        self.snapshot
            .timer
            .overwrite_totals(patch.total_contributions, patch.total_seconds_granted);
        if let Some(remaining) = patch.remaining_seconds {
            self.snapshot.timer.set_remaining(remaining);
        }
        match patch.running {
            Some(true) => {
                self.snapshot.timer.start();
            }
            Some(false) => {
                self.snapshot.timer.pause();
            }
            None => {}
        }
        if let Some(deadline) = patch.goal_timestamp {
            self.snapshot.goal.set_deadline(deadline);
        }
        if let Some(start) = patch.start_timestamp {
            self.snapshot.start_timestamp = start;
        }
        tracing::info!(remaining = self.remaining(), "State merged");
        Ok(())
    }

    fn ingest(&mut self, event: &RawEvent, now: DateTime<Utc>) -> Result<(), WriteError> {
        let normalized = match normalize(event, &self.snapshot.config) {
            Ok(normalized) => normalized,
            Err(e) => {
                self.stats.dropped_notifications += 1;
                tracing::warn!(kind = event.kind(), id = ?event.id(), error = %e, "Dropped notification");
                return Err(e.into());
            }
        };

        match normalized {
            Normalized::Notice(FeedNotice::MysteryGift {
                gifter,
                count,
                tier,
            }) => {
                tracing::info!(gifter = ?gifter, count, tier = tier.number(), "Gift bundle announced");
            }
            Normalized::Notice(FeedNotice::Raid { raider, viewers }) => {
                tracing::info!(raider = ?raider, viewers, "Raid");
            }
            Normalized::Grant(grant) => {
                self.snapshot.total_bits = self.snapshot.total_bits.saturating_add(grant.bits);
                if grant.is_empty() {
                    tracing::debug!(
                        contributor = %grant.contributor_name,
                        kind = grant.kind.label(),
                        bits = grant.bits,
                        "Notification grants no time"
                    );
                    return Ok(());
                }
                let details = match event {
                    RawEvent::Subscription { plan, .. } => EntryDetails {
                        months: 0,
                        is_prime: is_prime_plan(plan.as_deref()),
                    },
                    RawEvent::Resubscription { plan, months, .. } => EntryDetails {
                        months: *months,
                        is_prime: is_prime_plan(plan.as_deref()),
                    },
                    _ => EntryDetails::default(),
                };
                self.apply_grant(&grant, Some(details), now);
            }
        }
        Ok(())
    }

    /// Clamp `grant` against the goal and fold what is left into the timer.
    fn apply_grant(
        &mut self,
        grant: &TimeGrant,
        record: Option<EntryDetails>,
        now: DateTime<Utc>,
    ) -> GoalClamp {
        let clamp = self
            .snapshot
            .goal
            .clamp_grant(grant.seconds_to_add, self.remaining(), now);

        match clamp {
            GoalClamp::Rejected => {
                self.stats.rejected_by_goal += 1;
                tracing::warn!(
                    contributor = %grant.contributor_name,
                    seconds = grant.seconds_to_add,
                    "Grant rejected, goal reached"
                );
                return clamp;
            }
            GoalClamp::Truncated { granted, requested } => {
                tracing::info!(granted, requested, "Grant truncated by goal");
            }
            GoalClamp::Full(_) => {}
        }

        let applied = TimeGrant {
            seconds_to_add: clamp.granted(),
            ..grant.clone()
        };
        self.snapshot.timer.apply(&applied);
        self.stats.processed_grants += 1;

        if let Some(details) = record {
            let mut entry = ActivityEntry::from_grant(&applied, applied.seconds_to_add, now);
            entry.months = details.months;
            entry.is_prime = details.is_prime;
            self.snapshot.activity.push(entry);
        }

        tracing::info!(
            contributor = %applied.contributor_name,
            kind = applied.kind.label(),
            id = ?applied.source_event_id,
            units = applied.unit_count,
            added = %format_added(applied.seconds_to_add),
            remaining = self.remaining(),
            "Grant applied"
        );
        clamp
    }
}

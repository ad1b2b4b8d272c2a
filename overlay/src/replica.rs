use std::time::Duration;

use chrono::{DateTime, Utc};
use subathon_core::state::{AddTimeRequest, Snapshot, SnapshotStore, StatePatch, TimerView};
use subathon_core::timer::{Recovery, Tick};
use subathon_core::{GrantConfig, TimerState};

use tokio::time::{Instant, interval, interval_at};

use crate::backend::{BackendError, TimerBackend};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A non-authoritative copy of the timer that ticks on its own.
///
/// Between syncs the replica may drift from the service by at most one poll
/// interval; every successful sync or write replaces the local copy.
pub struct Replica<B> {
    backend: B,
    store: SnapshotStore,
    snapshot: Snapshot,
}

impl<B: TimerBackend> Replica<B> {
    /// Resume from the local snapshot in `store`, drift-corrected to `now`.
    pub fn open(backend: B, store: SnapshotStore, now: DateTime<Utc>) -> (Self, Recovery) {
        let (snapshot, recovery) = store.restore(now, &GrantConfig::default());
        let replica = Self {
            backend,
            store,
            snapshot,
        };
        (replica, recovery)
    }

    pub fn timer(&self) -> &TimerState {
        &self.snapshot.timer
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Advance the local countdown by one second, saving on every tenth.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        let tick = self.snapshot.timer.tick();
        self.snapshot.timer.observe(now);
        if tick.wants_snapshot() {
            self.save();
        }
        tick
    }

    /// Replace the local copy with the service's state.
    pub async fn sync(&mut self, now: DateTime<Utc>) -> Result<(), BackendError> {
        let view = self.backend.fetch_state().await?;
        self.adopt(view, now);
        Ok(())
    }

    pub async fn start(&mut self, now: DateTime<Utc>) -> Result<(), BackendError> {
        self.backend.start().await?;
        self.sync(now).await
    }

    pub async fn pause(&mut self, now: DateTime<Utc>) -> Result<(), BackendError> {
        self.backend.pause().await?;
        self.sync(now).await
    }

    pub async fn reset(&mut self, now: DateTime<Utc>) -> Result<(), BackendError> {
        self.backend.reset().await?;
        self.sync(now).await
    }

    pub async fn set_time(&mut self, seconds: i64, now: DateTime<Utc>) -> Result<(), BackendError> {
        let view = self.backend.set_time(seconds).await?;
        self.adopt(view, now);
        Ok(())
    }

    pub async fn add_time(
        &mut self,
        request: AddTimeRequest,
        now: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let view = self.backend.add_time(request).await?;
        self.adopt(view, now);
        Ok(())
    }

    pub async fn merge(&mut self, patch: StatePatch, now: DateTime<Utc>) -> Result<(), BackendError> {
        let view = self.backend.merge(patch).await?;
        self.adopt(view, now);
        Ok(())
    }

    /// Tick every second and re-sync every `poll` until `shutdown` resolves.
    ///
    /// `render` runs after each local tick. A failed sync keeps the local countdown.
    pub async fn run<F>(&mut self, poll: Duration, shutdown: F, mut render: impl FnMut(&Self))
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        let mut poller = interval(poll);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.tick(Utc::now());
                    render(self);
                }
                _ = poller.tick() => {
                    if let Err(e) = self.sync(Utc::now()).await {
                        tracing::warn!(error = %e, "Sync failed, keeping local countdown");
                    }
                }
            }
        }
    }

    fn adopt(&mut self, view: TimerView, now: DateTime<Utc>) {
        let mut snapshot = view.into_snapshot();
        snapshot.timer.observe(now);
        self.snapshot = snapshot;
        self.save();
    }

    fn save(&self) {
        if let Err(e) = self.store.save(&self.snapshot) {
            tracing::warn!(error = %e, "Failed to save local snapshot");
        }
    }
}

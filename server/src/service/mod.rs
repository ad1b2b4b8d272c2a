//! Timer service
//!
//! One task owns the [`TimerAuthority`]. HTTP handlers, the feed follower
//! and the 1 Hz ticker all reach it through the same command channel, so
//! ticks and writes are applied strictly one after another.
//!
//! ```text
//!  router ─┐
//!  feed ───┼─▶ mpsc<ServiceCommand> ─▶ TimerService::run ─▶ watch<Snapshot> ─▶ snapshot writer
//!  1 Hz ───┘            (select!)              │                                    │
//!                                       oneshot replies                      SnapshotStore::save
//! ```

mod authority;
mod handler;

#[cfg(test)]
mod authority_tests;

pub use authority::{TimerAuthority, WriteError, WriteOp};
pub use handler::{ServiceError, ServiceHandle};

use std::time::Duration;

use chrono::Utc;
use subathon_core::state::{Snapshot, SnapshotStore, TimerView};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

const COMMAND_BUFFER: usize = 256;
const TICK_PERIOD: Duration = Duration::from_secs(1);

pub enum ServiceCommand {
    GetState {
        reply: oneshot::Sender<TimerView>,
    },
    Write {
        op: WriteOp,
        reply: oneshot::Sender<Result<TimerView, WriteError>>,
    },
    /// A feed line that failed to decode.
    NotificationDropped,
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub struct TimerService {
    authority: TimerAuthority,
    cmd_rx: mpsc::Receiver<ServiceCommand>,
    snapshot_tx: watch::Sender<Snapshot>,
    writer: JoinHandle<()>,
}

impl TimerService {
    /// Spawn the service loop and its snapshot writer.
    ///
    /// The restored state is persisted right away so a drift correction
    /// survives a crash before the next snapshot point.
    pub fn spawn(authority: TimerAuthority, store: SnapshotStore) -> (ServiceHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(authority.snapshot().clone());
        let writer = tokio::spawn(write_snapshots(store, snapshot_rx));

        let service = Self {
            authority,
            cmd_rx,
            snapshot_tx,
            writer,
        };
        service.persist();

        let join = tokio::spawn(service.run());
        (ServiceHandle::new(cmd_tx), join)
    }

    async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(ServiceCommand::Shutdown { reply }) => {
                            let _ = reply.send(());
                            break;
                        }
                        Some(cmd) => self.handle(cmd),
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    let tick = self.authority.tick(Utc::now());
                    if tick.wants_snapshot() {
                        self.persist();
                    }
                }
            }
        }

        tracing::info!(
            remaining = self.authority.snapshot().timer.remaining_seconds(),
            "Timer service stopping"
        );
        self.persist();
        drop(self.snapshot_tx);
        if let Err(e) = self.writer.await {
            tracing::error!(error = %e, "Snapshot writer panicked");
        }
    }

    fn handle(&mut self, cmd: ServiceCommand) {
        let now = Utc::now();
        match cmd {
            ServiceCommand::GetState { reply } => {
                self.authority.count_request();
                let _ = reply.send(self.authority.view(now));
            }
            ServiceCommand::Write { op, reply } => {
                self.authority.count_request();
                let name = op.name();
                let result = self.authority.execute(op, now);
                match &result {
                    Ok(()) => self.persist(),
                    Err(e) => tracing::debug!(op = name, error = %e, "Write rejected"),
                }
                let _ = reply.send(result.map(|()| self.authority.view(now)));
            }
            ServiceCommand::NotificationDropped => self.authority.record_dropped(),
            ServiceCommand::Shutdown { .. } => {}
        }
    }

    /// Hand the current state to the writer. Only the newest pending copy is kept.
    fn persist(&self) {
        self.snapshot_tx.send_replace(self.authority.snapshot().clone());
    }
}

/// Save every snapshot published on `rx` until the service drops its sender.
///
/// A failed save is logged and retried with whatever the next snapshot point
/// publishes.
async fn write_snapshots(store: SnapshotStore, mut rx: watch::Receiver<Snapshot>) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        let store = store.clone();
        let result = tokio::task::spawn_blocking(move || store.save(&snapshot)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to save snapshot"),
            Err(e) => tracing::error!(error = %e, "Snapshot save task failed"),
        }
    }
}

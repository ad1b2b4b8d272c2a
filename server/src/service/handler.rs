use chrono::{DateTime, Utc};
use subathon_core::RawEvent;
use subathon_core::state::{AddTimeRequest, StatePatch, TimerView};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::{ServiceCommand, WriteError, WriteOp};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("timer service is not running")]
    Closed,
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Handle to communicate with the timer service
#[derive(Clone)]
pub struct ServiceHandle {
    cmd_tx: mpsc::Sender<ServiceCommand>,
}

impl ServiceHandle {
    pub(super) fn new(cmd_tx: mpsc::Sender<ServiceCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Current authoritative state
    pub async fn state(&self) -> Result<TimerView, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::GetState { reply }).await?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    /// Apply one write and return the resulting state
    pub async fn write(&self, op: WriteOp) -> Result<TimerView, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::Write { op, reply }).await?;
        Ok(rx.await.map_err(|_| ServiceError::Closed)??)
    }

    pub async fn start(&self) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::Start).await
    }

    pub async fn pause(&self) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::Pause).await
    }

    pub async fn reset(&self) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::Reset).await
    }

    pub async fn set_time(&self, seconds: i64) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::SetTime(seconds)).await
    }

    pub async fn set_goal(&self, deadline: Option<DateTime<Utc>>) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::SetGoal(deadline)).await
    }

    pub async fn add_time(&self, request: AddTimeRequest) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::AddTime(request)).await
    }

    pub async fn add_bits(&self, bits: u64) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::AddBits(bits)).await
    }

    pub async fn merge(&self, patch: StatePatch) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::Merge(patch)).await
    }

    pub async fn reset_list(&self) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::ResetList).await
    }

    pub async fn full_reset(&self) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::FullReset).await
    }

    /// Normalize and apply one raw feed notification
    pub async fn ingest(&self, event: RawEvent) -> Result<TimerView, ServiceError> {
        self.write(WriteOp::Feed(event)).await
    }

    /// Count a feed line that could not be decoded
    pub async fn notification_dropped(&self) -> Result<(), ServiceError> {
        self.send(ServiceCommand::NotificationDropped).await
    }

    /// Stop the loop after a final snapshot. Resolves once the loop has exited its select.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::Shutdown { reply }).await?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    /// Whether the service loop has exited
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    async fn send(&self, cmd: ServiceCommand) -> Result<(), ServiceError> {
        self.cmd_tx.send(cmd).await.map_err(|_| ServiceError::Closed)
    }
}

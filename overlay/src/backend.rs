use std::future::Future;

use subathon_core::state::{AddTimeRequest, StatePatch, TimerView};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
}

/// The operations a replica forwards to the authoritative timer.
pub trait TimerBackend {
    fn fetch_state(&self) -> impl Future<Output = Result<TimerView, BackendError>> + Send;

    fn start(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn pause(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn reset(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn set_time(&self, seconds: i64) -> impl Future<Output = Result<TimerView, BackendError>> + Send;

    fn add_time(
        &self,
        request: AddTimeRequest,
    ) -> impl Future<Output = Result<TimerView, BackendError>> + Send;

    fn merge(&self, patch: StatePatch) -> impl Future<Output = Result<TimerView, BackendError>> + Send;
}

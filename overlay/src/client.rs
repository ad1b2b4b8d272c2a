use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use subathon_core::RawEvent;
use subathon_core::state::{
    Ack, AddBitsRequest, AddTimeRequest, ErrorBody, MutationResponse, SetGoalRequest,
    SetTimeRequest, StatePatch, TimerView,
};

use crate::backend::{BackendError, TimerBackend};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the timer service's `/api` routes.
#[derive(Debug, Clone)]
pub struct SyncClient {
    client: Client,
    base_url: String,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn state(&self) -> Result<TimerView, BackendError> {
        let response = self
            .client
            .get(self.url("/api/timer"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn set_goal(&self, timestamp: Option<DateTime<Utc>>) -> Result<TimerView, BackendError> {
        self.mutate("/api/setgoal", &SetGoalRequest { timestamp }).await
    }

    pub async fn add_bits(&self, bits: u64) -> Result<TimerView, BackendError> {
        self.mutate("/api/addbits", &AddBitsRequest { bits }).await
    }

    pub async fn reset_list(&self) -> Result<(), BackendError> {
        self.command("/api/resetlist").await
    }

    pub async fn full_reset(&self) -> Result<(), BackendError> {
        self.command("/api/fullreset").await
    }

    /// Submit one raw notification as if it came from the feed.
    pub async fn feed(&self, event: &RawEvent) -> Result<TimerView, BackendError> {
        self.mutate("/api/feed", event).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn mutate<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<TimerView, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let MutationResponse { data, .. } = decode(response).await?;
        Ok(data)
    }

    async fn command(&self, path: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let _: Ack = decode(response).await?;
        Ok(())
    }
}

/// Decode a success body, or turn an `{error}` body into [`BackendError::Status`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

impl TimerBackend for SyncClient {
    async fn fetch_state(&self) -> Result<TimerView, BackendError> {
        self.state().await
    }

    async fn start(&self) -> Result<(), BackendError> {
        self.command("/api/start").await
    }

    async fn pause(&self) -> Result<(), BackendError> {
        self.command("/api/pause").await
    }

    async fn reset(&self) -> Result<(), BackendError> {
        self.command("/api/reset").await
    }

    async fn set_time(&self, seconds: i64) -> Result<TimerView, BackendError> {
        self.mutate("/api/settime", &SetTimeRequest { seconds }).await
    }

    async fn add_time(&self, request: AddTimeRequest) -> Result<TimerView, BackendError> {
        self.mutate("/api/addtime", &request).await
    }

    async fn merge(&self, patch: StatePatch) -> Result<TimerView, BackendError> {
        self.mutate("/api/timer", &patch).await
    }
}

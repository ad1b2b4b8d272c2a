//! HTTP surface of the timer service
//!
//! Every handler is a thin translation from JSON to a [`ServiceHandle`] call.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use subathon_core::RawEvent;
use subathon_core::state::{
    Ack, AddBitsRequest, AddTimeRequest, ErrorBody, MutationResponse, SetGoalRequest,
    SetTimeRequest, StatePatch, TimerView,
};

use crate::service::{ServiceError, ServiceHandle};

pub fn router(handle: ServiceHandle) -> Router {
    Router::new()
        .route("/api/timer", get(get_state).post(merge_state))
        .route("/api/addtime", post(add_time))
        .route("/api/start", post(start))
        .route("/api/pause", post(pause))
        .route("/api/reset", post(reset))
        .route("/api/settime", post(set_time))
        .route("/api/setgoal", post(set_goal))
        .route("/api/addbits", post(add_bits))
        .route("/api/resetlist", post(reset_list))
        .route("/api/fullreset", post(full_reset))
        .route("/api/feed", post(feed))
        .fallback(not_found)
        .with_state(handle)
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest(String),
    Unavailable,
    NotFound,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Closed => ApiError::Unavailable,
            ServiceError::Write(e) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "timer service is not running".to_string(),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn mutated(view: TimerView) -> ApiResult<MutationResponse> {
    Ok(Json(MutationResponse::ok(view)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn get_state(State(handle): State<ServiceHandle>) -> ApiResult<TimerView> {
    Ok(Json(handle.state().await?))
}

async fn merge_state(
    State(handle): State<ServiceHandle>,
    payload: Result<Json<StatePatch>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Json(patch) = payload?;
    mutated(handle.merge(patch).await?)
}

async fn add_time(
    State(handle): State<ServiceHandle>,
    payload: Result<Json<AddTimeRequest>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Json(request) = payload?;
    mutated(handle.add_time(request).await?)
}

async fn start(State(handle): State<ServiceHandle>) -> ApiResult<Ack> {
    handle.start().await?;
    Ok(Json(Ack::OK))
}

async fn pause(State(handle): State<ServiceHandle>) -> ApiResult<Ack> {
    handle.pause().await?;
    Ok(Json(Ack::OK))
}

async fn reset(State(handle): State<ServiceHandle>) -> ApiResult<Ack> {
    handle.reset().await?;
    Ok(Json(Ack::OK))
}

async fn set_time(
    State(handle): State<ServiceHandle>,
    payload: Result<Json<SetTimeRequest>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Json(request) = payload?;
    mutated(handle.set_time(request.seconds).await?)
}

async fn set_goal(
    State(handle): State<ServiceHandle>,
    payload: Result<Json<SetGoalRequest>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Json(request) = payload?;
    mutated(handle.set_goal(request.timestamp).await?)
}

async fn add_bits(
    State(handle): State<ServiceHandle>,
    payload: Result<Json<AddBitsRequest>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Json(request) = payload?;
    mutated(handle.add_bits(request.bits).await?)
}

async fn reset_list(State(handle): State<ServiceHandle>) -> ApiResult<Ack> {
    handle.reset_list().await?;
    Ok(Json(Ack::OK))
}

async fn full_reset(State(handle): State<ServiceHandle>) -> ApiResult<Ack> {
    handle.full_reset().await?;
    Ok(Json(Ack::OK))
}

async fn feed(
    State(handle): State<ServiceHandle>,
    payload: Result<Json<RawEvent>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Json(event) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            handle.notification_dropped().await?;
            return Err(rejection.into());
        }
    };
    mutated(handle.ingest(event).await?)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

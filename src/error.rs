use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::time::Duration;

/// Rejected startup configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rate limit must be at least 1 request per window")]
    ZeroLimit,
    #[error("rate limit window must be longer than zero")]
    ZeroWindow,
    #[error("filter pipeline needs at least one worker")]
    ZeroWorkers,
}

/// Failures reported by the storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(u64),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

/// Everything a handler can fail with, mapped onto an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
    #[error("missing or invalid user identity")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "too_many_requests"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Store(StoreError::Unavailable(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "retrieval_failed")
            }
            AppError::Filter(_) => (StatusCode::SERVICE_UNAVAILABLE, "filter_timeout"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, retry_after) = match &self {
            AppError::RateLimited { retry_after } => (
                "Rate limit exceeded. Please try again later.".to_string(),
                Some(retry_after.as_secs().max(1)),
            ),
            // storage internals stay in the logs
            AppError::Store(StoreError::Unavailable(reason)) => {
                tracing::error!(%reason, "task retrieval failed");
                ("Failed to retrieve tasks".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let mut response = (
            status,
            Json(ErrorBody {
                error: code,
                message,
                retry_after,
            }),
        )
            .into_response();

        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

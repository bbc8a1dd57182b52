use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::schedule::ScheduleError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the lesson handlers.
///
/// Every variant is reported to the client as `400 Bad Request`; nothing is
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed recurrence rule or request body.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Malformed listing filter or a storage failure while listing.
    #[error("query execution failed: {0}")]
    QueryExecution(#[source] BoxError),

    /// Storage failure while creating lessons.
    #[error("insert execution failed: {0}")]
    InsertExecution(#[source] BoxError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn query<E: Into<BoxError>>(err: E) -> Self {
        Self::QueryExecution(err.into())
    }

    pub fn insert<E: Into<BoxError>>(err: E) -> Self {
        Self::InsertExecution(err.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInputError",
            Self::QueryExecution(_) => "QueryExecutionError",
            Self::InsertExecution(_) => "InsertExecutionError",
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::InvalidInput(msg) => tracing::warn!(error = %msg, "rejected request"),
            Self::QueryExecution(err) | Self::InsertExecution(err) => {
                tracing::error!(kind = self.kind(), error = %err, "request failed")
            }
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

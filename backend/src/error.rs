use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Faults the service does not recover from.
///
/// Every variant maps to a bare 500; the cause only reaches the log.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("no expression supplied")]
    MissingExpression,

    #[error("evaluation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("could not encode result: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

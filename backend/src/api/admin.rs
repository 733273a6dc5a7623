use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::calc;
use crate::error::AppError;

#[derive(Deserialize)]
pub struct CalcQuery {
    pub expr: Option<String>,
}

#[derive(Serialize)]
pub struct CalcResponse {
    pub result: Value,
}

/// Runs whatever script the caller sends. No whitelist, no size cap.
///
/// Scripts may never terminate, so they run on the blocking pool and keep
/// the async workers free for other routes.
pub async fn calculate(Query(params): Query<CalcQuery>) -> Result<Json<CalcResponse>, AppError> {
    let expr = params.expr.ok_or(AppError::MissingExpression)?;
    tracing::warn!(%expr, "evaluating admin expression");

    let result = tokio::task::spawn_blocking(move || calc::evaluate(&expr)).await??;
    Ok(Json(CalcResponse { result }))
}

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::Connection;
use std::sync::Arc;

use crate::api::server::AppState;
use crate::db::repo;
use crate::error::AppError;

#[derive(Deserialize)]
pub struct UserQuery {
    pub id: Option<String>,
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Response, AppError> {
    let raw_id = params.id.unwrap_or_default();

    // One connection per request, closed before we answer
    let mut conn = repo::connect(&state.db).await?;
    let lookup = repo::find_user_unescaped(&mut conn, &raw_id).await;
    conn.close().await?;

    match lookup? {
        Some(user) => Ok(Json(user).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response()),
    }
}

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::api::server::AppState;

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

pub async fn generate_token(State(state): State<Arc<AppState>>) -> Json<TokenResponse> {
    Json(TokenResponse {
        token: state.tokens.next_token(),
    })
}

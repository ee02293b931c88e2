use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::state::AppState;

/// X25519 key that role openings and investigation results are sealed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientKey {
    pub player_id: String,
    pub public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterKeyResponse {
    pub success: bool,
    pub player_id: String,
    pub public_key: String,
}

pub async fn register_key(
    State(state): State<AppState>,
    Json(payload): Json<RecipientKey>,
) -> Result<impl IntoResponse, GameError> {
    state
        .vault
        .register_recipient(&payload.player_id, &payload.public_key)
        .await
        .map_err(|e| GameError::MalformedInput(e.to_string()))?;
    Ok((
        StatusCode::OK,
        Json(RegisterKeyResponse {
            success: true,
            player_id: payload.player_id,
            public_key: payload.public_key,
        }),
    ))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(register_key))
        .with_state(state)
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use role_vault::RevealProof;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::models::role::{ActionKind, Role};
use crate::models::rule::GameConfig;
use crate::state::AppState;
use crate::utils::websocket;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub player_id: String,
    /// Hex-encoded 32 bytes mixed into the role shuffle seed.
    #[serde(default)]
    pub entropy: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NightActionRequest {
    pub player_id: String,
    pub action: ActionKind,
    pub target_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteAction {
    pub voter_id: String,
    pub target_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevealRequest {
    pub player_id: String,
    pub role: Role,
    pub proof: RevealProof,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevealResponse {
    pub success: bool,
    pub player_id: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // curl -X POST http://localhost:8080/api/game -d '{"player_count":5,"werewolf_count":1}'
        .route("/", post(create_session).get(list_sessions))
        .nest(
            "/:session_id",
            Router::new()
                .route("/", get(get_state).delete(remove_session))
                .route("/join", post(join))
                .route("/reveal", post(reveal_role))
                .route("/events", get(get_events))
                .route("/ws", get(websocket::handler))
                .nest(
                    "/actions",
                    Router::new()
                        .route("/night", post(night_action))
                        .route("/vote", post(cast_vote)),
                )
                .route("/players/:player_id/role-envelope", get(role_envelope))
                .route("/players/:player_id/private-results", get(private_results)),
        )
        .with_state(state)
}

fn ack(message: impl Into<String>) -> Json<Ack> {
    Json(Ack {
        success: true,
        message: message.into(),
    })
}

fn parse_entropy(encoded: &str) -> Result<[u8; 32], GameError> {
    let bytes = hex::decode(encoded).map_err(|e| GameError::MalformedInput(e.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| GameError::MalformedInput("entropy must be 32 bytes".to_string()))
}

async fn create_session(
    State(state): State<AppState>,
    Json(config): Json<GameConfig>,
) -> Result<impl IntoResponse, GameError> {
    let session_id = state.sessions.create_session(config).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            success: true,
            session_id,
        }),
    ))
}

async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sessions.list_sessions().await)
}

async fn get_state(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, GameError> {
    Ok(Json(state.sessions.get_state(&session_id).await?))
}

async fn remove_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, GameError> {
    state.sessions.remove_session(&session_id).await?;
    Ok(ack(format!("{} removed", session_id)))
}

async fn join(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<JoinRequest>,
) -> Result<impl IntoResponse, GameError> {
    let entropy = request.entropy.as_deref().map(parse_entropy).transpose()?;
    state
        .sessions
        .join_with_entropy(&session_id, &request.player_id, entropy)
        .await?;
    Ok(ack(format!("{} joined", request.player_id)))
}

async fn night_action(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<NightActionRequest>,
) -> Result<impl IntoResponse, GameError> {
    state
        .sessions
        .submit_night_action(
            &session_id,
            &request.player_id,
            request.action,
            &request.target_id,
        )
        .await?;
    Ok(ack("Night action accepted"))
}

async fn cast_vote(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(vote): Json<VoteAction>,
) -> Result<impl IntoResponse, GameError> {
    state
        .sessions
        .submit_vote(&session_id, &vote.voter_id, &vote.target_id)
        .await?;
    Ok(ack("Vote accepted"))
}

async fn reveal_role(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<RevealRequest>,
) -> Result<impl IntoResponse, GameError> {
    let role = state
        .sessions
        .reveal_role(&session_id, &request.player_id, request.role, &request.proof)
        .await?;
    Ok(Json(RevealResponse {
        success: true,
        player_id: request.player_id,
        role,
    }))
}

async fn get_events(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, GameError> {
    Ok(Json(state.sessions.events(&session_id, query.since).await?))
}

async fn role_envelope(
    State(state): State<AppState>,
    Path((session_id, player_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, GameError> {
    Ok(Json(state.sessions.role_envelope(&session_id, &player_id).await?))
}

async fn private_results(
    State(state): State<AppState>,
    Path((session_id, player_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, GameError> {
    Ok(Json(
        state
            .sessions
            .private_results(&session_id, &player_id)
            .await?,
    ))
}

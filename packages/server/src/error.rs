use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use role_vault::VaultError;
use serde::Serialize;
use thiserror::Error;

use crate::models::game::Phase;
use crate::models::role::ActionKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid game configuration: {0}")]
    InvalidConfig(String),
    #[error("Session {0} not found")]
    SessionNotFound(String),
    #[error("Session is full")]
    SessionFull,
    #[error("Player {0} already joined")]
    AlreadyJoined(String),
    #[error("Session is no longer accepting players")]
    SessionNotInLobby,
    #[error("Roles were already assigned for this session")]
    AssignmentAlreadyDone,
    #[error("Not allowed during the {0:?} phase")]
    WrongPhase(Phase),
    #[error("Player {0} is dead")]
    ActorDead(String),
    #[error("Player {0} is not in this session")]
    UnknownPlayer(String),
    #[error("Invalid target {0}")]
    InvalidTarget(String),
    #[error("Player's role cannot perform {0:?}")]
    RoleMismatch(ActionKind),
    #[error("Players may not vote for themselves")]
    SelfVote,
    #[error("Player {0} already revealed")]
    AlreadyRevealed(String),
    #[error("Reveal proof is invalid")]
    ProofInvalid,
    #[error("Unrecognized role")]
    InvalidRole,
    #[error("Malformed request: {0}")]
    MalformedInput(String),
    #[error("Cannot move from {from:?} to {to:?}")]
    IllegalTransition { from: Phase, to: Phase },
    #[error("Confidential value adapter failed: {0}")]
    Adapter(VaultError),
}

impl From<VaultError> for GameError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::ProofInvalid => GameError::ProofInvalid,
            other => GameError::Adapter(other),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl GameError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            GameError::UnknownPlayer(_) => StatusCode::NOT_FOUND,
            GameError::InvalidConfig(_) | GameError::InvalidRole => StatusCode::BAD_REQUEST,
            GameError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            GameError::InvalidTarget(_) | GameError::SelfVote => StatusCode::BAD_REQUEST,
            GameError::ProofInvalid => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::RoleMismatch(_) => StatusCode::FORBIDDEN,
            GameError::ActorDead(_) => StatusCode::FORBIDDEN,
            GameError::Adapter(VaultError::UnknownRecipient(_)) => StatusCode::PRECONDITION_FAILED,
            GameError::Adapter(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

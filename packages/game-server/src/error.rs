use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::services::errors::{
    game_service_errors::GameServiceError, queue_service_errors::QueueServiceError,
};

#[derive(Debug, PartialEq)]
pub enum ApiError {
    InvalidMessage(String),
    InvalidGameId,
    GameNotFound,
    NotInGame,
    IllegalMove(String),
    GameService(GameServiceError),
    QueueService(QueueServiceError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            ApiError::InvalidGameId => write!(f, "Invalid game ID"),
            ApiError::GameNotFound => write!(f, "Game not found"),
            ApiError::NotInGame => write!(f, "You have not joined a game"),
            ApiError::IllegalMove(uci) => write!(f, "Illegal move: {}", uci),
            ApiError::GameService(err) => write!(f, "{}", err),
            ApiError::QueueService(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<GameServiceError> for ApiError {
    fn from(error: GameServiceError) -> Self {
        ApiError::GameService(error)
    }
}

impl From<QueueServiceError> for ApiError {
    fn from(error: QueueServiceError) -> Self {
        ApiError::QueueService(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidMessage(_)
            | ApiError::InvalidGameId
            | ApiError::IllegalMove(_)
            | ApiError::GameService(GameServiceError::ValidationError(_))
            | ApiError::QueueService(QueueServiceError::UnknownQueue { .. })
            | ApiError::QueueService(QueueServiceError::InvalidIdentity) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::GameNotFound => StatusCode::NOT_FOUND,
            ApiError::NotInGame
            | ApiError::GameService(GameServiceError::NotParticipant)
            | ApiError::GameService(GameServiceError::CannotJoin) => StatusCode::FORBIDDEN,
            ApiError::GameService(_) | ApiError::QueueService(_) => StatusCode::CONFLICT,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

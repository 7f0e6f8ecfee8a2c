use std::fmt;

use crate::services::errors::game_service_errors::GameServiceError;

#[derive(Debug, PartialEq)]
pub enum QueueServiceError {
    AlreadyQueuing,
    NotQueuing,
    InvalidIdentity,
    UnknownQueue { game_mode: String, time_control: u64 },
    GameServiceError(GameServiceError),
}

impl fmt::Display for QueueServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueueServiceError::AlreadyQueuing => write!(f, "Player is already in a queue"),
            QueueServiceError::NotQueuing => write!(f, "Player is not in a queue"),
            QueueServiceError::InvalidIdentity => {
                write!(f, "A placeholder player cannot be queued")
            }
            QueueServiceError::UnknownQueue {
                game_mode,
                time_control,
            } => write!(
                f,
                "Invalid game mode or time control: {} {}",
                game_mode, time_control
            ),
            QueueServiceError::GameServiceError(err) => write!(f, "Game service error: {}", err),
        }
    }
}

impl std::error::Error for QueueServiceError {}

impl From<GameServiceError> for QueueServiceError {
    fn from(err: GameServiceError) -> Self {
        QueueServiceError::GameServiceError(err)
    }
}

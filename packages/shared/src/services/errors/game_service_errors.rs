use std::fmt;

#[derive(Debug, PartialEq)]
pub enum GameServiceError {
    ValidationError(String),
    NotParticipant,
    NotYourTurn,
    GameNotStarted,
    GameFinished,
    CannotJoin,
}

impl fmt::Display for GameServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GameServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            GameServiceError::NotParticipant => write!(f, "You are not a player in this game"),
            GameServiceError::NotYourTurn => write!(f, "Not your turn"),
            GameServiceError::GameNotStarted => write!(f, "Game has not started"),
            GameServiceError::GameFinished => write!(f, "Game is already over"),
            GameServiceError::CannotJoin => write!(f, "Cannot join this game"),
        }
    }
}

impl std::error::Error for GameServiceError {}

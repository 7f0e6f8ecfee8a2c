use std::fmt;

/// Failures while storing a completed game. Every variant names the game.
#[derive(Debug, PartialEq)]
pub enum GameRepositoryError {
    Serialization { game_id: String, reason: String },
    AlreadyStored { game_id: String },
    DynamoDb { game_id: String, reason: String },
}

impl GameRepositoryError {
    pub fn game_id(&self) -> &str {
        match self {
            GameRepositoryError::Serialization { game_id, .. }
            | GameRepositoryError::AlreadyStored { game_id }
            | GameRepositoryError::DynamoDb { game_id, .. } => game_id,
        }
    }
}

impl fmt::Display for GameRepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameRepositoryError::Serialization { game_id, reason } => {
                write!(f, "Could not serialize game {}: {}", game_id, reason)
            }
            GameRepositoryError::AlreadyStored { game_id } => {
                write!(f, "Game {} is already stored", game_id)
            }
            GameRepositoryError::DynamoDb { game_id, reason } => {
                write!(f, "DynamoDB error storing game {}: {}", game_id, reason)
            }
        }
    }
}

impl std::error::Error for GameRepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_name_the_game() {
        let error = GameRepositoryError::AlreadyStored {
            game_id: "abcd1234".to_string(),
        };

        assert_eq!(error.game_id(), "abcd1234");
        assert_eq!(error.to_string(), "Game abcd1234 is already stored");
    }
}

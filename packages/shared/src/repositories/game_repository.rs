use async_trait::async_trait;
use aws_sdk_dynamodb::{error::SdkError, Client};
use parking_lot::Mutex;
use serde_dynamo::aws_sdk_dynamodb_1::to_item;

use crate::models::game::CompletedGame;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;

/// Store for finished games. Written once per game, never for aborted ones.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn save_completed_game(&self, game: &CompletedGame) -> Result<(), GameRepositoryError>;
}

pub struct DynamoDbGameRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbGameRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

#[async_trait]
impl GameRepository for DynamoDbGameRepository {
    async fn save_completed_game(&self, game: &CompletedGame) -> Result<(), GameRepositoryError> {
        let item = to_item(game).map_err(|e| GameRepositoryError::Serialization {
            game_id: game.game_id.clone(),
            reason: e.to_string(),
        })?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(game_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(GameRepositoryError::AlreadyStored {
                            game_id: game.game_id.clone(),
                        });
                    }
                }
                Err(GameRepositoryError::DynamoDb {
                    game_id: game.game_id.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Keeps completed games in memory. Used when no table is configured.
#[derive(Default)]
pub struct InMemoryGameRepository {
    games: Mutex<Vec<CompletedGame>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn games(&self) -> Vec<CompletedGame> {
        self.games.lock().clone()
    }

    pub fn find(&self, game_id: &str) -> Option<CompletedGame> {
        self.games
            .lock()
            .iter()
            .find(|game| game.game_id == game_id)
            .cloned()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn save_completed_game(&self, game: &CompletedGame) -> Result<(), GameRepositoryError> {
        let mut games = self.games.lock();
        if games.iter().any(|stored| stored.game_id == game.game_id) {
            return Err(GameRepositoryError::AlreadyStored {
                game_id: game.game_id.clone(),
            });
        }
        games.push(game.clone());
        Ok(())
    }
}

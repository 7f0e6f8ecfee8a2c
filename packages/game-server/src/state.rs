use std::sync::Arc;

use shared::{
    models::game_mode::GameMode,
    repositories::{friend_repository::FriendRepository, game_repository::GameRepository},
    services::{game_registry::GameRegistry, group_registry::GroupRegistry},
};

#[derive(Clone)]
pub struct AppState {
    pub registry: GameRegistry,
    pub groups: Arc<GroupRegistry>,
    pub modes: Arc<Vec<GameMode>>,
}

impl AppState {
    pub fn new(
        modes: Vec<GameMode>,
        game_repository: Arc<dyn GameRepository + Send + Sync>,
        friend_repository: Arc<dyn FriendRepository + Send + Sync>,
    ) -> Self {
        let registry = GameRegistry::new(game_repository, friend_repository);
        let groups = Arc::new(GroupRegistry::new(modes.clone(), registry.clone()));
        AppState {
            registry,
            groups,
            modes: Arc::new(modes),
        }
    }
}

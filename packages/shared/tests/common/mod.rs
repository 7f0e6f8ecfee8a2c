use std::sync::Arc;

use shared::{
    models::{game_mode::active_game_modes, messages::ServerMessage},
    repositories::{
        friend_repository::InMemoryFriendRepository, game_repository::InMemoryGameRepository,
    },
    services::{game_registry::GameRegistry, group_registry::GroupRegistry},
};
use tokio::sync::mpsc;

/// Fully wired core backed by in-memory stores.
pub struct TestCore {
    pub games: Arc<InMemoryGameRepository>,
    pub friends: Arc<InMemoryFriendRepository>,
    pub registry: GameRegistry,
    pub groups: GroupRegistry,
}

impl TestCore {
    pub fn new() -> Self {
        let games = Arc::new(InMemoryGameRepository::new());
        let friends = Arc::new(InMemoryFriendRepository::new());
        let registry = GameRegistry::new(games.clone(), friends.clone());
        let groups = GroupRegistry::new(active_game_modes(), registry.clone());
        Self {
            games,
            friends,
            registry,
            groups,
        }
    }
}

/// Lets spawned game and timer tasks run.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn drain(receiver: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = receiver.try_recv() {
        messages.push(message);
    }
    messages
}

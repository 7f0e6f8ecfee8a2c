use std::sync::Arc;
use std::time::Duration;

use dashmap::{mapref::entry::Entry, DashMap};
use rand::seq::SliceRandom;
use tracing::info;

use crate::{
    models::{game::GameId, identity::Identity},
    repositories::{friend_repository::FriendRepository, game_repository::GameRepository},
    services::{
        errors::game_service_errors::GameServiceError,
        game::{Game, GameContext, GameHandle, GameTimings},
        participants::ParticipantPair,
    },
};

/// All active games by id. Cloning shares the same map.
#[derive(Clone)]
pub struct GameRegistry {
    games: Arc<DashMap<GameId, GameHandle>>,
    game_repository: Arc<dyn GameRepository + Send + Sync>,
    friend_repository: Arc<dyn FriendRepository + Send + Sync>,
    timings: GameTimings,
}

impl GameRegistry {
    pub fn new(
        game_repository: Arc<dyn GameRepository + Send + Sync>,
        friend_repository: Arc<dyn FriendRepository + Send + Sync>,
    ) -> Self {
        Self::with_timings(game_repository, friend_repository, GameTimings::default())
    }

    pub fn with_timings(
        game_repository: Arc<dyn GameRepository + Send + Sync>,
        friend_repository: Arc<dyn FriendRepository + Send + Sync>,
        timings: GameTimings,
    ) -> Self {
        GameRegistry {
            games: Arc::new(DashMap::new()),
            game_repository,
            friend_repository,
            timings,
        }
    }

    /// Creates and registers a game between `first` and `second`, which may be
    /// a placeholder for a link game. Colours are assigned at random.
    pub fn start_game(
        &self,
        first: Identity,
        second: Identity,
        mode: &str,
        time_control: u64,
        is_link_game: bool,
    ) -> Result<GameHandle, GameServiceError> {
        if first.is_placeholder() {
            return Err(GameServiceError::ValidationError(
                "The first player must be known".to_string(),
            ));
        }

        let mut players = [first, second];
        players.shuffle(&mut rand::thread_rng());
        let [white, black] = players;
        let participants =
            ParticipantPair::new(white, black, Duration::from_secs(time_control))?;

        loop {
            let id = GameId::random();
            if let Entry::Vacant(entry) = self.games.entry(id.clone()) {
                let context = GameContext {
                    registry: self.clone(),
                    game_repository: self.game_repository.clone(),
                    friend_repository: self.friend_repository.clone(),
                    timings: self.timings,
                };
                let handle =
                    Game::spawn(id, mode, time_control, is_link_game, participants, context);
                entry.insert(handle.clone());
                info!(
                    "Created game {} ({} {}s, link game: {})",
                    handle.id(),
                    mode,
                    time_control,
                    is_link_game
                );
                return Ok(handle);
            }
        }
    }

    pub fn get_game(&self, id: &GameId) -> Option<GameHandle> {
        self.games.get(id).map(|entry| entry.value().clone())
    }

    /// Removes `id` if present.
    pub fn remove_game(&self, id: &GameId) {
        self.games.remove(id);
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::{Color, GameStatus};
    use crate::repositories::friend_repository::InMemoryFriendRepository;
    use crate::repositories::game_repository::InMemoryGameRepository;

    fn registry() -> GameRegistry {
        GameRegistry::new(
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(InMemoryFriendRepository::new()),
        )
    }

    #[tokio::test]
    async fn test_start_and_get_game() {
        let registry = registry();
        let alice = Identity::registered("u1", "alice");
        let guest = Identity::anonymous("s1");

        let game = registry
            .start_game(alice.clone(), guest.clone(), "Rapid", 600, false)
            .unwrap();

        assert_eq!(registry.len(), 1);
        let found = registry.get_game(game.id()).unwrap();
        assert_eq!(found.mode(), "Rapid");
        assert_eq!(found.time_control(), 600);
        assert!(!found.is_link_game());

        let snapshot = found.snapshot().await.unwrap();
        assert_eq!(snapshot.status, GameStatus::NotStarted);
        assert_ne!(snapshot.white, snapshot.black);
        assert!(snapshot.white == alice || snapshot.black == alice);
        assert!(snapshot.white == guest || snapshot.black == guest);
        assert_eq!(snapshot.white_time, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_colors_are_assigned_both_ways() {
        let registry = registry();
        let alice = Identity::registered("u1", "alice");
        let mut white_counts = [0, 0];

        for i in 0..64 {
            let game = registry
                .start_game(
                    alice.clone(),
                    Identity::anonymous(&format!("s{}", i)),
                    "Blitz",
                    120,
                    false,
                )
                .unwrap();
            let snapshot = game.snapshot().await.unwrap();
            let alice_color = if snapshot.white == alice {
                Color::White
            } else {
                Color::Black
            };
            white_counts[alice_color.index()] += 1;
        }

        assert!(white_counts[0] > 0);
        assert!(white_counts[1] > 0);
        assert_eq!(registry.len(), 64);
    }

    #[tokio::test]
    async fn test_rejects_invalid_players() {
        let registry = registry();
        let alice = Identity::registered("u1", "alice");

        assert!(registry
            .start_game(Identity::Placeholder, alice.clone(), "Blitz", 120, true)
            .is_err());
        assert!(registry
            .start_game(alice.clone(), alice, "Blitz", 120, false)
            .is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_game_is_idempotent() {
        let registry = registry();
        let game = registry
            .start_game(
                Identity::anonymous("s1"),
                Identity::anonymous("s2"),
                "Bullet",
                60,
                false,
            )
            .unwrap();

        registry.remove_game(game.id());
        registry.remove_game(game.id());

        assert!(registry.get_game(game.id()).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timings_apply_to_new_games() {
        let registry = GameRegistry::with_timings(
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(InMemoryFriendRepository::new()),
            GameTimings {
                matchmade_abort: Duration::from_secs(2),
                ..GameTimings::default()
            },
        );
        let game = registry
            .start_game(
                Identity::anonymous("s1"),
                Identity::anonymous("s2"),
                "Blitz",
                120,
                false,
            )
            .unwrap();

        tokio::time::advance(Duration::from_secs(3)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        assert!(game.is_finished());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_absent() {
        let registry = registry();

        assert!(registry
            .get_game(&GameId::parse("abcd1234").unwrap())
            .is_none());
    }
}

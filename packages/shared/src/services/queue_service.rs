use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    models::{game_mode::GameMode, identity::Identity},
    services::{
        errors::queue_service_errors::QueueServiceError, game::GameHandle,
        game_registry::GameRegistry,
    },
};

/// Called once with the new game when a queued player is matched.
pub type OnMatched = Box<dyn FnOnce(&GameHandle) + Send>;

/// Identifies one queue: a configured mode name and one of its time controls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
    pub game_mode: String,
    pub time_control: u64,
}

impl QueueKey {
    pub fn new(game_mode: &str, time_control: u64) -> Self {
        QueueKey {
            game_mode: game_mode.to_string(),
            time_control,
        }
    }
}

/// Players waiting for one mode and time control, oldest first.
#[derive(Debug)]
pub struct GameQueue {
    key: QueueKey,
    waiting: VecDeque<Identity>,
}

impl GameQueue {
    pub fn new(key: QueueKey) -> Self {
        GameQueue {
            key,
            waiting: VecDeque::new(),
        }
    }

    pub fn key(&self) -> &QueueKey {
        &self.key
    }

    pub fn add(&mut self, identity: Identity) -> Result<(), QueueServiceError> {
        if self.contains(&identity) {
            return Err(QueueServiceError::AlreadyQueuing);
        }
        self.waiting.push_back(identity);
        Ok(())
    }

    pub fn remove(&mut self, identity: &Identity) -> Result<(), QueueServiceError> {
        let position = self
            .waiting
            .iter()
            .position(|waiting| waiting == identity)
            .ok_or(QueueServiceError::NotQueuing)?;
        self.waiting.remove(position);
        Ok(())
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.waiting.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Takes the two longest-waiting players, if there are two.
    fn pop_pair(&mut self) -> Option<(Identity, Identity)> {
        if self.waiting.len() < 2 {
            return None;
        }
        let first = self.waiting.pop_front()?;
        let second = self.waiting.pop_front()?;
        Some((first, second))
    }

    pub fn waiting(&self) -> impl Iterator<Item = &Identity> {
        self.waiting.iter()
    }
}

struct QueuingPlayer {
    queue: usize,
    on_matched: OnMatched,
}

struct QueueState {
    queues: Vec<GameQueue>,
    queuing: HashMap<Identity, QueuingPlayer>,
}

struct Match {
    key: QueueKey,
    first: (Identity, OnMatched),
    second: (Identity, OnMatched),
}

/// One queue per configured mode and time control. A player waits in at most
/// one of them; the first two waiters of a queue are paired into a game.
pub struct QueueManager {
    state: Mutex<QueueState>,
    registry: GameRegistry,
}

impl QueueManager {
    pub fn new(modes: &[GameMode], registry: GameRegistry) -> Self {
        let queues = modes
            .iter()
            .flat_map(|mode| {
                mode.time_controls
                    .iter()
                    .map(|time_control| GameQueue::new(QueueKey::new(&mode.name, *time_control)))
            })
            .collect();

        QueueManager {
            state: Mutex::new(QueueState {
                queues,
                queuing: HashMap::new(),
            }),
            registry,
        }
    }

    /// Finds the queue for a mode name (any case) and exact time control.
    pub fn lookup_queue(&self, game_mode: &str, time_control: u64) -> Option<QueueKey> {
        self.state
            .lock()
            .queues
            .iter()
            .map(GameQueue::key)
            .find(|key| {
                key.game_mode.eq_ignore_ascii_case(game_mode) && key.time_control == time_control
            })
            .cloned()
    }

    /// Queues `identity`. If this completes a pair, the game is started and
    /// both players' callbacks run before the game is returned.
    pub fn add_player(
        &self,
        identity: Identity,
        key: &QueueKey,
        on_matched: OnMatched,
    ) -> Result<Option<GameHandle>, QueueServiceError> {
        if identity.is_placeholder() {
            return Err(QueueServiceError::InvalidIdentity);
        }

        let matched = {
            let mut state = self.state.lock();
            if state.queuing.contains_key(&identity) {
                return Err(QueueServiceError::AlreadyQueuing);
            }
            let index = state
                .queues
                .iter()
                .position(|queue| queue.key() == key)
                .ok_or_else(|| QueueServiceError::UnknownQueue {
                    game_mode: key.game_mode.clone(),
                    time_control: key.time_control,
                })?;

            state.queues[index].add(identity.clone())?;
            state.queuing.insert(
                identity.clone(),
                QueuingPlayer {
                    queue: index,
                    on_matched,
                },
            );
            debug!("{} queued for {} {}s", identity, key.game_mode, key.time_control);

            Self::take_match(&mut state, index)
        };

        let Some(Match { key, first, second }) = matched else {
            return Ok(None);
        };

        let (first_identity, first_callback) = first;
        let (second_identity, second_callback) = second;
        info!(
            "Matched {} with {} for {} {}s",
            first_identity, second_identity, key.game_mode, key.time_control
        );

        let game = self.registry.start_game(
            first_identity,
            second_identity,
            &key.game_mode,
            key.time_control,
            false,
        )?;
        first_callback(&game);
        second_callback(&game);

        Ok(Some(game))
    }

    fn take_match(state: &mut QueueState, index: usize) -> Option<Match> {
        let (first, second) = state.queues[index].pop_pair()?;
        let first_player = state.queuing.remove(&first)?;
        let second_player = state.queuing.remove(&second)?;

        Some(Match {
            key: state.queues[index].key().clone(),
            first: (first, first_player.on_matched),
            second: (second, second_player.on_matched),
        })
    }

    pub fn remove_player(&self, identity: &Identity) -> Result<(), QueueServiceError> {
        let mut state = self.state.lock();
        let player = state
            .queuing
            .remove(identity)
            .ok_or(QueueServiceError::NotQueuing)?;
        state.queues[player.queue].remove(identity)?;
        debug!("{} left the queue", identity);
        Ok(())
    }

    pub fn is_queuing(&self, identity: &Identity) -> bool {
        self.state.lock().queuing.contains_key(identity)
    }

    pub fn queuing_count(&self) -> usize {
        self.state.lock().queuing.len()
    }

    /// Waiting players of one queue, oldest first.
    pub fn waiting_players(&self, key: &QueueKey) -> Vec<Identity> {
        self.state
            .lock()
            .queues
            .iter()
            .find(|queue| queue.key() == key)
            .map(|queue| queue.waiting().cloned().collect())
            .unwrap_or_default()
    }

    pub fn queues(&self) -> Vec<QueueKey> {
        self.state
            .lock()
            .queues
            .iter()
            .map(|queue| queue.key().clone())
            .collect()
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    models::{game_mode::GameMode, group::Group, identity::Identity},
    services::{
        errors::queue_service_errors::QueueServiceError,
        game::GameHandle,
        game_registry::GameRegistry,
        queue_service::{OnMatched, QueueManager},
    },
};

/// The default queue manager plus one lazily created manager per group.
pub struct GroupRegistry {
    default: Arc<QueueManager>,
    groups: Mutex<HashMap<Group, Arc<QueueManager>>>,
    modes: Vec<GameMode>,
    registry: GameRegistry,
}

impl GroupRegistry {
    pub fn new(modes: Vec<GameMode>, registry: GameRegistry) -> Self {
        GroupRegistry {
            default: Arc::new(QueueManager::new(&modes, registry.clone())),
            groups: Mutex::new(HashMap::new()),
            modes,
            registry,
        }
    }

    pub fn default_manager(&self) -> Arc<QueueManager> {
        self.default.clone()
    }

    /// The manager for `group`, created on first use. `None` is the default
    /// manager.
    pub fn resolve_or_create(&self, group: Option<&Group>) -> Arc<QueueManager> {
        match group {
            None => self.default.clone(),
            Some(group) => Self::resolve_locked(&mut self.groups.lock(), group, || {
                QueueManager::new(&self.modes, self.registry.clone())
            }),
        }
    }

    fn resolve_locked(
        groups: &mut HashMap<Group, Arc<QueueManager>>,
        group: &Group,
        create: impl FnOnce() -> QueueManager,
    ) -> Arc<QueueManager> {
        groups
            .entry(group.clone())
            .or_insert_with(|| {
                info!("Creating queues for group {:?}", group.members());
                Arc::new(create())
            })
            .clone()
    }

    /// Queues `identity` in the manager for `group`. A player queuing in any
    /// manager is rejected with `AlreadyQueuing`. The group map stays locked
    /// for the whole call so a group cannot be dropped while a player is being
    /// added to it. `on_matched` must not call back into this registry.
    pub fn enqueue(
        &self,
        identity: Identity,
        group: Option<&Group>,
        game_mode: &str,
        time_control: u64,
        on_matched: OnMatched,
    ) -> Result<Option<GameHandle>, QueueServiceError> {
        let mut groups = self.groups.lock();
        if self.default.is_queuing(&identity) || groups.values().any(|m| m.is_queuing(&identity)) {
            return Err(QueueServiceError::AlreadyQueuing);
        }

        let manager = match group {
            None => self.default.clone(),
            Some(group) => Self::resolve_locked(&mut groups, group, || {
                QueueManager::new(&self.modes, self.registry.clone())
            }),
        };

        let result = manager
            .lookup_queue(game_mode, time_control)
            .ok_or_else(|| QueueServiceError::UnknownQueue {
                game_mode: game_mode.to_string(),
                time_control,
            })
            .and_then(|key| manager.add_player(identity, &key, on_matched));

        if let Some(group) = group {
            if manager.queuing_count() == 0 {
                groups.remove(group);
            }
        }

        result
    }

    /// Removes `identity` from the default manager and every group. Groups
    /// left without queuing players are dropped. Returns whether it was found
    /// anywhere.
    pub fn remove_player_everywhere(&self, identity: &Identity) -> bool {
        let mut groups = self.groups.lock();
        let mut removed = self.default.remove_player(identity).is_ok();

        groups.retain(|group, manager| {
            removed |= manager.remove_player(identity).is_ok();
            if manager.queuing_count() == 0 {
                debug!("Dropping empty group {:?}", group.members());
                return false;
            }
            true
        });
        removed
    }

    pub fn is_queuing_anywhere(&self, identity: &Identity) -> bool {
        let groups = self.groups.lock();
        self.default.is_queuing(identity) || groups.values().any(|m| m.is_queuing(identity))
    }

    pub fn group_count(&self) -> usize {
        self.groups.lock().len()
    }
}

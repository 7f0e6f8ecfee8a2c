use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::{
    models::{
        game::Color,
        identity::Identity,
        messages::{PlayerView, PlayersView, ServerMessage, UserType},
    },
    services::{clock::Clock, errors::game_service_errors::GameServiceError},
};

/// Outbound channel of a connected player. Sends are fire-and-forget.
pub type Delivery = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug)]
pub struct Participant {
    identity: Identity,
    color: Color,
    clock: Clock,
    joined: bool,
    offers_draw: bool,
    delivery: Option<Delivery>,
}

impl Participant {
    pub fn new(identity: Identity, color: Color, initial_time: Duration) -> Self {
        Participant {
            identity,
            color,
            clock: Clock::new(initial_time),
            joined: false,
            offers_draw: false,
            delivery: None,
        }
    }

    fn join(&mut self, delivery: Delivery) {
        self.joined = true;
        self.delivery = Some(delivery);
    }

    /// Delivers `message` if the participant has joined.
    pub fn notify(&self, message: ServerMessage) {
        if !self.joined {
            return;
        }
        if let Some(delivery) = &self.delivery {
            let _ = delivery.send(message);
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn joined(&self) -> bool {
        self.joined
    }

    pub fn offers_draw(&self) -> bool {
        self.offers_draw
    }

    pub fn set_offers_draw(&mut self, offers_draw: bool) {
        self.offers_draw = offers_draw;
    }

    fn view(&self) -> PlayerView {
        let user_type = match &self.identity {
            Identity::Registered { .. } => UserType::Registered,
            Identity::Anonymous { .. } => UserType::Anonymous,
            Identity::Placeholder => UserType::Unknown,
        };
        PlayerView {
            user_type,
            username: self.identity.username().map(str::to_string),
            time: self.clock.remaining_ms(),
            status: None,
        }
    }
}

/// The two sides of a game. Slot 0 is white, slot 1 is black; identities map
/// to slots so a placeholder can be filled without moving participants.
#[derive(Debug)]
pub struct ParticipantPair {
    slots: [Participant; 2],
    index: HashMap<Identity, usize>,
    placeholder: Option<usize>,
}

impl ParticipantPair {
    pub fn new(
        white: Identity,
        black: Identity,
        initial_time: Duration,
    ) -> Result<Self, GameServiceError> {
        if white.is_placeholder() && black.is_placeholder() {
            return Err(GameServiceError::ValidationError(
                "At most one player can be a placeholder".to_string(),
            ));
        }
        if white == black {
            return Err(GameServiceError::ValidationError(
                "A player cannot play against themselves".to_string(),
            ));
        }

        let slots = [
            Participant::new(white, Color::White, initial_time),
            Participant::new(black, Color::Black, initial_time),
        ];
        let mut index = HashMap::new();
        let mut placeholder = None;
        for (slot, participant) in slots.iter().enumerate() {
            if participant.identity.is_placeholder() {
                placeholder = Some(slot);
            } else {
                index.insert(participant.identity.clone(), slot);
            }
        }

        Ok(ParticipantPair {
            slots,
            index,
            placeholder,
        })
    }

    /// True if `identity` already plays here or can take the open slot.
    pub fn can_join(&self, identity: &Identity) -> bool {
        if identity.is_placeholder() {
            return false;
        }
        self.index.contains_key(identity) || self.placeholder.is_some()
    }

    /// Marks `identity` as joined, filling the placeholder slot on first use.
    pub fn join(
        &mut self,
        identity: &Identity,
        delivery: Delivery,
    ) -> Result<&Participant, GameServiceError> {
        if identity.is_placeholder() {
            return Err(GameServiceError::CannotJoin);
        }

        let slot = match self.index.get(identity) {
            Some(slot) => *slot,
            None => {
                let slot = self.placeholder.take().ok_or(GameServiceError::CannotJoin)?;
                self.slots[slot].identity = identity.clone();
                self.index.insert(identity.clone(), slot);
                slot
            }
        };

        self.slots[slot].join(delivery);
        Ok(&self.slots[slot])
    }

    pub fn by_color(&self, color: Color) -> &Participant {
        &self.slots[color.index()]
    }

    pub fn by_color_mut(&mut self, color: Color) -> &mut Participant {
        &mut self.slots[color.index()]
    }

    pub fn by_identity(&self, identity: &Identity) -> Option<&Participant> {
        self.index.get(identity).map(|slot| &self.slots[*slot])
    }

    pub fn by_identity_mut(&mut self, identity: &Identity) -> Option<&mut Participant> {
        let slot = *self.index.get(identity)?;
        Some(&mut self.slots[slot])
    }

    pub fn opponent_of(&self, identity: &Identity) -> Option<&Participant> {
        let participant = self.by_identity(identity)?;
        Some(self.by_color(participant.color.opposite()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.slots.iter_mut()
    }

    pub fn all_joined(&self) -> bool {
        self.slots.iter().all(|p| p.joined)
    }

    pub fn has_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    pub fn is_draw_agreement(&self) -> bool {
        self.slots.iter().all(|p| p.offers_draw)
    }

    pub fn clear_draw_offers(&mut self) {
        for participant in self.slots.iter_mut() {
            participant.offers_draw = false;
        }
    }

    pub fn notify_all(&self, message: ServerMessage) {
        for participant in self.slots.iter() {
            participant.notify(message.clone());
        }
    }

    /// Snapshot of both sides with live clock times.
    pub fn players_view(&self) -> PlayersView {
        PlayersView {
            white: self.by_color(Color::White).view(),
            black: self.by_color(Color::Black).view(),
        }
    }
}

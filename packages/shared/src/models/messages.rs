use serde::{Deserialize, Serialize};

use crate::models::{
    friend::FriendStatus,
    game::{Color, Termination, Winner},
};

/// Messages a connected player can send.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Enqueue {
        game_mode: String,
        time_control: u64,
        #[serde(default)]
        group: Option<Vec<String>>,
    },
    StopQueuing,
    Join {
        game_id: String,
    },
    Move {
        #[serde(rename = "move", alias = "uci")]
        uci: String,
    },
    Resign,
    OfferDraw,
}

/// Events pushed to a connected player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    GameFound {
        game_id: String,
    },
    Join {
        players: PlayersView,
        moves: Vec<String>,
        offer_draw: bool,
        game_started: bool,
    },
    GameStarted {
        players: PlayersView,
    },
    Move {
        #[serde(rename = "move")]
        uci: String,
        players: PlayersView,
    },
    GameResult {
        termination: Termination,
        winner: Winner,
    },
    OfferDraw,
    OutOfTime {
        player: Color,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Registered,
    Anonymous,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub user_type: UserType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Remaining clock time in milliseconds.
    pub time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FriendStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayersView {
    pub white: PlayerView,
    pub black: PlayerView,
}

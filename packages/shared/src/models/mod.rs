pub mod friend;
pub mod game;
pub mod game_mode;
pub mod group;
pub mod identity;
pub mod messages;

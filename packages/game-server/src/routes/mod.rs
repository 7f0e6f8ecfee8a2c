pub mod health;
pub mod identity;
pub mod link_game;
pub mod websocket;

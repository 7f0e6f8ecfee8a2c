pub mod chess_service;
pub mod clock;
pub mod errors;
pub mod game;
pub mod game_registry;
pub mod group_registry;
pub mod participants;
pub mod queue_service;

pub mod errors;
pub mod friend_repository;
pub mod game_repository;

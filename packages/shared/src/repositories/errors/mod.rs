pub mod friend_repository_errors;
pub mod game_repository_errors;

use std::sync::Arc;

use axum::{routing::get, Router};
use shared::{
    models::game_mode::active_game_modes,
    repositories::{
        friend_repository::{DynamoDbFriendRepository, FriendRepository, InMemoryFriendRepository},
        game_repository::{DynamoDbGameRepository, GameRepository, InMemoryGameRepository},
    },
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false)
        .init();

    // Set up repositories; DynamoDB only for the tables that are configured
    let client = if config.uses_dynamodb() {
        let aws_config = aws_config::load_from_env().await;
        Some(aws_sdk_dynamodb::Client::new(&aws_config))
    } else {
        None
    };

    let game_repository: Arc<dyn GameRepository + Send + Sync> =
        match (&client, &config.games_table) {
            (Some(client), Some(table)) => {
                info!("Storing completed games in {}", table);
                Arc::new(DynamoDbGameRepository::new(client.clone(), table))
            }
            _ => Arc::new(InMemoryGameRepository::new()),
        };
    let friend_repository: Arc<dyn FriendRepository + Send + Sync> =
        match (&client, &config.friendships_table) {
            (Some(client), Some(table)) => Arc::new(DynamoDbFriendRepository::new(client.clone(), table)),
            _ => Arc::new(InMemoryFriendRepository::new()),
        };

    let app_state = AppState::new(active_game_modes(), game_repository, friend_repository);

    // ToDo: restrict origins once the frontend host is fixed
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::link_game::routes())
        .merge(routes::websocket::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

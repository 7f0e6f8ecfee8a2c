use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::{
    models::{game_mode::find_game_mode, identity::Identity},
    services::errors::queue_service_errors::QueueServiceError,
};
use tracing::{error, info};

use crate::{error::ApiError, routes::identity::IdentityParams, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/link_game", post(create_link_game))
}

#[derive(Debug, Deserialize)]
pub struct LinkGameRequest {
    pub game_mode: String,
    pub time_control: u64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkGameResponse {
    pub game_id: String,
    /// Session key to reconnect with, for anonymous creators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

/// Creates a game between the caller and whoever opens the shared link.
pub async fn create_link_game(
    State(state): State<AppState>,
    Query(params): Query<IdentityParams>,
    Json(payload): Json<LinkGameRequest>,
) -> Result<(StatusCode, Json<LinkGameResponse>), ApiError> {
    let identity = params.into_identity();

    let mode = find_game_mode(&state.modes, &payload.game_mode, payload.time_control).ok_or(
        QueueServiceError::UnknownQueue {
            game_mode: payload.game_mode.clone(),
            time_control: payload.time_control,
        },
    )?;

    let game = state
        .registry
        .start_game(
            identity.clone(),
            Identity::Placeholder,
            &mode.name,
            payload.time_control,
            true,
        )
        .map_err(|e| {
            error!("Failed to create link game for {}: {}", identity, e);
            ApiError::from(e)
        })?;
    info!("{} created link game {}", identity, game.id());

    let session_key = match identity {
        Identity::Anonymous { session_key } => Some(session_key),
        _ => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(LinkGameResponse {
            game_id: game.id().to_string(),
            session_key,
        }),
    ))
}

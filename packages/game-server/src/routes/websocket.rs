use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use shared::{
    models::{
        game::GameId,
        group::Group,
        identity::Identity,
        messages::{ClientMessage, ServerMessage},
    },
    services::{
        chess_service::MoveOutcome,
        errors::{game_service_errors::GameServiceError, queue_service_errors::QueueServiceError},
        game::GameHandle,
        participants::Delivery,
    },
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{error::ApiError, routes::identity::IdentityParams, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<IdentityParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let identity = params.into_identity();
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    info!("WebSocket connection established: {}", identity);
    let (mut sink, mut stream) = socket.split();
    let (sender, mut receiver) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound message: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(state, identity, sender);
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => session.handle_text(&text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    session.close();
    writer.abort();
}

/// Per-connection state: who is connected, where their events go and which
/// game they last joined.
pub struct Session {
    state: AppState,
    identity: Identity,
    delivery: Delivery,
    game: Option<GameHandle>,
}

impl Session {
    pub fn new(state: AppState, identity: Identity, delivery: Delivery) -> Self {
        Session {
            state,
            identity,
            delivery,
            game: None,
        }
    }

    /// Handles one inbound frame. Failures are reported back as `error`
    /// messages and never end the connection.
    pub async fn handle_text(&mut self, text: &str) {
        let result = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => Err(ApiError::InvalidMessage(e.to_string())),
        };

        if let Err(e) = result {
            warn!("Rejected message from {}: {}", self.identity, e);
            let _ = self.delivery.send(ServerMessage::error(e.to_string()));
        }
    }

    async fn handle_message(&mut self, message: ClientMessage) -> Result<(), ApiError> {
        debug!("{} sent {:?}", self.identity, message);
        match message {
            ClientMessage::Enqueue {
                game_mode,
                time_control,
                group,
            } => self.enqueue(&game_mode, time_control, group),
            ClientMessage::StopQueuing => self.stop_queuing(),
            ClientMessage::Join { game_id } => self.join(&game_id).await,
            ClientMessage::Move { uci } => self.make_move(&uci).await,
            ClientMessage::Resign => Ok(self.current_game()?.resign(&self.identity).await?),
            ClientMessage::OfferDraw => Ok(self.current_game()?.offer_draw(&self.identity).await?),
        }
    }

    fn enqueue(
        &self,
        game_mode: &str,
        time_control: u64,
        group: Option<Vec<String>>,
    ) -> Result<(), ApiError> {
        let group = group.map(Group::new);
        let delivery = self.delivery.clone();
        self.state.groups.enqueue(
            self.identity.clone(),
            group.as_ref(),
            game_mode,
            time_control,
            Box::new(move |game: &GameHandle| {
                let _ = delivery.send(ServerMessage::GameFound {
                    game_id: game.id().to_string(),
                });
            }),
        )?;

        Ok(())
    }

    fn stop_queuing(&self) -> Result<(), ApiError> {
        if !self.state.groups.remove_player_everywhere(&self.identity) {
            return Err(QueueServiceError::NotQueuing.into());
        }
        Ok(())
    }

    async fn join(&mut self, game_id: &str) -> Result<(), ApiError> {
        let game_id = GameId::parse(game_id).ok_or(ApiError::InvalidGameId)?;
        let game = self
            .state
            .registry
            .get_game(&game_id)
            .ok_or(ApiError::GameNotFound)?;

        if !game.can_join(&self.identity).await {
            return Err(GameServiceError::CannotJoin.into());
        }
        game.join(&self.identity, self.delivery.clone()).await?;

        self.game = Some(game);
        Ok(())
    }

    async fn make_move(&self, uci: &str) -> Result<(), ApiError> {
        let game = self.current_game()?;
        if !game.is_turn_of(&self.identity).await {
            return Err(GameServiceError::NotYourTurn.into());
        }

        match game.make_move(&self.identity, uci).await? {
            MoveOutcome::Illegal => Err(ApiError::IllegalMove(uci.to_string())),
            MoveOutcome::Legal(_) => Ok(()),
        }
    }

    fn current_game(&self) -> Result<&GameHandle, ApiError> {
        self.game.as_ref().ok_or(ApiError::NotInGame)
    }

    /// Takes the player out of every queue when the connection goes away.
    pub fn close(&self) {
        if self.state.groups.remove_player_everywhere(&self.identity) {
            debug!("Removed {} from queues on disconnect", self.identity);
        }
        info!("WebSocket connection closed: {}", self.identity);
    }
}

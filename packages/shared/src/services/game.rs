use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    models::{
        game::{Color, CompletedGame, GameId, GameStatus, Outcome, Termination},
        identity::Identity,
        messages::{PlayersView, ServerMessage},
    },
    repositories::{friend_repository::FriendRepository, game_repository::GameRepository},
    services::{
        chess_service::{ChessPosition, MoveOutcome},
        errors::game_service_errors::GameServiceError,
        game_registry::GameRegistry,
        participants::{Delivery, ParticipantPair},
    },
};

/// Abort windows. A game nobody plays is aborted without a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameTimings {
    /// Waiting for both players of a matchmade game to join.
    pub matchmade_abort: Duration,
    /// Waiting for both players of a link game to join.
    pub link_game_abort: Duration,
    /// Waiting for the first half-move once the game started.
    pub first_move_abort: Duration,
    /// Waiting for the second half-move.
    pub second_move_abort: Duration,
}

impl Default for GameTimings {
    fn default() -> Self {
        GameTimings {
            matchmade_abort: Duration::from_secs(10),
            link_game_abort: Duration::from_secs(300),
            first_move_abort: Duration::from_secs(30),
            second_move_abort: Duration::from_secs(60),
        }
    }
}

impl GameTimings {
    pub fn join_window(&self, is_link_game: bool) -> Duration {
        if is_link_game {
            self.link_game_abort
        } else {
            self.matchmade_abort
        }
    }
}

/// Point-in-time view of a game, read through its handle.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub status: GameStatus,
    pub moves: Vec<String>,
    pub white: Identity,
    pub black: Identity,
    pub side_to_move: Color,
    /// Colour whose clock is currently running, if any.
    pub running_clock: Option<Color>,
    pub white_time: Duration,
    pub black_time: Duration,
}

#[derive(Debug, Clone, Copy)]
enum TimerEvent {
    Abort { generation: u64 },
    Clock { color: Color, generation: u64 },
}

enum GameCommand {
    CanJoin {
        identity: Identity,
        reply: oneshot::Sender<bool>,
    },
    Join {
        identity: Identity,
        delivery: Delivery,
        reply: oneshot::Sender<Result<(), GameServiceError>>,
    },
    IsTurnOf {
        identity: Identity,
        reply: oneshot::Sender<bool>,
    },
    Move {
        identity: Identity,
        uci: String,
        reply: oneshot::Sender<Result<MoveOutcome, GameServiceError>>,
    },
    OfferDraw {
        identity: Identity,
        reply: oneshot::Sender<Result<(), GameServiceError>>,
    },
    Resign {
        identity: Identity,
        reply: oneshot::Sender<Result<(), GameServiceError>>,
    },
    Finish {
        outcome: Outcome,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    Timer(TimerEvent),
}

/// Cloneable reference to a running game. Every call is serialised through
/// the game's task; once the game has finished the task is gone and calls
/// report `GameFinished`.
#[derive(Debug, Clone)]
pub struct GameHandle {
    id: GameId,
    mode: String,
    time_control: u64,
    is_link_game: bool,
    sender: mpsc::UnboundedSender<GameCommand>,
}

impl GameHandle {
    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Initial clock time per side, in seconds.
    pub fn time_control(&self) -> u64 {
        self.time_control
    }

    pub fn is_link_game(&self) -> bool {
        self.is_link_game
    }

    pub fn is_finished(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> GameCommand) -> Option<T> {
        let (reply, response) = oneshot::channel();
        self.sender.send(command(reply)).ok()?;
        response.await.ok()
    }

    pub async fn can_join(&self, identity: &Identity) -> bool {
        let identity = identity.clone();
        self.request(|reply| GameCommand::CanJoin { identity, reply })
            .await
            .unwrap_or(false)
    }

    /// Joins `identity`, filling the placeholder slot if needed. The joining
    /// player receives a `join` snapshot on `delivery`.
    pub async fn join(&self, identity: &Identity, delivery: Delivery) -> Result<(), GameServiceError> {
        let identity = identity.clone();
        self.request(|reply| GameCommand::Join {
            identity,
            delivery,
            reply,
        })
        .await
        .unwrap_or(Err(GameServiceError::GameFinished))
    }

    pub async fn is_turn_of(&self, identity: &Identity) -> bool {
        let identity = identity.clone();
        self.request(|reply| GameCommand::IsTurnOf { identity, reply })
            .await
            .unwrap_or(false)
    }

    pub async fn make_move(
        &self,
        identity: &Identity,
        uci: &str,
    ) -> Result<MoveOutcome, GameServiceError> {
        let identity = identity.clone();
        let uci = uci.to_string();
        self.request(|reply| GameCommand::Move {
            identity,
            uci,
            reply,
        })
        .await
        .unwrap_or(Err(GameServiceError::GameFinished))
    }

    pub async fn offer_draw(&self, identity: &Identity) -> Result<(), GameServiceError> {
        let identity = identity.clone();
        self.request(|reply| GameCommand::OfferDraw { identity, reply })
            .await
            .unwrap_or(Err(GameServiceError::GameFinished))
    }

    pub async fn resign(&self, identity: &Identity) -> Result<(), GameServiceError> {
        let identity = identity.clone();
        self.request(|reply| GameCommand::Resign { identity, reply })
            .await
            .unwrap_or(Err(GameServiceError::GameFinished))
    }

    /// Ends the game with `outcome`. Finishing a finished game does nothing.
    pub async fn finish(&self, outcome: Outcome) {
        let _ = self
            .request(|reply| GameCommand::Finish { outcome, reply })
            .await;
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, GameServiceError> {
        self.request(|reply| GameCommand::Snapshot { reply })
            .await
            .ok_or(GameServiceError::GameFinished)
    }
}

pub(crate) struct GameContext {
    pub registry: GameRegistry,
    pub game_repository: Arc<dyn GameRepository + Send + Sync>,
    pub friend_repository: Arc<dyn FriendRepository + Send + Sync>,
    pub timings: GameTimings,
}

pub(crate) struct Game {
    id: GameId,
    mode: String,
    time_control: u64,
    is_link_game: bool,
    status: GameStatus,
    position: ChessPosition,
    participants: ParticipantPair,
    context: GameContext,
    sender: mpsc::WeakUnboundedSender<GameCommand>,
    abort_timer: Option<JoinHandle<()>>,
    abort_generation: u64,
    clock_generation: u64,
}

impl Game {
    /// Starts the game task and arms the join window.
    pub(crate) fn spawn(
        id: GameId,
        mode: &str,
        time_control: u64,
        is_link_game: bool,
        participants: ParticipantPair,
        context: GameContext,
    ) -> GameHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let join_window = context.timings.join_window(is_link_game);

        let mut game = Game {
            id: id.clone(),
            mode: mode.to_string(),
            time_control,
            is_link_game,
            status: GameStatus::NotStarted,
            position: ChessPosition::new(),
            participants,
            context,
            sender: sender.downgrade(),
            abort_timer: None,
            abort_generation: 0,
            clock_generation: 0,
        };
        game.arm_abort_timer(join_window);
        tokio::spawn(game.run(receiver));

        GameHandle {
            id,
            mode: mode.to_string(),
            time_control,
            is_link_game,
            sender,
        }
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<GameCommand>) {
        while let Some(command) = receiver.recv().await {
            self.handle(command).await;
            if self.status == GameStatus::Finished {
                break;
            }
        }
        debug!("Game {} task stopped", self.id);
    }

    async fn handle(&mut self, command: GameCommand) {
        match command {
            GameCommand::CanJoin { identity, reply } => {
                let _ = reply.send(self.can_join(&identity));
            }
            GameCommand::Join {
                identity,
                delivery,
                reply,
            } => {
                let result = self.join_player(identity, delivery).await;
                let _ = reply.send(result);
            }
            GameCommand::IsTurnOf { identity, reply } => {
                let _ = reply.send(self.is_turn_of(&identity));
            }
            GameCommand::Move {
                identity,
                uci,
                reply,
            } => {
                let result = self.apply_move(&identity, &uci).await;
                let _ = reply.send(result);
            }
            GameCommand::OfferDraw { identity, reply } => {
                let result = self.offer_draw(&identity).await;
                let _ = reply.send(result);
            }
            GameCommand::Resign { identity, reply } => {
                let result = self.resign(&identity).await;
                let _ = reply.send(result);
            }
            GameCommand::Finish { outcome, reply } => {
                self.finish(outcome).await;
                let _ = reply.send(());
            }
            GameCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            GameCommand::Timer(event) => self.on_timer(event).await,
        }
    }

    fn can_join(&self, identity: &Identity) -> bool {
        self.status != GameStatus::Finished && self.participants.can_join(identity)
    }

    fn is_turn_of(&self, identity: &Identity) -> bool {
        self.status == GameStatus::InProgress
            && self
                .participants
                .by_identity(identity)
                .is_some_and(|p| self.position.is_turn_of(p.color()))
    }

    async fn join_player(
        &mut self,
        identity: Identity,
        delivery: Delivery,
    ) -> Result<(), GameServiceError> {
        if self.status == GameStatus::Finished {
            return Err(GameServiceError::GameFinished);
        }

        let color = self.participants.join(&identity, delivery)?.color();
        info!("{} joined game {} as {}", identity, self.id, color);

        let players = self.players_view_for(&identity).await;
        let opponent_offers_draw = self.participants.by_color(color.opposite()).offers_draw();
        self.participants.by_color(color).notify(ServerMessage::Join {
            players,
            moves: self.position.moves().to_vec(),
            offer_draw: opponent_offers_draw,
            game_started: self.status == GameStatus::InProgress,
        });

        if self.status == GameStatus::NotStarted {
            if self.participants.all_joined() {
                self.start();
            } else {
                self.arm_abort_timer(self.context.timings.join_window(self.is_link_game));
            }
        }

        Ok(())
    }

    fn start(&mut self) {
        self.status = GameStatus::InProgress;
        info!(
            "Game {} started ({} {}s)",
            self.id, self.mode, self.time_control
        );

        self.participants.notify_all(ServerMessage::GameStarted {
            players: self.participants.players_view(),
        });
        self.start_clock(self.position.side_to_move());
        self.arm_abort_timer(self.context.timings.first_move_abort);
    }

    async fn apply_move(
        &mut self,
        identity: &Identity,
        uci: &str,
    ) -> Result<MoveOutcome, GameServiceError> {
        match self.status {
            GameStatus::NotStarted => return Err(GameServiceError::GameNotStarted),
            GameStatus::Finished => return Err(GameServiceError::GameFinished),
            GameStatus::InProgress => {}
        }

        let color = self
            .participants
            .by_identity(identity)
            .map(|p| p.color())
            .ok_or(GameServiceError::NotParticipant)?;
        if !self.position.is_turn_of(color) {
            return Err(GameServiceError::NotYourTurn);
        }
        if self.participants.by_color(color).clock().remaining().is_zero() {
            debug!("{} moved after flagging in game {}", identity, self.id);
            self.flag(color).await;
            return Err(GameServiceError::GameFinished);
        }
        ChessPosition::parse_uci(uci)?;

        let outcome = match self.position.apply_move(uci) {
            MoveOutcome::Illegal => {
                debug!("Illegal move {} in game {}", uci, self.id);
                return Ok(MoveOutcome::Illegal);
            }
            MoveOutcome::Legal(outcome) => outcome,
        };
        debug!("{} played {} in game {}", identity, uci, self.id);

        match self.position.moves().len() {
            1 => self.arm_abort_timer(self.context.timings.second_move_abort),
            2 => self.cancel_abort_timer(),
            _ => {}
        }

        self.participants.by_color_mut(color).clock_mut().stop();
        if outcome.is_none() {
            self.start_clock(color.opposite());
        }
        self.participants.clear_draw_offers();

        let uci = self.position.moves().last().cloned().unwrap_or_default();
        self.participants
            .by_color(color.opposite())
            .notify(ServerMessage::Move {
                uci,
                players: self.participants.players_view(),
            });

        if let Some(outcome) = outcome {
            self.finish(outcome).await;
        }

        Ok(MoveOutcome::Legal(outcome))
    }

    async fn offer_draw(&mut self, identity: &Identity) -> Result<(), GameServiceError> {
        if self.status == GameStatus::Finished {
            return Err(GameServiceError::GameFinished);
        }

        let participant = self
            .participants
            .by_identity_mut(identity)
            .ok_or(GameServiceError::NotParticipant)?;
        if participant.offers_draw() {
            return Ok(());
        }
        participant.set_offers_draw(true);
        let color = participant.color();

        if self.participants.is_draw_agreement() {
            self.finish(Outcome::draw(Termination::Agreement)).await;
        } else {
            self.participants
                .by_color(color.opposite())
                .notify(ServerMessage::OfferDraw);
        }

        Ok(())
    }

    async fn resign(&mut self, identity: &Identity) -> Result<(), GameServiceError> {
        if self.status == GameStatus::Finished {
            return Err(GameServiceError::GameFinished);
        }

        let color = self
            .participants
            .by_identity(identity)
            .map(|p| p.color())
            .ok_or(GameServiceError::NotParticipant)?;
        info!("{} resigned game {}", identity, self.id);

        self.finish(Outcome::new(Termination::Resignation, Some(color.opposite())))
            .await;
        Ok(())
    }

    async fn finish(&mut self, outcome: Outcome) {
        if self.status == GameStatus::Finished {
            return;
        }
        self.status = GameStatus::Finished;

        self.cancel_abort_timer();
        self.clock_generation += 1;
        for participant in self.participants.iter_mut() {
            participant.clock_mut().stop();
        }

        self.participants.notify_all(ServerMessage::GameResult {
            termination: outcome.termination,
            winner: outcome.winner.into(),
        });
        info!(
            "Game {} finished: {:?}, winner {:?}",
            self.id, outcome.termination, outcome.winner
        );

        if outcome.termination != Termination::Aborted {
            let completed = self.completed_game(outcome);
            if let Err(e) = self.context.game_repository.save_completed_game(&completed).await {
                error!("Failed to save completed game: {}", e);
            }
        }

        self.context.registry.remove_game(&self.id);
    }

    async fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Abort { generation } => {
                if generation != self.abort_generation || self.status == GameStatus::Finished {
                    return;
                }
                self.abort_timer = None;
                info!("Aborting game {}", self.id);
                self.finish(Outcome::draw(Termination::Aborted)).await;
            }
            TimerEvent::Clock { color, generation } => {
                if generation != self.clock_generation || self.status != GameStatus::InProgress {
                    return;
                }
                self.flag(color).await;
            }
        }
    }

    async fn flag(&mut self, color: Color) {
        self.participants.by_color_mut(color).clock_mut().expire();
        self.participants
            .notify_all(ServerMessage::OutOfTime { player: color });
        self.finish(Outcome::new(Termination::Timeout, Some(color.opposite())))
            .await;
    }

    fn start_clock(&mut self, color: Color) {
        self.clock_generation += 1;
        let generation = self.clock_generation;
        let sender = self.sender.clone();

        self.participants
            .by_color_mut(color)
            .clock_mut()
            .start(move || {
                if let Some(sender) = sender.upgrade() {
                    let _ = sender.send(GameCommand::Timer(TimerEvent::Clock { color, generation }));
                }
            });
    }

    fn arm_abort_timer(&mut self, window: Duration) {
        self.cancel_abort_timer();
        let generation = self.abort_generation;
        let sender = self.sender.clone();

        self.abort_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender.send(GameCommand::Timer(TimerEvent::Abort { generation }));
            }
        }));
    }

    fn cancel_abort_timer(&mut self) {
        self.abort_generation += 1;
        if let Some(timer) = self.abort_timer.take() {
            timer.abort();
        }
    }

    /// Players snapshot as seen by `identity`, with its friend status towards
    /// a registered opponent when it can be looked up.
    async fn players_view_for(&self, identity: &Identity) -> PlayersView {
        let mut players = self.participants.players_view();

        let Identity::Registered { id, .. } = identity else {
            return players;
        };
        let Some(opponent) = self.participants.opponent_of(identity) else {
            return players;
        };
        let Identity::Registered { id: opponent_id, .. } = opponent.identity() else {
            return players;
        };

        match self
            .context
            .friend_repository
            .friend_status(id, opponent_id)
            .await
        {
            Ok(status) => match opponent.color() {
                Color::White => players.white.status = Some(status),
                Color::Black => players.black.status = Some(status),
            },
            Err(e) => warn!("Friend status lookup failed for {}: {}", identity, e),
        }

        players
    }

    fn snapshot(&self) -> GameSnapshot {
        let white = self.participants.by_color(Color::White);
        let black = self.participants.by_color(Color::Black);
        let running_clock = self
            .participants
            .iter()
            .find(|p| p.clock().is_running())
            .map(|p| p.color());

        GameSnapshot {
            status: self.status,
            moves: self.position.moves().to_vec(),
            white: white.identity().clone(),
            black: black.identity().clone(),
            side_to_move: self.position.side_to_move(),
            running_clock,
            white_time: white.clock().remaining(),
            black_time: black.clock().remaining(),
        }
    }

    fn completed_game(&self, outcome: Outcome) -> CompletedGame {
        CompletedGame {
            game_id: self.id.to_string(),
            player_white: self.participants.by_color(Color::White).identity().player_ref(),
            player_black: self.participants.by_color(Color::Black).identity().player_ref(),
            termination: outcome.termination,
            winner_color: outcome.winner,
            time_control: self.time_control,
            moves: self.position.moves().to_vec(),
            date: Utc::now(),
        }
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        if let Some(timer) = self.abort_timer.take() {
            timer.abort();
        }
    }
}

use std::collections::HashMap;
use std::str::FromStr;

use chess::{BitBoard, Board, BoardStatus, ChessMove, MoveGen, Piece, Square, EMPTY};

use crate::{
    models::game::{Color, Outcome, Termination},
    services::errors::game_service_errors::GameServiceError,
};

/// Half-moves without a capture or pawn move after which a draw is claimed.
const FIFTY_MOVE_HALFMOVES: u32 = 100;
const REPETITION_LIMIT: u32 = 3;

/// Result of submitting a move to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Rejected; the position is unchanged.
    Illegal,
    /// Applied. Carries the outcome when the move ended the game.
    Legal(Option<Outcome>),
}

/// A chess position plus the history needed for draw claims.
#[derive(Debug, Clone)]
pub struct ChessPosition {
    board: Board,
    moves: Vec<String>,
    halfmove_clock: u32,
    repetitions: HashMap<u64, u32>,
}

impl Default for ChessPosition {
    fn default() -> Self {
        Self::new()
    }
}

impl ChessPosition {
    pub fn new() -> Self {
        Self::with_board(Board::default(), 0)
    }

    /// Builds a position from FEN. The half-move clock field is honoured.
    pub fn from_fen(fen: &str) -> Result<Self, GameServiceError> {
        let board = Board::from_str(fen)
            .map_err(|e| GameServiceError::ValidationError(format!("Invalid FEN: {}", e)))?;
        let halfmove_clock = fen
            .split_whitespace()
            .nth(4)
            .and_then(|field| field.parse().ok())
            .unwrap_or(0);
        Ok(Self::with_board(board, halfmove_clock))
    }

    fn with_board(board: Board, halfmove_clock: u32) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(board.get_hash(), 1);
        ChessPosition {
            board,
            moves: Vec::new(),
            halfmove_clock,
            repetitions,
        }
    }

    /// Parses a UCI move such as `e2e4` or `e7e8q`.
    pub fn parse_uci(uci: &str) -> Result<ChessMove, GameServiceError> {
        let uci = uci.trim();
        if !uci.is_ascii() || !(4..=5).contains(&uci.len()) {
            return Err(GameServiceError::ValidationError(format!(
                "Invalid move: {}",
                uci
            )));
        }

        let from = Square::from_str(&uci[0..2].to_ascii_lowercase())
            .map_err(|_| GameServiceError::ValidationError("Invalid from square".to_string()))?;
        let to = Square::from_str(&uci[2..4].to_ascii_lowercase())
            .map_err(|_| GameServiceError::ValidationError("Invalid to square".to_string()))?;

        let promotion = match uci.get(4..5).map(|p| p.to_ascii_lowercase()) {
            None => None,
            Some(p) => match p.as_str() {
                "q" => Some(Piece::Queen),
                "r" => Some(Piece::Rook),
                "b" => Some(Piece::Bishop),
                "n" => Some(Piece::Knight),
                _ => {
                    return Err(GameServiceError::ValidationError(
                        "Invalid promotion piece".to_string(),
                    ))
                }
            },
        };

        Ok(ChessMove::new(from, to, promotion))
    }

    /// Applies `uci` if legal and reports whether the game ended. Draws by the
    /// fifty-move rule and threefold repetition are claimed automatically.
    pub fn apply_move(&mut self, uci: &str) -> MoveOutcome {
        let Ok(chess_move) = Self::parse_uci(uci) else {
            return MoveOutcome::Illegal;
        };

        if !MoveGen::new_legal(&self.board).any(|legal| legal == chess_move) {
            return MoveOutcome::Illegal;
        }

        let mover = self.side_to_move();
        let irreversible = self.board.piece_on(chess_move.get_source()) == Some(Piece::Pawn)
            || self.board.piece_on(chess_move.get_dest()).is_some();

        self.board = self.board.make_move_new(chess_move);
        self.moves.push(uci_string(&chess_move));

        if irreversible {
            self.halfmove_clock = 0;
            // Earlier positions can never recur after a capture or pawn move.
            self.repetitions.clear();
        } else {
            self.halfmove_clock += 1;
        }
        *self.repetitions.entry(self.board.get_hash()).or_insert(0) += 1;

        MoveOutcome::Legal(self.outcome(mover))
    }

    fn outcome(&self, mover: Color) -> Option<Outcome> {
        match self.board.status() {
            BoardStatus::Checkmate => {
                return Some(Outcome::new(Termination::Checkmate, Some(mover)));
            }
            BoardStatus::Stalemate => return Some(Outcome::draw(Termination::Stalemate)),
            BoardStatus::Ongoing => {}
        }

        if self.is_insufficient_material() {
            return Some(Outcome::draw(Termination::InsufficientMaterial));
        }
        if self.halfmove_clock >= FIFTY_MOVE_HALFMOVES {
            return Some(Outcome::draw(Termination::FiftyMoves));
        }
        if self
            .repetitions
            .get(&self.board.get_hash())
            .is_some_and(|count| *count >= REPETITION_LIMIT)
        {
            return Some(Outcome::draw(Termination::ThreefoldRepetition));
        }
        None
    }

    /// Neither side can possibly deliver mate.
    pub fn is_insufficient_material(&self) -> bool {
        self.has_insufficient_material(chess::Color::White)
            && self.has_insufficient_material(chess::Color::Black)
    }

    fn has_insufficient_material(&self, color: chess::Color) -> bool {
        let board = &self.board;
        let own = *board.color_combined(color);
        let other = *board.color_combined(!color);
        let pawns = *board.pieces(Piece::Pawn);
        let knights = *board.pieces(Piece::Knight);
        let bishops = *board.pieces(Piece::Bishop);
        let kings = *board.pieces(Piece::King);
        let queens = *board.pieces(Piece::Queen);
        let heavy = pawns | *board.pieces(Piece::Rook) | queens;

        if own & heavy != EMPTY {
            return false;
        }
        if own & knights != EMPTY {
            return own.popcnt() <= 2 && other & !kings & !queens == EMPTY;
        }
        if own & bishops != EMPTY {
            return bishops_on_one_color(bishops) && pawns == EMPTY && knights == EMPTY;
        }
        true
    }

    pub fn side_to_move(&self) -> Color {
        from_chess_color(self.board.side_to_move())
    }

    pub fn is_turn_of(&self, color: Color) -> bool {
        self.side_to_move() == color
    }

    /// Accepted moves in UCI notation, oldest first.
    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    pub fn legal_moves(&self) -> Vec<String> {
        MoveGen::new_legal(&self.board)
            .map(|m| uci_string(&m))
            .collect()
    }
}

fn bishops_on_one_color(bishops: BitBoard) -> bool {
    let mut light = false;
    let mut dark = false;
    for square in bishops {
        if (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 0 {
            dark = true;
        } else {
            light = true;
        }
    }
    !(light && dark)
}

fn uci_string(chess_move: &ChessMove) -> String {
    let promotion = match chess_move.get_promotion() {
        Some(Piece::Queen) => "q",
        Some(Piece::Rook) => "r",
        Some(Piece::Bishop) => "b",
        Some(Piece::Knight) => "n",
        _ => "",
    };
    format!(
        "{}{}{}",
        chess_move.get_source(),
        chess_move.get_dest(),
        promotion
    )
}

fn from_chess_color(color: chess::Color) -> Color {
    match color {
        chess::Color::White => Color::White,
        chess::Color::Black => Color::Black,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(position: &mut ChessPosition, moves: &[&str]) -> MoveOutcome {
        let mut last = MoveOutcome::Legal(None);
        for uci in moves {
            last = position.apply_move(uci);
            assert_ne!(last, MoveOutcome::Illegal, "move {} was rejected", uci);
        }
        last
    }

    #[test]
    fn test_apply_legal_move() {
        let mut position = ChessPosition::new();

        let result = position.apply_move("e2e4");

        assert_eq!(result, MoveOutcome::Legal(None));
        assert_eq!(position.side_to_move(), Color::Black);
        assert_eq!(position.moves(), &["e2e4"]);
        assert_ne!(
            position.fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn test_illegal_move_leaves_position_unchanged() {
        let mut position = ChessPosition::new();
        let fen = position.fen();

        assert_eq!(position.apply_move("e2e5"), MoveOutcome::Illegal);
        assert_eq!(position.apply_move("e7e5"), MoveOutcome::Illegal);
        assert_eq!(position.apply_move("zz"), MoveOutcome::Illegal);
        assert_eq!(position.apply_move("é2e4"), MoveOutcome::Illegal);

        assert_eq!(position.fen(), fen);
        assert!(position.moves().is_empty());
        assert_eq!(position.side_to_move(), Color::White);
    }

    #[test]
    fn test_parse_uci_validation() {
        assert!(ChessPosition::parse_uci("e2e4").is_ok());
        assert!(ChessPosition::parse_uci("E7E8Q").is_ok());
        assert!(matches!(
            ChessPosition::parse_uci("e7e8k"),
            Err(GameServiceError::ValidationError(_))
        ));
        assert!(matches!(
            ChessPosition::parse_uci("i2e4"),
            Err(GameServiceError::ValidationError(_))
        ));
        assert!(ChessPosition::parse_uci("e2e4e5").is_err());
    }

    #[test]
    fn test_fools_mate_is_checkmate_for_black() {
        let mut position = ChessPosition::new();

        let result = play(&mut position, &["f2f3", "e7e5", "g2g4", "d8h4"]);

        assert_eq!(
            result,
            MoveOutcome::Legal(Some(Outcome::new(Termination::Checkmate, Some(Color::Black))))
        );
    }

    #[test]
    fn test_stalemate() {
        let mut position = ChessPosition::from_fen("k7/8/1Q6/8/8/8/8/7K w - - 0 1").unwrap();

        let result = position.apply_move("b6c7");

        assert_eq!(
            result,
            MoveOutcome::Legal(Some(Outcome::draw(Termination::Stalemate)))
        );
    }

    #[test]
    fn test_insufficient_material_after_capture() {
        let mut position = ChessPosition::from_fen("8/8/8/4k3/8/8/3n4/4K3 w - - 0 1").unwrap();
        assert!(!position.is_insufficient_material());

        let result = position.apply_move("e1d2");

        assert_eq!(
            result,
            MoveOutcome::Legal(Some(Outcome::draw(Termination::InsufficientMaterial)))
        );
    }

    #[test]
    fn test_same_colored_bishops_are_insufficient() {
        let position = ChessPosition::from_fen("8/8/7b/4k3/8/8/8/2B1K3 w - - 0 1").unwrap();
        assert!(position.is_insufficient_material());

        let position = ChessPosition::from_fen("8/8/8/4k2b/8/8/8/2B1K3 w - - 0 1").unwrap();
        assert!(!position.is_insufficient_material());
    }

    #[test]
    fn test_fifty_move_rule_is_claimed() {
        let mut position =
            ChessPosition::from_fen("8/8/8/4k3/8/8/8/4K2R w - - 99 80").unwrap();

        let result = position.apply_move("h1h2");

        assert_eq!(
            result,
            MoveOutcome::Legal(Some(Outcome::draw(Termination::FiftyMoves)))
        );
    }

    #[test]
    fn test_threefold_repetition_is_claimed() {
        let mut position = ChessPosition::new();
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];

        assert_eq!(play(&mut position, &shuffle), MoveOutcome::Legal(None));
        play(&mut position, &shuffle[..3]);
        let result = position.apply_move(shuffle[3]);

        assert_eq!(
            result,
            MoveOutcome::Legal(Some(Outcome::draw(Termination::ThreefoldRepetition)))
        );
    }

    #[test]
    fn test_promotion_requires_piece() {
        let mut position = ChessPosition::from_fen("8/P7/8/8/8/8/8/K6k w - - 0 1").unwrap();

        assert_eq!(position.apply_move("a7a8"), MoveOutcome::Illegal);
        assert_eq!(position.apply_move("a7a8q"), MoveOutcome::Legal(None));
        assert!(position.fen().contains('Q'));
        assert_eq!(position.moves(), &["a7a8q"]);
    }

    #[test]
    fn test_legal_moves_starting_position() {
        let position = ChessPosition::new();

        let legal_moves = position.legal_moves();

        assert_eq!(legal_moves.len(), 20);
        assert!(legal_moves.contains(&"e2e3".to_string()));
        assert!(legal_moves.contains(&"b1c3".to_string()));
    }
}

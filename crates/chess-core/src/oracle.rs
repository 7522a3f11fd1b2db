//! Rules oracle adapter over shakmaty.
//!
//! `GamePosition` is the only position type the rest of the workspace sees.
//! Every operation that plays a move returns a fresh successor and leaves the
//! receiver untouched, so search branches and the live session never alias.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{Board, CastlingMode, Chess, EnPassantMode, Move, Position, Rank, Role, Square};

use crate::error::{IllegalMoveError, OracleError};
use crate::game_data::{MoveRecord, PieceKind, Side};
use crate::status::{DrawReason, GameStatus};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule ends the game.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// A candidate move as it arrives from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl MoveRequest {
    pub fn new(from: Square, to: Square, promotion: Option<Role>) -> Self {
        Self { from, to, promotion }
    }

    /// Parse square names and an optional piece letter (`"e7"`, `"e8"`, `Some("q")`).
    pub fn parse(from: &str, to: &str, promotion: Option<&str>) -> Result<Self, OracleError> {
        let from_sq = parse_square(from)?;
        let to_sq = parse_square(to)?;
        let promotion = match promotion {
            Some(letter) if !letter.trim().is_empty() => {
                Some(Role::from(PieceKind::from_letter(letter)?))
            }
            _ => None,
        };
        Ok(Self::new(from_sq, to_sq, promotion))
    }

    pub fn uci(&self) -> String {
        match self.promotion {
            Some(role) => format!("{}{}{}", self.from, self.to, role.char()),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

pub fn parse_square(name: &str) -> Result<Square, OracleError> {
    name.trim()
        .parse::<Square>()
        .map_err(|_| OracleError::InvalidSquare(name.to_string()))
}

/// A legal move with everything the UI, the scorer and the prompt need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMove {
    /// Position in the oracle's enumeration order.
    pub index: usize,
    /// SAN including the `+` / `#` suffix.
    pub san: String,
    pub uci: String,
    pub from: Square,
    /// King destination for castling, not the rook square.
    pub to: Square,
    pub piece: Role,
    pub captured: Option<Role>,
    pub promotion: Option<Role>,
    pub(crate) mv: Move,
}

impl LegalMove {
    pub fn request(&self) -> MoveRequest {
        MoveRequest::new(self.from, self.to, self.promotion)
    }

    pub fn gives_check(&self) -> bool {
        self.san.ends_with('+') || self.san.ends_with('#')
    }

    pub fn gives_mate(&self) -> bool {
        self.san.ends_with('#')
    }
}

#[derive(Debug, Clone)]
pub struct GamePosition {
    chess: Chess,
}

impl Default for GamePosition {
    fn default() -> Self {
        Self::starting()
    }
}

impl GamePosition {
    pub fn starting() -> Self {
        Self {
            chess: Chess::default(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, OracleError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| OracleError::InvalidFen(format!("{fen}: {e}")))?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| OracleError::InvalidFen(format!("{fen}: {e}")))?;
        Ok(Self { chess })
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.chess, EnPassantMode::Legal).to_string()
    }

    /// Placement, side to move, castling rights and en-passant target.
    /// Two positions with the same key count as a repetition.
    pub fn repetition_key(&self) -> String {
        self.fen().split(' ').take(4).collect::<Vec<_>>().join(" ")
    }

    pub fn chess(&self) -> &Chess {
        &self.chess
    }

    pub fn board(&self) -> &Board {
        self.chess.board()
    }

    pub fn turn(&self) -> Side {
        self.chess.turn().into()
    }

    pub fn fullmove_number(&self) -> u32 {
        self.chess.fullmoves().get()
    }

    pub fn legal_move_count(&self) -> usize {
        self.chess.legal_moves().len()
    }

    pub fn legal_moves(&self) -> Vec<LegalMove> {
        self.chess
            .legal_moves()
            .iter()
            .enumerate()
            .map(|(index, mv)| self.describe(index, mv))
            .collect()
    }

    pub fn legal_move_at(&self, index: usize) -> Option<LegalMove> {
        self.chess
            .legal_moves()
            .get(index)
            .map(|mv| self.describe(index, mv))
    }

    /// Validate `request` against the legal set and return the successor.
    pub fn apply(&self, request: &MoveRequest) -> Result<(GamePosition, MoveRecord), IllegalMoveError> {
        let illegal = || IllegalMoveError { uci: request.uci() };
        let mv = self
            .chess
            .legal_moves()
            .into_iter()
            .find(|m| {
                // A promotion letter on a non-promotion move is ignored
                endpoints(m) == (request.from, request.to)
                    && (!m.is_promotion() || m.promotion() == request.promotion)
            })
            .ok_or_else(illegal)?;
        self.play_recorded(&mv).ok_or_else(illegal)
    }

    pub fn apply_legal(&self, legal: &LegalMove) -> Result<(GamePosition, MoveRecord), IllegalMoveError> {
        self.play_recorded(&legal.mv)
            .ok_or_else(|| IllegalMoveError { uci: legal.uci.clone() })
    }

    /// Raw successors for search. Moves come from `legal_moves()` of this
    /// same position, so the unchecked play is sound.
    pub(crate) fn successors(&self) -> impl Iterator<Item = GamePosition> + '_ {
        self.chess.legal_moves().into_iter().map(move |mv| {
            let mut next = self.chess.clone();
            next.play_unchecked(mv);
            GamePosition { chess: next }
        })
    }

    pub(crate) fn successor(&self, legal: &LegalMove) -> GamePosition {
        let mut next = self.chess.clone();
        next.play_unchecked(legal.mv.clone());
        GamePosition { chess: next }
    }

    pub fn is_check(&self) -> bool {
        self.chess.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.chess.is_checkmate()
    }

    pub fn is_stalemate(&self) -> bool {
        self.chess.is_stalemate()
    }

    pub fn is_insufficient_material(&self) -> bool {
        self.chess.is_insufficient_material()
    }

    pub fn is_fifty_move_draw(&self) -> bool {
        self.chess.halfmoves() >= FIFTY_MOVE_HALFMOVES
    }

    /// Draw conditions visible from the position alone (no repetition).
    pub fn is_draw(&self) -> bool {
        self.is_stalemate() || self.is_insufficient_material() || self.is_fifty_move_draw()
    }

    /// No legal moves, or a draw by rule.
    pub fn is_terminal(&self) -> bool {
        self.status(0).is_over()
    }

    /// Classify the position. `repetitions` is how many times this position
    /// has occurred in the game, including now.
    pub fn status(&self, repetitions: usize) -> GameStatus {
        if self.is_checkmate() {
            GameStatus::Checkmate {
                winner: self.turn().opposite(),
            }
        } else if self.is_stalemate() {
            GameStatus::Stalemate
        } else if self.is_insufficient_material() {
            GameStatus::Draw {
                reason: DrawReason::InsufficientMaterial,
            }
        } else if self.is_fifty_move_draw() {
            GameStatus::Draw {
                reason: DrawReason::FiftyMoveRule,
            }
        } else if repetitions >= 3 {
            GameStatus::Draw {
                reason: DrawReason::ThreefoldRepetition,
            }
        } else {
            GameStatus::InProgress
        }
    }

    /// True when a pawn drop from `from` to `to` needs a piece choice.
    pub fn is_promotion_drop(&self, from: Square, to: Square) -> bool {
        let last_rank = match self.chess.turn() {
            shakmaty::Color::White => Rank::Eighth,
            shakmaty::Color::Black => Rank::First,
        };
        if to.rank() != last_rank {
            return false;
        }
        self.chess
            .legal_moves()
            .iter()
            .any(|m| m.from() == Some(from) && m.to() == to && m.is_promotion())
    }

    /// Same placement with `side` forced to move. The en-passant target is
    /// dropped. `None` if the result is not a valid position (for example the
    /// other side would be in check).
    pub fn with_turn(&self, side: Side) -> Option<GamePosition> {
        if self.turn() == side {
            return Some(self.clone());
        }
        let fen = self.fen();
        let mut fields: Vec<&str> = fen.split(' ').collect();
        if fields.len() != 6 {
            return None;
        }
        fields[1] = match side {
            Side::White => "w",
            Side::Black => "b",
        };
        fields[3] = "-";
        GamePosition::from_fen(&fields.join(" ")).ok()
    }

    /// All pieces of one side, in square order.
    pub fn pieces(&self, side: Side) -> Vec<(Role, Square)> {
        let board = self.board();
        board
            .by_color(side.into())
            .into_iter()
            .filter_map(|sq| board.piece_at(sq).map(|p| (p.role, sq)))
            .collect()
    }

    pub fn king_square(&self, side: Side) -> Option<Square> {
        self.board().king_of(side.into())
    }

    /// Pieces of `by` attacking `square`.
    pub fn attackers_of(&self, square: Square, by: Side) -> Vec<(Role, Square)> {
        let board = self.board();
        board
            .attacks_to(square, by.into(), board.occupied())
            .into_iter()
            .filter_map(|sq| board.piece_at(sq).map(|p| (p.role, sq)))
            .collect()
    }

    fn describe(&self, index: usize, mv: &Move) -> LegalMove {
        let mut after = self.chess.clone();
        after.play_unchecked(mv.clone());
        let (from, to) = endpoints(mv);
        LegalMove {
            index,
            san: san_with_suffix(&self.chess, mv, &after),
            uci: UciMove::from_move(mv.clone(), CastlingMode::Standard).to_string(),
            from,
            to,
            piece: mv.role(),
            captured: mv.capture(),
            promotion: mv.promotion(),
            mv: mv.clone(),
        }
    }

    fn play_recorded(&self, mv: &Move) -> Option<(GamePosition, MoveRecord)> {
        let color = self.turn();
        let after = self.chess.clone().play(mv.clone()).ok()?;
        let (from, to) = endpoints(mv);
        let record = MoveRecord {
            color,
            from: from.to_string(),
            to: to.to_string(),
            piece: mv.role().into(),
            san: san_with_suffix(&self.chess, mv, &after),
            uci: UciMove::from_move(mv.clone(), CastlingMode::Standard).to_string(),
            captured: mv.capture().map(PieceKind::from),
            promotion: mv.promotion().map(PieceKind::from),
        };
        Some((GamePosition { chess: after }, record))
    }
}

/// Board squares a UI would use: castling is the king's two-square step.
fn endpoints(mv: &Move) -> (Square, Square) {
    match UciMove::from_move(mv.clone(), CastlingMode::Standard) {
        UciMove::Normal { from, to, .. } => (from, to),
        _ => (mv.from().unwrap_or_else(|| mv.to()), mv.to()),
    }
}

fn san_with_suffix(before: &Chess, mv: &Move, after: &Chess) -> String {
    let san = San::from_move(before, mv.clone()).to_string();
    if after.is_checkmate() {
        format!("{san}#")
    } else if after.is_check() {
        format!("{san}+")
    } else {
        san
    }
}

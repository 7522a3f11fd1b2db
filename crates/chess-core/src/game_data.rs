use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role};

use crate::error::OracleError;

/// Side of the board. Serialized as "white" / "black" like the move history panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

/// Piece kind, serialized as the lowercase piece letter (`p n b r q k`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    #[serde(rename = "p")]
    Pawn,
    #[serde(rename = "n")]
    Knight,
    #[serde(rename = "b")]
    Bishop,
    #[serde(rename = "r")]
    Rook,
    #[serde(rename = "q")]
    Queen,
    #[serde(rename = "k")]
    King,
}

impl PieceKind {
    pub fn letter(self) -> char {
        Role::from(self).char()
    }

    /// Parse a piece letter. Accepts either case.
    pub fn from_letter(letter: &str) -> Result<Self, OracleError> {
        let mut chars = letter.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Role::from_char(c.to_ascii_lowercase())
                .map(PieceKind::from)
                .ok_or_else(|| OracleError::InvalidPiece(letter.to_string())),
            _ => Err(OracleError::InvalidPiece(letter.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceKind::Pawn => "Pawn",
            PieceKind::Knight => "Knight",
            PieceKind::Bishop => "Bishop",
            PieceKind::Rook => "Rook",
            PieceKind::Queen => "Queen",
            PieceKind::King => "King",
        }
    }
}

impl From<Role> for PieceKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Pawn => PieceKind::Pawn,
            Role::Knight => PieceKind::Knight,
            Role::Bishop => PieceKind::Bishop,
            Role::Rook => PieceKind::Rook,
            Role::Queen => PieceKind::Queen,
            Role::King => PieceKind::King,
        }
    }
}

impl From<PieceKind> for Role {
    fn from(kind: PieceKind) -> Self {
        match kind {
            PieceKind::Pawn => Role::Pawn,
            PieceKind::Knight => Role::Knight,
            PieceKind::Bishop => Role::Bishop,
            PieceKind::Rook => Role::Rook,
            PieceKind::Queen => Role::Queen,
            PieceKind::King => Role::King,
        }
    }
}

/// One applied ply. Squares are algebraic names ("e2").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub color: Side,
    pub from: String,
    pub to: String,
    pub piece: PieceKind,
    pub san: String,
    pub uci: String,
    pub captured: Option<PieceKind>,
    pub promotion: Option<PieceKind>,
}

/// Move history grouped by full-move number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub number: usize,
    pub white: Option<MoveRecord>,
    pub black: Option<MoveRecord>,
}

/// Pair records into numbered rows. A game that starts with Black to move
/// gets an empty white cell in its first row.
pub fn history_rows(records: &[MoveRecord]) -> Vec<HistoryRow> {
    let mut rows: Vec<HistoryRow> = Vec::new();
    for record in records {
        match record.color {
            Side::White => rows.push(HistoryRow {
                number: rows.len() + 1,
                white: Some(record.clone()),
                black: None,
            }),
            Side::Black => match rows.last_mut() {
                Some(row) if row.black.is_none() => row.black = Some(record.clone()),
                _ => rows.push(HistoryRow {
                    number: rows.len() + 1,
                    white: None,
                    black: Some(record.clone()),
                }),
            },
        }
    }
    rows
}

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Oracle,
    Heuristic,
}

/// Advisory best move for the human's turn. Never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub move_index: usize,
    pub san: String,
    pub from: String,
    pub to: String,
    pub piece: PieceKind,
    pub rationale: String,
    pub source: SuggestionSource,
}

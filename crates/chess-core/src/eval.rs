/// Static position evaluation: material plus a small mobility term.
/// Positive scores favour White.

use shakmaty::{Color, Role};

use crate::game_data::Side;
use crate::oracle::GamePosition;

// Piece values in centipawns
pub const PAWN_VALUE: i32 = 100;
pub const KNIGHT_VALUE: i32 = 320;
pub const BISHOP_VALUE: i32 = 330;
pub const ROOK_VALUE: i32 = 500;
pub const QUEEN_VALUE: i32 = 900;

/// Weight of one legal move of mobility difference.
pub const MOBILITY_WEIGHT: f64 = 0.1;

/// Piece value (king counts zero)
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => 0,
    }
}

/// White material minus Black material.
pub fn material_balance(position: &GamePosition) -> i32 {
    let board = position.board();
    let mut score = 0i32;
    for sq in board.occupied() {
        if let Some(piece) = board.piece_at(sq) {
            let val = piece_value(piece.role);
            if piece.color == Color::White {
                score += val;
            } else {
                score -= val;
            }
        }
    }
    score
}

/// Legal-move count with White forced to move minus the same for Black.
/// Zero when either forced position is not valid.
pub fn mobility(position: &GamePosition) -> i32 {
    match (position.with_turn(Side::White), position.with_turn(Side::Black)) {
        (Some(white), Some(black)) => {
            white.legal_move_count() as i32 - black.legal_move_count() as i32
        }
        _ => 0,
    }
}

pub fn evaluate(position: &GamePosition) -> f64 {
    material_balance(position) as f64 + MOBILITY_WEIGHT * mobility(position) as f64
}

/// `evaluate` from `side`'s point of view.
pub fn evaluate_for(position: &GamePosition, side: Side) -> f64 {
    match side {
        Side::White => evaluate(position),
        Side::Black => -evaluate(position),
    }
}

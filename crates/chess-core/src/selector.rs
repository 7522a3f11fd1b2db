//! Opponent move selection under the three difficulty policies.

use std::fmt;
use std::str::FromStr;

use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shakmaty::{File, Rank, Role};
use tracing::debug;

use crate::error::NoLegalMoveError;
use crate::eval::{evaluate_for, piece_value};
use crate::game_data::Side;
use crate::oracle::{GamePosition, LegalMove};

/// Plies searched by the Hard policy, counting the candidate move itself.
pub const SEARCH_DEPTH: u32 = 2;

// Greedy scorer weights
const CAPTURE_PENALTY: f64 = 5.0;
const MATE_BONUS: f64 = 10_000.0;
const CHECK_BONUS: f64 = 50.0;
const CENTER_BONUS: f64 = 8.0;
const MINOR_PIECE_BONUS: f64 = 6.0;
const EARLY_QUEEN_PENALTY: f64 = 10.0;
const EARLY_QUEEN_MOVES: u32 = 10;
const DEFAULT_PROMOTION_VALUE: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" | "medium" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("Unknown difficulty: {other}")),
        }
    }
}

/// Pick a move for the side to move.
pub fn select_move<R: Rng + ?Sized>(
    position: &GamePosition,
    difficulty: Difficulty,
    rng: &mut R,
) -> Result<LegalMove, NoLegalMoveError> {
    let legal = position.legal_moves();
    let chosen = match difficulty {
        Difficulty::Easy => legal.into_iter().choose(rng),
        Difficulty::Normal => pick_heuristic(position, &legal, rng),
        Difficulty::Hard => search_best(position, &legal),
    };
    if let Some(ref mv) = chosen {
        debug!(%difficulty, san = %mv.san, "Opponent move selected");
    }
    chosen.ok_or(NoLegalMoveError)
}

fn promotion_value(role: Role) -> f64 {
    match piece_value(role) {
        0 => DEFAULT_PROMOTION_VALUE,
        value => value as f64,
    }
}

fn is_central(mv: &LegalMove) -> bool {
    matches!(mv.to.file(), File::C | File::D | File::E | File::F)
        && matches!(
            mv.to.rank(),
            Rank::Third | Rank::Fourth | Rank::Fifth | Rank::Sixth
        )
}

/// Deterministic part of the greedy score.
pub fn heuristic_score(position: &GamePosition, mv: &LegalMove) -> f64 {
    let mut score = 0.0;

    if let Some(captured) = mv.captured {
        score += piece_value(captured) as f64 - CAPTURE_PENALTY;
    }
    if mv.gives_mate() {
        score += MATE_BONUS;
    } else if mv.gives_check() {
        score += CHECK_BONUS;
    }
    if is_central(mv) {
        score += CENTER_BONUS;
    }
    if matches!(mv.piece, Role::Knight | Role::Bishop) {
        score += MINOR_PIECE_BONUS;
    }
    if mv.piece == Role::Queen && position.fullmove_number() < EARLY_QUEEN_MOVES {
        score -= EARLY_QUEEN_PENALTY;
    }
    if let Some(promoted) = mv.promotion {
        score += promotion_value(promoted);
    }

    score
}

/// Greedy one-ply pick with a fresh random tiebreak in [0, 1) per move.
pub fn pick_heuristic<R: Rng + ?Sized>(
    position: &GamePosition,
    legal: &[LegalMove],
    rng: &mut R,
) -> Option<LegalMove> {
    let mut best: Option<(&LegalMove, f64)> = None;
    for mv in legal {
        let score = heuristic_score(position, mv) + rng.random::<f64>();
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((mv, score));
        }
    }
    best.map(|(mv, _)| mv.clone())
}

/// Hard policy: the candidate that maximises the minimax value for the side
/// to move. Ties keep the earliest candidate in enumeration order.
pub fn search_best(position: &GamePosition, legal: &[LegalMove]) -> Option<LegalMove> {
    let me = position.turn();
    let mut alpha = f64::NEG_INFINITY;
    let beta = f64::INFINITY;
    let mut best: Option<(&LegalMove, f64)> = None;

    for mv in legal {
        let child = position.successor(mv);
        let score = minimax(&child, SEARCH_DEPTH - 1, alpha, beta, false, me);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((mv, score));
        }
        alpha = alpha.max(score);
    }

    best.map(|(mv, score)| {
        debug!(san = %mv.san, score, "Search finished");
        mv.clone()
    })
}

/// Minimax value of the root position for the side to move, without the
/// move itself. Used to compare against unpruned search in tests.
pub fn search_value(position: &GamePosition) -> f64 {
    minimax(
        position,
        SEARCH_DEPTH,
        f64::NEG_INFINITY,
        f64::INFINITY,
        true,
        position.turn(),
    )
}

/// Alpha-beta minimax. Scores are from `perspective`'s point of view.
pub fn minimax(
    position: &GamePosition,
    depth: u32,
    mut alpha: f64,
    mut beta: f64,
    maximizing: bool,
    perspective: Side,
) -> f64 {
    if depth == 0 || position.is_terminal() {
        return evaluate_for(position, perspective);
    }

    if maximizing {
        let mut value = f64::NEG_INFINITY;
        for child in position.successors() {
            value = value.max(minimax(&child, depth - 1, alpha, beta, false, perspective));
            alpha = alpha.max(value);
            if alpha >= beta {
                break;
            }
        }
        value
    } else {
        let mut value = f64::INFINITY;
        for child in position.successors() {
            value = value.min(minimax(&child, depth - 1, alpha, beta, true, perspective));
            beta = beta.min(value);
            if alpha >= beta {
                break;
            }
        }
        value
    }
}

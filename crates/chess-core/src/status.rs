use serde::{Deserialize, Serialize};

use crate::game_data::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

/// Game result derived from the position after every applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Checkmate { winner: Side },
    Stalemate,
    Draw { reason: DrawReason },
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    /// Status line shown under the board.
    pub fn text(&self, to_move: Side, in_check: bool) -> String {
        match self {
            GameStatus::InProgress if in_check => format!("{} to move, in check", to_move.label()),
            GameStatus::InProgress => format!("{} to move", to_move.label()),
            GameStatus::Checkmate { winner } => format!("Checkmate, {} wins", winner.label()),
            GameStatus::Stalemate => "Stalemate, draw".to_string(),
            GameStatus::Draw { reason } => match reason {
                DrawReason::InsufficientMaterial => "Draw by insufficient material".to_string(),
                DrawReason::FiftyMoveRule => "Draw by the fifty-move rule".to_string(),
                DrawReason::ThreefoldRepetition => "Draw by threefold repetition".to_string(),
            },
        }
    }
}

/// `{over, text}` pushed to the UI after each move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    pub over: bool,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        let mate = GameStatus::Checkmate { winner: Side::White };
        assert!(mate.is_over());
        assert_eq!(mate.text(Side::Black, true), "Checkmate, White wins");
        assert_eq!(GameStatus::InProgress.text(Side::Black, true), "Black to move, in check");
        assert!(!GameStatus::InProgress.is_over());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(GameStatus::Draw { reason: DrawReason::FiftyMoveRule }).unwrap();
        assert_eq!(json["kind"], "draw");
        assert_eq!(json["reason"], "fifty_move_rule");
    }
}

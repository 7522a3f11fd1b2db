//! Error types for the rules adapter, move selector and game session

use thiserror::Error;

/// Input that cannot be turned into a position, square or piece.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Invalid piece letter: {0}")]
    InvalidPiece(String),
}

/// Move attempt that is not in the current legal set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Illegal move: {uci}")]
pub struct IllegalMoveError {
    pub uci: String,
}

/// The move selector was invoked on a position without legal moves.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No legal move available")]
pub struct NoLegalMoveError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Illegal(#[from] IllegalMoveError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("No promotion is pending")]
    InvalidPromotionRequest,

    #[error("Difficulty has not been chosen")]
    DifficultyNotChosen,

    #[error("It is not the human's turn")]
    NotHumanTurn,

    #[error("Game is over")]
    GameOver,

    #[error("Opponent turn ticket is stale")]
    StaleTicket,
}

//! Chess rules, evaluation, move selection and the game session for the trainer.
//!
//! Everything here is synchronous and free of I/O. The advice oracle and the
//! async scheduling of opponent replies live in the `trainer` crate.

pub use shakmaty;

pub mod error;
pub mod eval;
pub mod game_data;
pub mod oracle;
pub mod selector;
pub mod session;
pub mod status;

pub use error::{IllegalMoveError, NoLegalMoveError, OracleError, SessionError};
pub use game_data::{MoveRecord, PieceKind, Side, Suggestion, SuggestionSource};
pub use oracle::{GamePosition, LegalMove, MoveRequest};
pub use selector::Difficulty;
pub use session::{GameSession, MoveOutcome, SessionState, Turn};
pub use status::{DrawReason, GameStatus, StatusLine};

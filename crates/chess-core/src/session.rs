//! Game session state machine.
//!
//! The session is the only owner of the live position. Human moves, opponent
//! moves and suggestion results all go through it, one at a time. Async
//! follow-ups work on snapshots and come back with a ticket; tickets from a
//! reset game or a superseded suggestion request are refused.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shakmaty::{Role, Square};
use tracing::{debug, error, info};

use crate::error::{NoLegalMoveError, OracleError, SessionError};
use crate::game_data::{history_rows, HistoryRow, MoveRecord, Side, Suggestion};
use crate::oracle::{GamePosition, LegalMove, MoveRequest};
use crate::selector::{select_move, Difficulty};
use crate::status::{GameStatus, StatusLine};

/// Sub-state while a game is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    AwaitingHumanMove,
    AwaitingPromotionChoice,
    AwaitingOpponentMove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SessionState {
    AwaitingDifficultyChoice,
    InProgress(Turn),
    Over(GameStatus),
}

/// A pawn drop onto the last rank waiting for a piece choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPromotion {
    pub from: Square,
    pub to: Square,
    pub color: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionPrompt {
    pub from: String,
    pub to: String,
    pub color: Side,
}

impl From<PendingPromotion> for PromotionPrompt {
    fn from(p: PendingPromotion) -> Self {
        Self {
            from: p.from.to_string(),
            to: p.to.to_string(),
            color: p.color,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Nothing applied yet; a piece must be chosen.
    PromotionRequired(PendingPromotion),
    Applied {
        record: MoveRecord,
        status: GameStatus,
        /// An opponent reply should be scheduled.
        opponent_to_move: bool,
    },
}

/// Everything needed to pick the opponent's move away from the session.
#[derive(Debug, Clone)]
pub struct OpponentTurn {
    pub position: GamePosition,
    pub difficulty: Difficulty,
    pub seed: u64,
    epoch: u64,
    ply: usize,
}

impl OpponentTurn {
    pub fn select(&self) -> Result<LegalMove, NoLegalMoveError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        select_move(&self.position, self.difficulty, &mut rng)
    }
}

/// Handle for one suggestion request.
#[derive(Debug, Clone)]
pub struct SuggestionTicket {
    pub generation: u64,
    pub position: GamePosition,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub fen: String,
    pub state: SessionState,
    pub status: GameStatus,
    pub status_line: StatusLine,
    pub difficulty: Option<Difficulty>,
    pub human: Side,
    pub to_move: Side,
    pub history: Vec<MoveRecord>,
    pub rows: Vec<HistoryRow>,
    pub pending_promotion: Option<PromotionPrompt>,
    pub suggestion: Option<Suggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingDifficulty,
    HumanToMove,
    Promotion(PendingPromotion),
    OpponentToMove,
}

#[derive(Debug)]
pub struct GameSession {
    initial: GamePosition,
    position: GamePosition,
    history: Vec<MoveRecord>,
    repetitions: HashMap<String, usize>,
    difficulty: Option<Difficulty>,
    phase: Phase,
    human: Side,
    suggestion: Option<Suggestion>,
    generation: u64,
    epoch: u64,
    rng: StdRng,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    /// Standard starting position, human plays White.
    pub fn new() -> Self {
        Self::with_rng(GamePosition::starting(), StdRng::from_os_rng())
    }

    /// Deterministic session for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(GamePosition::starting(), StdRng::seed_from_u64(seed))
    }

    pub fn from_fen(fen: &str) -> Result<Self, OracleError> {
        Ok(Self::with_rng(GamePosition::from_fen(fen)?, StdRng::from_os_rng()))
    }

    pub fn from_fen_seeded(fen: &str, seed: u64) -> Result<Self, OracleError> {
        Ok(Self::with_rng(GamePosition::from_fen(fen)?, StdRng::seed_from_u64(seed)))
    }

    fn with_rng(initial: GamePosition, rng: StdRng) -> Self {
        let mut session = Self {
            position: initial.clone(),
            initial,
            history: Vec::new(),
            repetitions: HashMap::new(),
            difficulty: None,
            phase: Phase::AwaitingDifficulty,
            human: Side::White,
            suggestion: None,
            generation: 0,
            epoch: 0,
            rng,
        };
        session.count_position();
        session
    }

    pub fn position(&self) -> &GamePosition {
        &self.position
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn history_rows(&self) -> Vec<HistoryRow> {
        history_rows(&self.history)
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn human(&self) -> Side {
        self.human
    }

    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.suggestion.as_ref()
    }

    pub fn pending_promotion(&self) -> Option<PendingPromotion> {
        match self.phase {
            Phase::Promotion(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn status(&self) -> GameStatus {
        let seen = self
            .repetitions
            .get(&self.position.repetition_key())
            .copied()
            .unwrap_or(1);
        self.position.status(seen)
    }

    pub fn status_line(&self) -> StatusLine {
        let status = self.status();
        StatusLine {
            over: status.is_over(),
            text: status.text(self.position.turn(), self.position.is_check()),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.phase == Phase::AwaitingDifficulty {
            return SessionState::AwaitingDifficultyChoice;
        }
        let status = self.status();
        if status.is_over() {
            return SessionState::Over(status);
        }
        SessionState::InProgress(match self.phase {
            Phase::Promotion(_) => Turn::AwaitingPromotionChoice,
            Phase::OpponentToMove => Turn::AwaitingOpponentMove,
            _ => Turn::AwaitingHumanMove,
        })
    }

    /// Start the game. Ignored (returns false) once a difficulty is set.
    pub fn choose_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.phase != Phase::AwaitingDifficulty {
            debug!(current = ?self.difficulty, requested = %difficulty, "Difficulty already fixed");
            return false;
        }
        self.difficulty = Some(difficulty);
        self.phase = if self.position.turn() == self.human {
            Phase::HumanToMove
        } else {
            Phase::OpponentToMove
        };
        info!(%difficulty, "Game started");
        true
    }

    /// A drop from the UI. Rejected attempts change nothing.
    pub fn attempt_move(&mut self, request: &MoveRequest) -> Result<MoveOutcome, SessionError> {
        self.ensure_human_turn()?;

        if request.promotion.is_none() && self.position.is_promotion_drop(request.from, request.to) {
            let pending = PendingPromotion {
                from: request.from,
                to: request.to,
                color: self.position.turn(),
            };
            self.phase = Phase::Promotion(pending);
            debug!(from = %request.from, to = %request.to, "Awaiting promotion choice");
            return Ok(MoveOutcome::PromotionRequired(pending));
        }

        self.play_human(request)
    }

    pub fn resolve_promotion(&mut self, role: Role) -> Result<MoveOutcome, SessionError> {
        let Phase::Promotion(pending) = self.phase else {
            return Err(SessionError::InvalidPromotionRequest);
        };
        self.phase = Phase::HumanToMove;
        let outcome = self.play_human(&MoveRequest::new(pending.from, pending.to, Some(role)));
        if outcome.is_err() {
            self.phase = Phase::Promotion(pending);
        }
        outcome
    }

    pub fn cancel_promotion(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Promotion(_) => {
                self.phase = Phase::HumanToMove;
                Ok(())
            }
            _ => Err(SessionError::InvalidPromotionRequest),
        }
    }

    /// Ticket for the pending opponent move, if one is due.
    pub fn opponent_turn(&mut self) -> Option<OpponentTurn> {
        if self.phase != Phase::OpponentToMove || self.status().is_over() {
            return None;
        }
        let difficulty = self.difficulty?;
        Some(OpponentTurn {
            position: self.position.clone(),
            difficulty,
            seed: self.rng.random(),
            epoch: self.epoch,
            ply: self.history.len(),
        })
    }

    pub fn apply_opponent_move(
        &mut self,
        turn: &OpponentTurn,
        mv: &LegalMove,
    ) -> Result<MoveRecord, SessionError> {
        if turn.epoch != self.epoch
            || turn.ply != self.history.len()
            || self.phase != Phase::OpponentToMove
        {
            return Err(SessionError::StaleTicket);
        }
        let (next, record) = self.position.apply_legal(mv)?;
        self.commit(next, record.clone());
        self.phase = Phase::HumanToMove;
        Ok(record)
    }

    /// Select and apply the opponent move in one step.
    pub fn play_opponent_move(&mut self) -> Result<Option<MoveRecord>, SessionError> {
        let Some(turn) = self.opponent_turn() else {
            return Ok(None);
        };
        match turn.select() {
            Ok(mv) => self.apply_opponent_move(&turn, &mv).map(Some),
            Err(e) => {
                // opponent_turn() only hands out tickets for running games
                error!(fen = %turn.position.fen(), error = %e, "Opponent has no move");
                debug_assert!(turn.position.legal_move_count() > 0, "selector called on a finished game");
                Ok(None)
            }
        }
    }

    /// Start a suggestion request for the human's turn. Any earlier request
    /// is superseded.
    pub fn begin_suggestion(&mut self) -> Option<SuggestionTicket> {
        if self.phase != Phase::HumanToMove || self.status().is_over() {
            return None;
        }
        self.generation += 1;
        self.suggestion = None;
        Some(SuggestionTicket {
            generation: self.generation,
            position: self.position.clone(),
            seed: self.rng.random(),
        })
    }

    /// Store a suggestion result. Returns false and drops it if the request
    /// was superseded.
    pub fn accept_suggestion(&mut self, generation: u64, suggestion: Option<Suggestion>) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Dropping stale suggestion");
            return false;
        }
        self.suggestion = suggestion;
        true
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// Back to the initial position, waiting for a difficulty choice.
    pub fn reset(&mut self) {
        self.position = self.initial.clone();
        self.history.clear();
        self.repetitions.clear();
        self.count_position();
        self.difficulty = None;
        self.phase = Phase::AwaitingDifficulty;
        self.suggestion = None;
        self.generation += 1;
        self.epoch += 1;
        info!("Session reset");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            fen: self.position.fen(),
            state: self.state(),
            status: self.status(),
            status_line: self.status_line(),
            difficulty: self.difficulty,
            human: self.human,
            to_move: self.position.turn(),
            history: self.history.clone(),
            rows: self.history_rows(),
            pending_promotion: self.pending_promotion().map(PromotionPrompt::from),
            suggestion: self.suggestion.clone(),
        }
    }

    fn ensure_human_turn(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::AwaitingDifficulty => Err(SessionError::DifficultyNotChosen),
            _ if self.status().is_over() => Err(SessionError::GameOver),
            Phase::HumanToMove => Ok(()),
            Phase::Promotion(_) | Phase::OpponentToMove => Err(SessionError::NotHumanTurn),
        }
    }

    fn play_human(&mut self, request: &MoveRequest) -> Result<MoveOutcome, SessionError> {
        let (next, record) = self.position.apply(request)?;
        self.commit(next, record.clone());

        let status = self.status();
        let opponent_to_move = !status.is_over();
        self.phase = if opponent_to_move {
            Phase::OpponentToMove
        } else {
            Phase::HumanToMove
        };
        Ok(MoveOutcome::Applied {
            record,
            status,
            opponent_to_move,
        })
    }

    fn commit(&mut self, next: GamePosition, record: MoveRecord) {
        debug!(san = %record.san, color = ?record.color, "Move applied");
        self.position = next;
        self.history.push(record);
        self.count_position();
        // The old suggestion belongs to the previous position
        self.generation += 1;
        self.suggestion = None;
    }

    fn count_position(&mut self) {
        *self
            .repetitions
            .entry(self.position.repetition_key())
            .or_insert(0) += 1;
    }
}

//! Async driver around one `GameSession`.
//!
//! Every mutation goes through the session mutex. Opponent replies and
//! suggestions run as spawned follow-ups; they hold the lock only to take a
//! ticket and to hand the result back, never across selection or oracle
//! calls.

use std::sync::Arc;
use std::time::Duration;

use chess_core::shakmaty::Role;
use chess_core::{
    Difficulty, GameSession, MoveOutcome, MoveRecord, MoveRequest, SessionError, SessionState,
    StatusLine, Suggestion, Turn,
};
use chess_core::session::SessionSnapshot;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::client::AdviceOracle;
use crate::commentary::{explain, PositionFacts};
use crate::config::AdvisorConfig;
use crate::pipeline::SuggestionPipeline;

const EVENT_CAPACITY: usize = 64;

/// Pushed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainerEvent {
    Status { over: bool, text: String },
    MoveMade { record: MoveRecord },
    Suggestion { suggestion: Option<Suggestion> },
}

impl From<StatusLine> for TrainerEvent {
    fn from(line: StatusLine) -> Self {
        TrainerEvent::Status {
            over: line.over,
            text: line.text,
        }
    }
}

pub struct Trainer {
    session: Mutex<GameSession>,
    pipeline: SuggestionPipeline,
    oracle: Arc<dyn AdviceOracle>,
    advice_timeout: Duration,
    opponent_delay: Duration,
    events: broadcast::Sender<TrainerEvent>,
}

impl Trainer {
    pub fn new(session: GameSession, oracle: Arc<dyn AdviceOracle>, config: &AdvisorConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            session: Mutex::new(session),
            pipeline: SuggestionPipeline::new(oracle.clone(), config.advice_timeout),
            oracle,
            advice_timeout: config.advice_timeout,
            opponent_delay: config.opponent_delay,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrainerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Starts the game. Kicks off the opponent if it moves first, else the
    /// first suggestion.
    pub async fn choose_difficulty(self: &Arc<Self>, difficulty: Difficulty) -> bool {
        let (chosen, status, opponent_first) = {
            let mut session = self.session.lock().await;
            let chosen = session.choose_difficulty(difficulty);
            let opponent_first = session.human() != session.position().turn();
            (chosen, session.status_line(), opponent_first)
        };
        if !chosen {
            return false;
        }
        self.publish(status.into());
        if opponent_first {
            self.spawn_opponent();
        } else {
            self.spawn_suggestion();
        }
        true
    }

    pub async fn attempt_move(self: &Arc<Self>, request: &MoveRequest) -> Result<MoveOutcome, SessionError> {
        let (outcome, status) = {
            let mut session = self.session.lock().await;
            let outcome = session.attempt_move(request)?;
            (outcome, session.status_line())
        };
        self.after_human_move(&outcome, status);
        Ok(outcome)
    }

    pub async fn resolve_promotion(self: &Arc<Self>, role: Role) -> Result<MoveOutcome, SessionError> {
        let (outcome, status) = {
            let mut session = self.session.lock().await;
            let outcome = session.resolve_promotion(role)?;
            (outcome, session.status_line())
        };
        self.after_human_move(&outcome, status);
        Ok(outcome)
    }

    pub async fn cancel_promotion(&self) -> Result<(), SessionError> {
        self.session.lock().await.cancel_promotion()
    }

    /// New game from the initial position. In-flight follow-ups from the old
    /// game are dropped when they come back.
    pub async fn reset(&self) {
        let status = {
            let mut session = self.session.lock().await;
            session.reset();
            session.status_line()
        };
        self.publish(status.into());
        self.publish(TrainerEvent::Suggestion { suggestion: None });
    }

    /// Free-form question about the current position.
    pub async fn ask(&self, question: &str) -> String {
        let facts = {
            let session = self.session.lock().await;
            PositionFacts::from_session(&session)
        };
        explain(self.oracle.as_ref(), self.advice_timeout, &facts, question).await
    }

    /// Re-request a suggestion. Returns false unless the human is to move.
    pub async fn request_suggestion(self: &Arc<Self>) -> bool {
        let ready = self.session.lock().await.state()
            == SessionState::InProgress(Turn::AwaitingHumanMove);
        if ready {
            self.spawn_suggestion();
        }
        ready
    }

    fn after_human_move(self: &Arc<Self>, outcome: &MoveOutcome, status: StatusLine) {
        let MoveOutcome::Applied {
            record,
            opponent_to_move,
            ..
        } = outcome
        else {
            return;
        };
        self.publish(TrainerEvent::MoveMade {
            record: record.clone(),
        });
        self.publish(status.into());
        self.publish(TrainerEvent::Suggestion { suggestion: None });
        if *opponent_to_move {
            self.spawn_opponent();
        }
    }

    fn spawn_opponent(self: &Arc<Self>) {
        let trainer = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(trainer.opponent_delay).await;
            if trainer.run_opponent().await {
                trainer.run_suggestion().await;
            }
        });
    }

    fn spawn_suggestion(self: &Arc<Self>) {
        let trainer = Arc::clone(self);
        tokio::spawn(async move {
            trainer.run_suggestion().await;
        });
    }

    /// Returns true when the opponent moved and the game goes on.
    async fn run_opponent(&self) -> bool {
        let Some(turn) = self.session.lock().await.opponent_turn() else {
            return false;
        };

        let selecting = turn.clone();
        let mv = match tokio::task::spawn_blocking(move || selecting.select()).await {
            Ok(Ok(mv)) => mv,
            Ok(Err(e)) => {
                error!(fen = %turn.position.fen(), error = %e, "Opponent selection failed");
                return false;
            }
            Err(e) => {
                error!(error = %e, "Opponent selection task panicked");
                return false;
            }
        };

        let (record, status) = {
            let mut session = self.session.lock().await;
            match session.apply_opponent_move(&turn, &mv) {
                Ok(record) => (record, session.status_line()),
                Err(SessionError::StaleTicket) => {
                    debug!(san = %mv.san, "Dropping opponent move from a previous game");
                    return false;
                }
                Err(e) => {
                    warn!(san = %mv.san, error = %e, "Opponent move rejected");
                    return false;
                }
            }
        };

        info!(san = %record.san, difficulty = %turn.difficulty, "Opponent moved");
        let over = status.over;
        self.publish(TrainerEvent::MoveMade { record });
        self.publish(status.into());
        !over
    }

    async fn run_suggestion(&self) {
        let Some(ticket) = self.session.lock().await.begin_suggestion() else {
            return;
        };
        let mut rng = StdRng::seed_from_u64(ticket.seed);
        let suggestion = self.pipeline.suggest(&ticket.position, &mut rng).await;

        let accepted = self
            .session
            .lock()
            .await
            .accept_suggestion(ticket.generation, suggestion.clone());
        if accepted {
            self.publish(TrainerEvent::Suggestion { suggestion });
        }
    }

    fn publish(&self, event: TrainerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DisabledOracle;
    use chess_core::{GameStatus, Side};
    use tokio::time::timeout;

    fn fast_config() -> AdvisorConfig {
        AdvisorConfig {
            opponent_delay: Duration::from_millis(0),
            advice_timeout: Duration::from_millis(200),
            ..AdvisorConfig::default()
        }
    }

    fn trainer_with(session: GameSession) -> Arc<Trainer> {
        Trainer::new(session, Arc::new(DisabledOracle), &fast_config())
    }

    async fn next_event(
        rx: &mut broadcast::Receiver<TrainerEvent>,
        mut pred: impl FnMut(&TrainerEvent) -> bool,
    ) -> TrainerEvent {
        timeout(Duration::from_secs(5), async {
            loop {
                let event = rx.recv().await.unwrap();
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("event in time")
    }

    #[tokio::test]
    async fn test_opponent_replies_then_suggestion() {
        let trainer = trainer_with(GameSession::with_seed(4));
        let mut rx = trainer.subscribe();

        assert!(trainer.choose_difficulty(Difficulty::Normal).await);
        trainer
            .attempt_move(&MoveRequest::parse("e2", "e4", None).unwrap())
            .await
            .unwrap();

        next_event(&mut rx, |e| {
            matches!(e, TrainerEvent::MoveMade { record } if record.color == Side::Black)
        })
        .await;
        let event = next_event(&mut rx, |e| {
            matches!(e, TrainerEvent::Suggestion { suggestion: Some(_) })
        })
        .await;

        let snapshot = trainer.snapshot().await;
        assert_eq!(snapshot.history.len(), 2);
        let TrainerEvent::Suggestion { suggestion } = event else {
            unreachable!()
        };
        assert_eq!(snapshot.suggestion, suggestion);
    }

    #[tokio::test]
    async fn test_rejected_move_publishes_nothing() {
        let trainer = trainer_with(GameSession::with_seed(4));
        trainer.choose_difficulty(Difficulty::Easy).await;
        let mut rx = trainer.subscribe();

        let result = trainer
            .attempt_move(&MoveRequest::parse("e2", "e5", None).unwrap())
            .await;
        assert!(matches!(result, Err(SessionError::Illegal(_))));
        assert!(trainer.snapshot().await.history.is_empty());
        assert!(!matches!(rx.try_recv(), Ok(TrainerEvent::MoveMade { .. })));
    }

    #[tokio::test]
    async fn test_mate_ends_without_reply() {
        let session = GameSession::from_fen_seeded("8/6pp/6bk/7p/nn6/8/8/KQr5 w - - 0 1", 1).unwrap();
        let trainer = trainer_with(session);
        trainer.choose_difficulty(Difficulty::Hard).await;
        let mut rx = trainer.subscribe();

        trainer
            .attempt_move(&MoveRequest::parse("b1", "c1", None).unwrap())
            .await
            .unwrap();
        let status = next_event(&mut rx, |e| matches!(e, TrainerEvent::Status { .. })).await;
        assert_eq!(
            status,
            TrainerEvent::Status {
                over: true,
                text: "Checkmate, White wins".to_string()
            }
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        let snapshot = trainer.snapshot().await;
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.status, GameStatus::Checkmate { winner: Side::White });
    }

    #[tokio::test]
    async fn test_reset_during_opponent_delay() {
        let config = AdvisorConfig {
            opponent_delay: Duration::from_millis(100),
            ..fast_config()
        };
        let trainer = Trainer::new(GameSession::with_seed(8), Arc::new(DisabledOracle), &config);
        trainer.choose_difficulty(Difficulty::Normal).await;
        trainer
            .attempt_move(&MoveRequest::parse("d2", "d4", None).unwrap())
            .await
            .unwrap();
        trainer.reset().await;

        tokio::time::sleep(Duration::from_millis(250)).await;
        let snapshot = trainer.snapshot().await;
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.difficulty, None);
    }

    #[tokio::test]
    async fn test_requested_suggestion_only_on_human_turn() {
        let trainer = trainer_with(GameSession::with_seed(6));
        assert!(!trainer.request_suggestion().await);

        trainer.choose_difficulty(Difficulty::Easy).await;
        let mut rx = trainer.subscribe();
        assert!(trainer.request_suggestion().await);
        next_event(&mut rx, |e| {
            matches!(e, TrainerEvent::Suggestion { suggestion: Some(_) })
        })
        .await;
        assert!(trainer.snapshot().await.suggestion.is_some());
    }

    #[tokio::test]
    async fn test_ask_without_oracle_uses_local_facts() {
        let trainer = trainer_with(GameSession::with_seed(1));
        let answer = trainer.ask("What is going on?").await;
        assert!(answer.contains("White to move"));
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(TrainerEvent::Suggestion { suggestion: None }).unwrap();
        assert_eq!(json["type"], "suggestion");
        assert!(json["suggestion"].is_null());
        let json = serde_json::to_value(TrainerEvent::Status {
            over: false,
            text: "White to move".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["text"], "White to move");
    }
}

//! Answers to free-form questions about the current position.
//!
//! The oracle gets the derived facts and must echo the check / mate /
//! stalemate flags back. A reply that is too short or contradicts the board
//! is replaced with the locally generated explanation.

use std::sync::LazyLock;
use std::time::Duration;

use chess_core::shakmaty::{Role, Square};
use chess_core::{GamePosition, GameSession, PieceKind, Side};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::AdviceOracle;
use crate::parse::extract_object;

/// Minimum sentence count for an oracle explanation.
pub const MIN_SENTENCES: usize = 4;
pub const MAX_SENTENCES: usize = 6;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?](?:\s|$)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedPiece {
    pub piece: &'static str,
    pub square: String,
}

impl PlacedPiece {
    fn new(role: Role, square: Square) -> Self {
        Self {
            piece: PieceKind::from(role).name(),
            square: square.to_string(),
        }
    }
}

/// Facts derived from the board, shared with the oracle as ground truth.
#[derive(Debug, Clone, Serialize)]
pub struct PositionFacts {
    pub fen: String,
    pub side_to_move: Side,
    pub last_move: Option<String>,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_draw: bool,
    pub white_king: Option<String>,
    pub black_king: Option<String>,
    pub attackers_on_white_king: Vec<PlacedPiece>,
    pub attackers_on_black_king: Vec<PlacedPiece>,
    pub legal_count: usize,
    pub winner_if_mate: Option<Side>,
    pub white_pieces: Vec<PlacedPiece>,
    pub black_pieces: Vec<PlacedPiece>,
    pub legal_moves_san: Vec<String>,
}

impl PositionFacts {
    pub fn from_position(position: &GamePosition, last_move: Option<&str>) -> Self {
        let side = position.turn();
        let is_checkmate = position.is_checkmate();
        let legal = position.legal_moves();

        let king = |s: Side| position.king_square(s);
        let attackers = |s: Side| -> Vec<PlacedPiece> {
            king(s)
                .map(|sq| {
                    position
                        .attackers_of(sq, s.opposite())
                        .into_iter()
                        .map(|(role, from)| PlacedPiece::new(role, from))
                        .collect()
                })
                .unwrap_or_default()
        };
        let pieces = |s: Side| -> Vec<PlacedPiece> {
            position
                .pieces(s)
                .into_iter()
                .map(|(role, sq)| PlacedPiece::new(role, sq))
                .collect()
        };

        Self {
            fen: position.fen(),
            side_to_move: side,
            last_move: last_move.map(str::to_string),
            is_check: position.is_check(),
            is_checkmate,
            is_stalemate: position.is_stalemate(),
            is_draw: position.is_draw(),
            white_king: king(Side::White).map(|sq| sq.to_string()),
            black_king: king(Side::Black).map(|sq| sq.to_string()),
            attackers_on_white_king: attackers(Side::White),
            attackers_on_black_king: attackers(Side::Black),
            legal_count: legal.len(),
            winner_if_mate: is_checkmate.then(|| side.opposite()),
            white_pieces: pieces(Side::White),
            black_pieces: pieces(Side::Black),
            legal_moves_san: legal.into_iter().map(|m| m.san).collect(),
        }
    }

    /// Same as `from_position`, but draws include repetition tracked by the
    /// session.
    pub fn from_session(session: &GameSession) -> Self {
        let last = session.history().last().map(|r| r.san.as_str());
        let mut facts = Self::from_position(session.position(), last);
        facts.is_draw = facts.is_draw
            || matches!(session.status(), chess_core::GameStatus::Draw { .. });
        facts
    }

    fn king_of_side_to_move(&self) -> Option<&str> {
        match self.side_to_move {
            Side::White => self.white_king.as_deref(),
            Side::Black => self.black_king.as_deref(),
        }
    }

    fn attackers_on_side_to_move(&self) -> &[PlacedPiece] {
        match self.side_to_move {
            Side::White => &self.attackers_on_white_king,
            Side::Black => &self.attackers_on_black_king,
        }
    }
}

/// Plain factual summary used as the prompt's anchor and as the fallback.
pub fn local_explanation(facts: &PositionFacts) -> String {
    let side = facts.side_to_move.label();
    let king = facts.king_of_side_to_move().unwrap_or("-");
    let attackers = describe_attackers(facts.attackers_on_side_to_move());

    if facts.is_checkmate {
        let winner = facts.winner_if_mate.map_or("The other side", |w| w.label());
        return [
            format!("Checkmate: it is {side} to move and the {side} king on {king} is attacked."),
            "There are no legal moves, so the game is over.".to_string(),
            format!("Attacking piece(s): {attackers}."),
            format!("{winner} wins."),
        ]
        .join(" ");
    }
    if facts.is_stalemate {
        return format!(
            "Stalemate: it is {side} to move and {side} has no legal moves, but the king is not in check. The game is drawn."
        );
    }
    if facts.is_check {
        return [
            format!("{side} is in check. The king is on {king}."),
            format!("Attacking piece(s): {attackers}."),
            format!("Legal moves available: {}.", facts.legal_count),
        ]
        .join(" ");
    }
    if facts.is_draw {
        return format!(
            "The game is drawn (fifty-move rule, repetition or insufficient material). {side} to move. Legal moves available: {}.",
            facts.legal_count
        );
    }
    format!(
        "The game is in progress. It is {side} to move. Legal moves available: {}.",
        facts.legal_count
    )
}

fn describe_attackers(attackers: &[PlacedPiece]) -> String {
    if attackers.is_empty() {
        return "at least one piece".to_string();
    }
    attackers
        .iter()
        .map(|a| format!("{} ({})", a.piece, a.square))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn commentary_prompt(facts: &PositionFacts, question: &str) -> String {
    let state = serde_json::to_string(facts).unwrap_or_default();
    format!(
        "You are a chess assistant. Below is the BOARD STATE derived from a rules engine and a summary of FACTS.\n\
         Answer using only these; do not contradict them or invent anything.\n\
         Write {MIN_SENTENCES} to {MAX_SENTENCES} sentences in English.\n\n\
         REPLY FORMAT (JSON only):\n\
         {{\"short\": \"<one sentence summary>\", \"long\": \"<{MIN_SENTENCES}-{MAX_SENTENCES} sentence explanation>\", \
         \"mate\": true/false, \"check\": true/false, \"stalemate\": true/false, \"turn\": \"White|Black\"}}\n\n\
         STATE:\n```json\n{state}\n```\n\n\
         FACTS (authoritative):\n```\n{facts}\n```\n\n\
         QUESTION:\n{question}\n",
        facts = local_explanation(facts),
    )
}

/// The oracle's long answer if it is long enough and consistent with the
/// board, otherwise the local explanation.
pub async fn explain(
    oracle: &dyn AdviceOracle,
    timeout: Duration,
    facts: &PositionFacts,
    question: &str,
) -> String {
    let prompt = commentary_prompt(facts, question);
    let raw = match tokio::time::timeout(timeout, oracle.ask(&prompt)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            warn!(error = %e, "Commentary oracle failed");
            return local_explanation(facts);
        }
        Err(_) => {
            warn!(?timeout, "Commentary oracle timed out");
            return local_explanation(facts);
        }
    };

    match validate_answer(&raw, facts) {
        Some(long) => long,
        None => {
            debug!(raw = %raw, "Rejected commentary answer");
            local_explanation(facts)
        }
    }
}

fn validate_answer(raw: &str, facts: &PositionFacts) -> Option<String> {
    let answer = extract_object(raw)?;
    let long = answer.get("long").and_then(Value::as_str)?.trim();
    if sentence_count(long) < MIN_SENTENCES {
        return None;
    }
    let flag = |key: &str| answer.get(key).and_then(Value::as_bool);
    if flag("mate") != Some(facts.is_checkmate)
        || flag("stalemate") != Some(facts.is_stalemate)
        || flag("check") != Some(facts.is_check)
    {
        return None;
    }
    Some(long.to_string())
}

fn sentence_count(text: &str) -> usize {
    SENTENCE_END
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DisabledOracle;
    use crate::error::AdviceError;
    use async_trait::async_trait;

    const FOOLS_MATE: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";

    struct Reply(String);

    #[async_trait]
    impl AdviceOracle for Reply {
        async fn ask(&self, _prompt: &str) -> Result<String, AdviceError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "reply"
        }
    }

    fn mate_facts() -> PositionFacts {
        PositionFacts::from_position(&GamePosition::from_fen(FOOLS_MATE).unwrap(), Some("Qh4#"))
    }

    #[test]
    fn test_facts_for_checkmate() {
        let facts = mate_facts();
        assert!(facts.is_checkmate);
        assert!(facts.is_check);
        assert_eq!(facts.side_to_move, Side::White);
        assert_eq!(facts.winner_if_mate, Some(Side::Black));
        assert_eq!(facts.white_king.as_deref(), Some("e1"));
        assert_eq!(
            facts.attackers_on_white_king,
            vec![PlacedPiece {
                piece: "Queen",
                square: "h4".to_string()
            }]
        );
        assert_eq!(facts.legal_count, 0);
        assert_eq!(facts.white_pieces.len(), 16);
    }

    #[test]
    fn test_local_explanation_mate() {
        let text = local_explanation(&mate_facts());
        assert!(text.starts_with("Checkmate: it is White to move"));
        assert!(text.contains("Queen (h4)"));
        assert!(text.ends_with("Black wins."));
    }

    #[test]
    fn test_local_explanation_in_progress() {
        let facts = PositionFacts::from_position(&GamePosition::starting(), None);
        assert_eq!(
            local_explanation(&facts),
            "The game is in progress. It is White to move. Legal moves available: 20."
        );
    }

    #[test]
    fn test_sentence_count() {
        assert_eq!(sentence_count("One. Two! Three? Four."), 4);
        assert_eq!(sentence_count("Version 1.5 is out."), 1);
        assert_eq!(sentence_count(""), 0);
    }

    #[tokio::test]
    async fn test_consistent_answer_is_used() {
        let long = "White is checkmated. The queen on h4 attacks the king. No move helps. Black wins.";
        let oracle = Reply(format!(
            r#"{{"short": "Mate.", "long": "{long}", "mate": true, "check": true, "stalemate": false, "turn": "White"}}"#
        ));
        let answer = explain(&oracle, Duration::from_secs(1), &mate_facts(), "Is it mate?").await;
        assert_eq!(answer, long);
    }

    #[tokio::test]
    async fn test_contradiction_falls_back() {
        let oracle = Reply(
            r#"{"long": "Play goes on. One. Two. Three.", "mate": false, "check": true, "stalemate": false}"#
                .to_string(),
        );
        let facts = mate_facts();
        let answer = explain(&oracle, Duration::from_secs(1), &facts, "Is it mate?").await;
        assert_eq!(answer, local_explanation(&facts));
    }

    #[tokio::test]
    async fn test_short_answer_falls_back() {
        let oracle = Reply(r#"{"long": "Mate.", "mate": true, "check": true, "stalemate": false}"#.to_string());
        let facts = mate_facts();
        let answer = explain(&oracle, Duration::from_secs(1), &facts, "?").await;
        assert_eq!(answer, local_explanation(&facts));
    }

    #[tokio::test]
    async fn test_unavailable_oracle_falls_back() {
        let facts = PositionFacts::from_position(&GamePosition::starting(), None);
        let answer = explain(&DisabledOracle, Duration::from_secs(1), &facts, "Plan?").await;
        assert_eq!(answer, local_explanation(&facts));
    }
}

//! Suggestion pipeline: ask the advice oracle for a move, validate it against
//! the legal set, retry once, then fall back to the greedy heuristic.

use std::sync::Arc;
use std::time::Duration;

use chess_core::selector::{heuristic_score, pick_heuristic};
use chess_core::shakmaty::Role;
use chess_core::{GamePosition, LegalMove, OracleError, PieceKind, Suggestion, SuggestionSource};
use rand::Rng;
use tracing::{debug, warn};

use crate::client::AdviceOracle;
use crate::error::AdviceError;
use crate::parse::{parse_advice, ParsedAdvice};
use crate::prompt::suggestion_prompt;

/// First try plus one retry with the same prompt.
pub const MAX_ATTEMPTS: usize = 2;

#[derive(Clone)]
pub struct SuggestionPipeline {
    oracle: Arc<dyn AdviceOracle>,
    timeout: Duration,
}

impl SuggestionPipeline {
    pub fn new(oracle: Arc<dyn AdviceOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// A legal suggestion for the side to move, or `None` when there are no
    /// legal moves. Oracle failures never surface.
    pub async fn suggest<R: Rng + Send + ?Sized>(
        &self,
        position: &GamePosition,
        rng: &mut R,
    ) -> Option<Suggestion> {
        let legal = position.legal_moves();
        if legal.is_empty() {
            return None;
        }
        let prompt = suggestion_prompt(position, &legal);

        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(&prompt, legal.len()).await {
                Ok(advice) => {
                    let mv = &legal[advice.index];
                    // Replay before trusting it
                    if let Err(e) = position.apply(&mv.request()) {
                        warn!(error = %e, "Suggested move failed replay");
                        break;
                    }
                    debug!(attempt, san = %mv.san, "Oracle suggestion accepted");
                    let rationale = if advice.rationale.is_empty() {
                        describe_move(position, mv)
                    } else {
                        advice.rationale
                    };
                    return Some(to_suggestion(mv, rationale, SuggestionSource::Oracle));
                }
                Err(e) => {
                    warn!(attempt, oracle = self.oracle.name(), error = %e, "Advice attempt failed");
                }
            }
        }

        let mv = pick_heuristic(position, &legal, rng)?;
        debug!(san = %mv.san, "Falling back to heuristic suggestion");
        let rationale = describe_move(position, &mv);
        Some(to_suggestion(&mv, rationale, SuggestionSource::Heuristic))
    }

    async fn attempt(&self, prompt: &str, legal_count: usize) -> Result<ParsedAdvice, AdviceError> {
        let raw = tokio::time::timeout(self.timeout, self.oracle.ask(prompt))
            .await
            .map_err(|_| AdviceError::Timeout(self.timeout))??;
        debug!(raw = %raw, "Advice oracle replied");

        let advice = parse_advice(&raw)?;
        if advice.index >= legal_count {
            return Err(AdviceError::MalformedResponse(format!(
                "index {} out of range for {} moves",
                advice.index, legal_count
            )));
        }
        Ok(advice)
    }
}

fn to_suggestion(mv: &LegalMove, rationale: String, source: SuggestionSource) -> Suggestion {
    Suggestion {
        move_index: mv.index,
        san: mv.san.clone(),
        from: mv.from.to_string(),
        to: mv.to.to_string(),
        piece: PieceKind::from(mv.piece),
        rationale,
        source,
    }
}

/// Short plain-English reason built from the heuristic's own terms.
pub fn describe_move(position: &GamePosition, mv: &LegalMove) -> String {
    let piece = PieceKind::from(mv.piece).name();
    let mut parts = Vec::new();

    if mv.gives_mate() {
        parts.push("delivers checkmate".to_string());
    } else if mv.gives_check() {
        parts.push("gives check".to_string());
    }
    if let Some(captured) = mv.captured {
        parts.push(format!(
            "wins the {} on {}",
            PieceKind::from(captured).name().to_lowercase(),
            mv.to
        ));
    }
    if let Some(promotion) = mv.promotion {
        parts.push(format!("promotes to a {}", PieceKind::from(promotion).name().to_lowercase()));
    }
    if parts.is_empty() {
        if matches!(mv.piece, Role::Knight | Role::Bishop) {
            parts.push(format!("develops the {}", piece.to_lowercase()));
        }
        if heuristic_score(position, mv) >= 8.0 && is_central(mv) {
            parts.push("fights for the center".to_string());
        }
    }

    if parts.is_empty() {
        format!("{} keeps the position solid.", mv.san)
    } else {
        format!("{} {}.", mv.san, parts.join(" and "))
    }
}

fn is_central(mv: &LegalMove) -> bool {
    let file = mv.to.file().char();
    let rank = mv.to.rank().char();
    ('c'..='f').contains(&file) && ('3'..='6').contains(&rank)
}

/// Stateless hint for an arbitrary FEN. When `candidates` (SAN) is given, the
/// pick is restricted to the ones that are legal; an empty intersection falls
/// back to the full legal set.
pub fn hint<R: Rng + ?Sized>(
    fen: &str,
    candidates: Option<&[String]>,
    rng: &mut R,
) -> Result<Option<LegalMove>, OracleError> {
    let position = GamePosition::from_fen(fen)?;
    let legal = position.legal_moves();
    let filtered: Vec<LegalMove> = match candidates {
        Some(sans) => legal
            .iter()
            .filter(|mv| sans.iter().any(|san| san == &mv.san))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    let pool = if filtered.is_empty() { &legal } else { &filtered };
    Ok(pick_heuristic(&position, pool, rng))
}

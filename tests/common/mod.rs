#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use trainer::{AdviceError, AdviceOracle};

/// Position where White (king b1) has exactly five legal moves.
pub const FIVE_MOVES_FEN: &str = "6k1/7p/7P/8/8/8/8/1K6 w - - 0 1";

/// White is checkmated (fool's mate), so no legal moves.
pub const FOOLS_MATE_FEN: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";

/// White's only legal move Qxc1 is checkmate.
pub const ONLY_MOVE_MATES_FEN: &str = "8/6pp/6bk/7p/nn6/8/8/KQr5 w - - 0 1";

/// One scripted oracle answer.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Unavailable,
    /// Reply after a pause.
    Slow(Duration, String),
}

pub fn reply(text: &str) -> Step {
    Step::Reply(text.to_string())
}

/// Advice oracle that plays back a fixed script, then falls back to
/// `default` (unavailable when unset).
pub struct ScriptedOracle {
    steps: Mutex<VecDeque<Step>>,
    default: Option<Step>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            default: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn repeating(step: Step) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            default: Some(step),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdviceOracle for ScriptedOracle {
    async fn ask(&self, _prompt: &str) -> Result<String, AdviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.default.clone());

        match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Slow(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(Step::Unavailable) | None => {
                Err(AdviceError::OracleUnavailable("scripted outage".to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chess_core::{GameSession, OracleError};
use tokio::sync::RwLock;
use trainer::{AdviceOracle, AdvisorConfig, ChatCompletionsOracle, Trainer};

/// Oldest games are evicted past this many.
pub const MAX_GAMES: usize = 256;

struct GameEntry {
    trainer: Arc<Trainer>,
    created_at: DateTime<Utc>,
}

/// In-memory games keyed by id. Nothing is persisted.
pub struct SessionStore {
    games: RwLock<HashMap<u64, GameEntry>>,
    next_id: AtomicU64,
    oracle: Arc<dyn AdviceOracle>,
    advisor: AdvisorConfig,
}

impl SessionStore {
    pub fn new(oracle: Arc<dyn AdviceOracle>, advisor: AdvisorConfig) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            oracle,
            advisor,
        }
    }

    /// New game from the standard start or a custom FEN.
    pub async fn create(&self, fen: Option<&str>) -> Result<(u64, Arc<Trainer>), OracleError> {
        let session = match fen {
            Some(fen) => GameSession::from_fen(fen)?,
            None => GameSession::new(),
        };
        let trainer = Trainer::new(session, self.oracle.clone(), &self.advisor);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut games = self.games.write().await;
        if games.len() >= MAX_GAMES {
            let oldest = games
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                games.remove(&oldest);
                tracing::info!(game_id = oldest, "Evicted oldest game");
            }
        }
        games.insert(
            id,
            GameEntry {
                trainer: trainer.clone(),
                created_at: Utc::now(),
            },
        );
        tracing::info!(game_id = id, custom_fen = fen.is_some(), "Game created");
        Ok((id, trainer))
    }

    pub async fn get(&self, id: u64) -> Option<Arc<Trainer>> {
        self.games.read().await.get(&id).map(|e| e.trainer.clone())
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }
}

/// Direct chat-completions access for the raw ask-ai proxy.
#[derive(Clone)]
pub struct ChatProxy(pub Option<Arc<ChatCompletionsOracle>>);

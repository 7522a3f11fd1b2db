use axum::Json;
use serde::{Deserialize, Serialize};
use trainer::pipeline;

#[derive(Deserialize)]
pub struct HintBody {
    pub fen: String,
    /// SAN moves the client considers; intersected with the legal set.
    #[serde(default, alias = "legalMoves")]
    pub legal_moves: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct HintResponse {
    pub hint: String,
    pub from_fen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/hint
/// Always 200; a bad FEN yields an empty hint with `error` set.
pub async fn hint(Json(body): Json<HintBody>) -> Json<HintResponse> {
    let result = {
        let mut rng = rand::rng();
        pipeline::hint(&body.fen, body.legal_moves.as_deref(), &mut rng)
    };

    let (hint, error) = match result {
        Ok(Some(mv)) => (mv.san, None),
        Ok(None) => (String::new(), None),
        Err(e) => {
            tracing::debug!(fen = %body.fen, error = %e, "Hint for invalid FEN");
            (String::new(), Some(e.to_string()))
        }
    };
    Json(HintResponse {
        hint,
        from_fen: body.fen,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hint_for_start() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string();
        let Json(reply) = hint(Json(HintBody {
            fen: fen.clone(),
            legal_moves: Some(vec!["Nf3".to_string()]),
        }))
        .await;
        assert_eq!(reply.hint, "Nf3");
        assert_eq!(reply.from_fen, fen);
        assert!(reply.error.is_none());
    }

    #[tokio::test]
    async fn test_hint_for_bad_fen() {
        let Json(reply) = hint(Json(HintBody {
            fen: "garbage".to_string(),
            legal_moves: None,
        }))
        .await;
        assert_eq!(reply.hint, "");
        assert!(reply.error.is_some());
    }
}

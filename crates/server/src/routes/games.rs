use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use chess_core::shakmaty::Role;
use chess_core::{Difficulty, MoveOutcome, MoveRequest, PieceKind, SessionError};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use trainer::Trainer;

use crate::error::AppError;
use crate::state::SessionStore;

async fn lookup(store: &SessionStore, id: u64) -> Result<Arc<Trainer>, AppError> {
    store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Game {id} not found")))
}

#[derive(Deserialize, Default)]
pub struct CreateGameBody {
    #[serde(default)]
    pub fen: Option<String>,
}

/// POST /api/games
pub async fn create_game(
    Extension(store): Extension<Arc<SessionStore>>,
    Json(body): Json<CreateGameBody>,
) -> Result<Json<JsonValue>, AppError> {
    let (id, trainer) = store.create(body.fen.as_deref()).await?;
    Ok(Json(json!({
        "id": id,
        "snapshot": trainer.snapshot().await,
    })))
}

/// GET /api/games/{id}
pub async fn get_game(
    Extension(store): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    let trainer = lookup(&store, id).await?;
    Ok(Json(json!(trainer.snapshot().await)))
}

#[derive(Deserialize)]
pub struct DifficultyBody {
    pub difficulty: String,
}

/// POST /api/games/{id}/difficulty
/// Ignored (chosen=false) once the game has started.
pub async fn set_difficulty(
    Extension(store): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
    Json(body): Json<DifficultyBody>,
) -> Result<Json<JsonValue>, AppError> {
    let difficulty: Difficulty = body.difficulty.parse().map_err(AppError::BadRequest)?;
    let trainer = lookup(&store, id).await?;
    let chosen = trainer.choose_difficulty(difficulty).await;
    Ok(Json(json!({
        "chosen": chosen,
        "snapshot": trainer.snapshot().await,
    })))
}

#[derive(Deserialize)]
pub struct MoveBody {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
}

/// POST /api/games/{id}/moves
/// An illegal move is a normal answer (accepted=false), not an error.
pub async fn make_move(
    Extension(store): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
    Json(body): Json<MoveBody>,
) -> Result<Json<JsonValue>, AppError> {
    let request = MoveRequest::parse(&body.from, &body.to, body.promotion.as_deref())?;
    let trainer = lookup(&store, id).await?;

    let (accepted, promotion_required) = match trainer.attempt_move(&request).await {
        Ok(MoveOutcome::Applied { .. }) => (true, false),
        Ok(MoveOutcome::PromotionRequired(_)) => (false, true),
        Err(SessionError::Illegal(e)) => {
            tracing::debug!(game_id = id, error = %e, "Move rejected");
            (false, false)
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(json!({
        "accepted": accepted,
        "promotion_required": promotion_required,
        "snapshot": trainer.snapshot().await,
    })))
}

#[derive(Deserialize)]
pub struct PromotionBody {
    pub piece: String,
}

/// POST /api/games/{id}/promotion
pub async fn choose_promotion(
    Extension(store): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
    Json(body): Json<PromotionBody>,
) -> Result<Json<JsonValue>, AppError> {
    let role = Role::from(PieceKind::from_letter(&body.piece)?);
    if matches!(role, Role::Pawn | Role::King) {
        return Err(AppError::BadRequest(format!("Cannot promote to {}", body.piece)));
    }
    let trainer = lookup(&store, id).await?;
    trainer.resolve_promotion(role).await?;
    Ok(Json(json!({
        "accepted": true,
        "snapshot": trainer.snapshot().await,
    })))
}

/// DELETE /api/games/{id}/promotion
pub async fn cancel_promotion(
    Extension(store): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    let trainer = lookup(&store, id).await?;
    trainer.cancel_promotion().await?;
    Ok(Json(json!(trainer.snapshot().await)))
}

/// POST /api/games/{id}/reset
pub async fn reset_game(
    Extension(store): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    let trainer = lookup(&store, id).await?;
    trainer.reset().await;
    Ok(Json(json!(trainer.snapshot().await)))
}

/// POST /api/games/{id}/suggestion
/// Asks the coach again; the result arrives on the event stream.
pub async fn request_suggestion(
    Extension(store): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    let trainer = lookup(&store, id).await?;
    if !trainer.request_suggestion().await {
        return Err(AppError::Conflict("No suggestion outside the human's turn".to_string()));
    }
    Ok(Json(json!({ "requested": true })))
}

#[derive(Deserialize)]
pub struct AskBody {
    pub question: String,
}

/// POST /api/games/{id}/ask
pub async fn ask_about_position(
    Extension(store): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
    Json(body): Json<AskBody>,
) -> Result<Json<JsonValue>, AppError> {
    let question = body.question.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest("Question is empty".to_string()));
    }
    let trainer = lookup(&store, id).await?;
    let answer = trainer.ask(question).await;
    Ok(Json(json!({ "answer": answer })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainer::{AdvisorConfig, DisabledOracle};

    async fn new_game() -> (Arc<SessionStore>, u64) {
        let store = Arc::new(SessionStore::new(Arc::new(DisabledOracle), AdvisorConfig::default()));
        let Json(created) = create_game(Extension(store.clone()), Json(CreateGameBody::default()))
            .await
            .unwrap();
        let id = created["id"].as_u64().unwrap();
        (store, id)
    }

    fn move_body(from: &str, to: &str) -> Json<MoveBody> {
        Json(MoveBody {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        })
    }

    #[tokio::test]
    async fn test_move_before_difficulty_conflicts() {
        let (store, id) = new_game().await;
        let result = make_move(Extension(store), Path(id), move_body("e2", "e4")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_illegal_move_is_not_accepted() {
        let (store, id) = new_game().await;
        set_difficulty(
            Extension(store.clone()),
            Path(id),
            Json(DifficultyBody {
                difficulty: "easy".to_string(),
            }),
        )
        .await
        .unwrap();

        let Json(reply) = make_move(Extension(store.clone()), Path(id), move_body("e2", "e5"))
            .await
            .unwrap();
        assert_eq!(reply["accepted"], false);
        assert_eq!(reply["snapshot"]["history"].as_array().unwrap().len(), 0);

        let Json(reply) = make_move(Extension(store), Path(id), move_body("e2", "e4"))
            .await
            .unwrap();
        assert_eq!(reply["accepted"], true);
        assert_eq!(reply["snapshot"]["history"][0]["san"], "e4");
    }

    #[tokio::test]
    async fn test_bad_inputs() {
        let (store, id) = new_game().await;
        let result = set_difficulty(
            Extension(store.clone()),
            Path(id),
            Json(DifficultyBody {
                difficulty: "impossible".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = make_move(Extension(store.clone()), Path(id), move_body("z9", "e4")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = get_game(Extension(store.clone()), Path(id + 100)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = cancel_promotion(Extension(store), Path(id)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_suggestion_request() {
        let (store, id) = new_game().await;
        let result = request_suggestion(Extension(store.clone()), Path(id)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        set_difficulty(
            Extension(store.clone()),
            Path(id),
            Json(DifficultyBody {
                difficulty: "normal".to_string(),
            }),
        )
        .await
        .unwrap();
        let Json(reply) = request_suggestion(Extension(store), Path(id)).await.unwrap();
        assert_eq!(reply["requested"], true);
    }
}

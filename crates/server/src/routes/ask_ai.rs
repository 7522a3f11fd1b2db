use axum::{http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use trainer::AdviceOracle;

use crate::state::ChatProxy;

#[derive(Deserialize)]
pub struct AskAiBody {
    pub prompt: String,
}

/// POST /api/ask-ai
/// Raw pass-through to the chat model: `{result}` on success, `{error}` with
/// a 5xx otherwise.
pub async fn ask_ai(
    Extension(ChatProxy(chat)): Extension<ChatProxy>,
    Json(body): Json<AskAiBody>,
) -> (StatusCode, Json<JsonValue>) {
    let Some(chat) = chat else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Chat model is not configured" })),
        );
    };

    tracing::debug!(prompt_len = body.prompt.len(), "ask-ai prompt");
    match chat.ask(&body.prompt).await {
        Ok(result) => (StatusCode::OK, Json(json!({ "result": result }))),
        Err(e) => {
            tracing::warn!(error = %e, "ask-ai failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_proxy() {
        let (status, Json(body)) = ask_ai(
            Extension(ChatProxy(None)),
            Json(AskAiBody {
                prompt: "hi".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }
}

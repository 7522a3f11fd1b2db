use std::sync::Arc;

use axum::{Extension, Json};
use serde_json::{json, Value as JsonValue};

use crate::state::SessionStore;

/// GET /health
pub async fn health_check(Extension(store): Extension<Arc<SessionStore>>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "games": store.len().await,
    }))
}

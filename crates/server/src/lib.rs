pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::state::{ChatProxy, SessionStore};

/// Full router with shared state attached.
pub fn app(store: Arc<SessionStore>, chat: ChatProxy) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Games
        .route("/api/games", post(routes::games::create_game))
        .route("/api/games/{id}", get(routes::games::get_game))
        .route("/api/games/{id}/difficulty", post(routes::games::set_difficulty))
        .route("/api/games/{id}/moves", post(routes::games::make_move))
        .route(
            "/api/games/{id}/promotion",
            post(routes::games::choose_promotion).delete(routes::games::cancel_promotion),
        )
        .route("/api/games/{id}/reset", post(routes::games::reset_game))
        .route("/api/games/{id}/suggestion", post(routes::games::request_suggestion))
        .route("/api/games/{id}/ask", post(routes::games::ask_about_position))
        .route("/api/games/{id}/events", get(routes::events::game_events))
        // Stateless helpers
        .route("/api/ask-ai", post(routes::ask_ai::ask_ai))
        .route("/api/hint", post(routes::hint::hint))
        .layer(Extension(store))
        .layer(Extension(chat))
        .layer(CompressionLayer::new())
        .layer(cors)
}

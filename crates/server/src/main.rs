use std::sync::Arc;

use anyhow::Context;
use server::config;
use server::state::{ChatProxy, SessionStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();

    let oracle = config
        .advisor
        .build_oracle()
        .context("Failed to build advice oracle client")?;
    let chat = config
        .advisor
        .chat_oracle()
        .context("Failed to build chat client")?
        .map(Arc::new);
    if chat.is_none() {
        tracing::info!("GROQ_API_KEY not set - /api/ask-ai disabled");
    }

    let store = Arc::new(SessionStore::new(oracle, config.advisor.clone()));
    let app = server::app(store, ChatProxy(chat));

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

//! Read-only HTTP endpoints.
//!
//! The event channel carries all mutations; these routes only serve JSON
//! views of process-wide state for the web UI and monitoring.
//!
//! ```text
//! GET /health            - Server health status
//! GET /api/cardColors    - Cosmetic card palette
//! GET /api/lobbies       - Ordered lobby summaries
//! GET /api/mapPool       - Current FPS catalog pool
//! GET /api/coinFlip      - Process-wide coin flip default
//! GET /api/runtime-env   - Socket URL for the web UI
//! ```

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use map_veto::{LobbyRegistry, catalog::DEFAULT_FPS_GAME};
use serde_json::json;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LobbyRegistry>,
    pub public_url: String,
}

/// Create the query router. CORS and the Socket.IO layer are applied by
/// the caller.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/cardColors", get(card_colors))
        .route("/api/lobbies", get(lobbies))
        .route("/api/mapPool", get(map_pool))
        .route("/api/coinFlip", get(coin_flip))
        .route("/api/runtime-env", get(runtime_env))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "lobbies": state.registry.lobby_count().await,
    }))
}

async fn card_colors(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!(state.registry.card_colors().await))
}

/// Lobby summaries in creation order; `teamNames` preserves join order.
async fn lobbies(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!(state.registry.list().await))
}

async fn map_pool(State(state): State<AppState>) -> impl IntoResponse {
    let pool = state
        .registry
        .fps_map_pool(DEFAULT_FPS_GAME)
        .await
        .unwrap_or_default();
    Json(json!(pool))
}

async fn coin_flip(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "coinFlip": state.registry.coin_flip().await }))
}

async fn runtime_env(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "SOCKET_URL": state.public_url }))
}

//! Integration tests for the HTTP query endpoints.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use map_veto::{EventSink, FpsSettings, LobbyRegistry, Target};
use mv_server::api::{AppState, create_router};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

struct NullSink;

impl EventSink for NullSink {
    fn deliver(&self, _target: &Target, _name: &str, _payload: Value) {}
}

fn test_registry() -> Arc<LobbyRegistry> {
    Arc::new(LobbyRegistry::new(Arc::new(NullSink)))
}

fn test_app(registry: Arc<LobbyRegistry>) -> axum::Router {
    create_router(AppState {
        registry,
        public_url: "http://veto.test".to_string(),
    })
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

#[tokio::test]
async fn health_reports_lobby_count() {
    let (status, body) = get_json(test_app(test_registry()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["lobbies"], 0);
}

#[tokio::test]
async fn card_colors_serves_the_default_palette() {
    let (status, body) = get_json(test_app(test_registry()), "/api/cardColors").await;
    assert_eq!(status, StatusCode::OK);
    let colors = body.as_array().unwrap();
    assert_eq!(colors.len(), 2);
    assert!(colors.iter().all(|c| c.as_str().unwrap().starts_with('#')));
}

#[tokio::test]
async fn map_pool_serves_the_catalog_pool() {
    let (status, body) = get_json(test_app(test_registry()), "/api/mapPool").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn coin_flip_serves_the_process_default() {
    let (status, body) = get_json(test_app(test_registry()), "/api/coinFlip").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["coinFlip"], true);
}

#[tokio::test]
async fn runtime_env_serves_the_socket_url() {
    let (status, body) = get_json(test_app(test_registry()), "/api/runtime-env").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["SOCKET_URL"], "http://veto.test");
}

#[tokio::test]
async fn lobbies_lists_summaries_in_creation_order() {
    let registry = test_registry();
    for id in ["first", "second"] {
        registry
            .create_fps(
                id,
                FpsSettings {
                    game: "cs2".to_string(),
                    game_type: "bo3".to_string(),
                    coin_flip: false,
                    knife_decider: true,
                    map_pool_size: None,
                    admin: false,
                },
            )
            .await
            .unwrap();
    }

    let (status, body) = get_json(test_app(registry), "/api/lobbies").await;
    assert_eq!(status, StatusCode::OK);
    let lobbies = body.as_array().unwrap();
    assert_eq!(lobbies.len(), 2);
    assert_eq!(lobbies[0]["id"], "first");
    assert_eq!(lobbies[1]["id"], "second");
    assert_eq!(lobbies[0]["gameFamily"], "fps");
    assert_eq!(lobbies[0]["gameType"], "bo3");
    assert_eq!(lobbies[0]["teamNames"], serde_json::json!([]));
}

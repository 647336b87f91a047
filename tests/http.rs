//! HTTP surface tests

mod common;

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{Harness, MemoryAssets};
use spot_diff_server::app::AppState;
use spot_diff_server::config::{Config, GameRules};
use spot_diff_server::http::build_router;

fn config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "debug".to_string(),
        hit_validator_url: "http://127.0.0.1:9".to_string(),
        highscore_url: None,
        asset_root: PathBuf::from("public"),
        temp_dir: std::env::temp_dir(),
        public_base_url: "http://localhost:3000".to_string(),
        client_origin: "http://localhost:4200".to_string(),
        rules: GameRules::default(),
    }
}

fn app(harness: &Harness) -> axum::Router {
    build_router(AppState::from_parts(
        config(),
        harness.sessions.clone(),
        harness.users.clone(),
    ))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_counts() {
    let harness = Harness::new(MemoryAssets::with_differences(3));
    harness.connect("alice");

    let response = app(&harness)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_sessions"], 0);
    assert_eq!(body["connections"], 1);
}

#[tokio::test]
async fn game_request_returns_a_message() {
    let harness = Harness::new(MemoryAssets::with_differences(3));
    harness.connect("alice");

    let response = app(&harness)
        .oneshot(post_json(
            "/games/request",
            serde_json::json!({ "username": "alice", "mode": "free", "type": "solo", "gameId": 2 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["title"], "onSuccess");
    assert_eq!(body["body"], "1000");

    let response = app(&harness)
        .oneshot(Request::get("/arenas/1000/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body[0]["username"], "alice");
}

#[tokio::test]
async fn invalid_mode_is_reported_in_the_message() {
    let harness = Harness::new(MemoryAssets::with_differences(3));
    harness.connect("alice");

    let response = app(&harness)
        .oneshot(post_json(
            "/games/request",
            serde_json::json!({ "username": "alice", "mode": "poker", "type": "multi", "gameId": 2 }),
        ))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["title"], "onModeInvalid");
}

#[tokio::test]
async fn input_to_unknown_arena_is_not_found() {
    let harness = Harness::new(MemoryAssets::with_differences(3));

    let response = app(&harness)
        .oneshot(post_json(
            "/arenas/77/input",
            serde_json::json!({ "username": "alice", "event": 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("77"));
}

#[tokio::test]
async fn unknown_arena_has_no_remaining_differences() {
    let harness = Harness::new(MemoryAssets::with_differences(3));

    let response = app(&harness)
        .oneshot(Request::get("/arenas/5/differences").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!([]));
}

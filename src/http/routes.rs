//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::app::AppState;
use crate::error::GameError;
use crate::game::{DifferenceId, PlayerInput, SessionId, UserRecord};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::{ArenaResponse, CancelRequest, GameRequest, HitEvent, Message};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let game_routes = Router::new()
        .route("/games/request", post(game_request_handler))
        .route("/games/cancel", post(game_cancel_handler));

    let arena_routes = Router::new()
        .route("/arenas/:id/differences", get(differences_handler))
        .route("/arenas/:id/users", get(users_handler))
        .route("/arenas/:id/input", post(input_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .merge(game_routes)
        .merge(arena_routes)
        .nest_service("/temp", ServeDir::new(&state.config.temp_dir))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    connections: usize,
    waiting_lobbies: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let waiting_lobbies = state.sessions.waiting_lobbies().await;

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
        connections: state.sessions.connection_count(),
        waiting_lobbies,
    })
}

// ============================================================================
// Game requests
// ============================================================================

async fn game_request_handler(
    State(state): State<AppState>,
    Json(req): Json<GameRequest>,
) -> Json<Message> {
    Json(state.sessions.analyse_request(&req).await)
}

async fn game_cancel_handler(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> Json<Message> {
    Json(state.sessions.cancel_request(&req).await)
}

// ============================================================================
// Arena endpoints
// ============================================================================

async fn differences_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Json<Vec<DifferenceId>> {
    Json(state.sessions.remaining_difference_ids(id))
}

async fn users_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Json<Vec<UserRecord>> {
    Json(state.sessions.users_in_session(id))
}

#[derive(Deserialize)]
struct InputRequest {
    username: String,
    event: HitEvent,
}

async fn input_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<InputRequest>,
) -> Result<Json<ArenaResponse>, AppError> {
    let input = PlayerInput::click(id, req.username, req.event);
    let response = state.sessions.route_input(input).await?;
    Ok(Json(response))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::UnknownSession(_) => AppError::NotFound(err.to_string()),
            GameError::UserNotFound(_) => AppError::NotFound(err.to_string()),
            GameError::PlayerNotInSession { .. } | GameError::InvalidMode(_) => {
                AppError::BadRequest(err.to_string())
            }
            GameError::ValidationService(_)
            | GameError::AssetFetch(_)
            | GameError::RefereeInitTimeout(_) => AppError::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

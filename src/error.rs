//! Error types shared by the session core

use crate::game::SessionId;

/// Failures of a call to an external collaborator
#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode payload: {0}")]
    Decode(String),
}

/// Session-core errors
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid game mode: {0}")]
    InvalidMode(String),

    #[error("Hit validation failed: {0}")]
    ValidationService(#[source] CollabError),

    #[error("Failed to fetch game assets: {0}")]
    AssetFetch(#[source] CollabError),

    #[error("Referee for session {0} did not initialize in time")]
    RefereeInitTimeout(SessionId),

    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("Player {username} is not in session {session_id}")]
    PlayerNotInSession {
        session_id: SessionId,
        username: String,
    },
}

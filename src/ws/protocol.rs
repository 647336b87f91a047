//! WebSocket protocol message definitions
//! These are the wire types for client-server communication and for the
//! collaborator HTTP boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{DifferenceId, GameVariant, SessionId};

/// Position of a click on a 2D image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position2D {
    pub x: u32,
    pub y: u32,
}

/// What the player clicked on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HitEvent {
    /// Pixel coordinates on the modified image (PixelHunt)
    Pixel(Position2D),
    /// Index of the clicked scene object (SceneDelta)
    Object(u32),
}

impl HitEvent {
    /// Variant this kind of event belongs to
    pub fn variant(&self) -> GameVariant {
        match self {
            Self::Pixel(_) => GameVariant::PixelHunt,
            Self::Object(_) => GameVariant::SceneDelta,
        }
    }
}

/// RGB color of one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// One pixel of the original image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub position: Position2D,
    pub color: PixelColor,
}

/// Original pixels covering one difference, painted back by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalPixelCluster {
    pub difference_key: DifferenceId,
    pub cluster: Vec<Pixel>,
}

/// Action the client applies to the modified scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Remove an object that was added
    Remove,
    /// Put back an object that was removed
    Add,
    /// Restore the original color
    ChangeColor,
}

/// Scene-object delta revealed on a SceneDelta hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObjectUpdate {
    pub action_to_apply: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_object: Option<serde_json::Value>,
}

/// Reveal payload of a discovered difference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reveal {
    PixelCluster(OriginalPixelCluster),
    SceneObject(SceneObjectUpdate),
}

/// Outcome of a hit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    OnSuccess,
    OnFailedClick,
    OnPenalty,
    OnError,
}

/// Response to a routed input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Reveal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arena_type: Option<GameVariant>,
}

impl ArenaResponse {
    pub fn status(status: ResponseStatus) -> Self {
        Self {
            status,
            response: None,
            arena_type: None,
        }
    }

    pub fn success(reveal: Reveal) -> Self {
        Self {
            status: ResponseStatus::OnSuccess,
            response: Some(reveal),
            arena_type: None,
        }
    }

    pub fn failed_click() -> Self {
        Self::status(ResponseStatus::OnFailedClick)
    }

    pub fn penalty() -> Self {
        Self::status(ResponseStatus::OnPenalty)
    }

    pub fn error() -> Self {
        Self::status(ResponseStatus::OnError)
    }

    pub fn with_arena_type(mut self, variant: GameVariant) -> Self {
        self.arena_type = Some(variant);
        self
    }
}

/// Request sent to the hit-validation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRequest {
    pub event_info: HitEvent,
    #[serde(rename = "assetReferenceURL")]
    pub asset_reference_url: String,
    pub ignored_color: u32,
}

/// Hit-validation service verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitConfirmation {
    pub is_hit: bool,
    pub matched_difference_id: DifferenceId,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Claim a username for this connection
    Login { username: String },

    /// Player finished loading the arena
    Ready { arena_id: SessionId },

    /// Hit attempt
    Hit { arena_id: SessionId, event: HitEvent },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { connection_id: Uuid },

    /// Result of a login attempt
    LoginResult { username: String, accepted: bool },

    /// Countdown before the game starts
    OnCountdown { count: u32 },

    /// Countdown reached zero
    OnGameStarted,

    /// Elapsed game time
    OnTimerUpdate { seconds: u64 },

    /// Player's new score
    OnPointAdded { points: u32 },

    /// Penalty imposed or lifted
    OnPenalty {
        is_on_penalty: bool,
        arena_type: GameVariant,
    },

    /// The session was cancelled before it could start
    OnCancelGame { arena_id: SessionId },

    /// A peer joined the lobby entry and the arena exists
    OnArenaConnect { arena_id: SessionId },

    /// The game finished
    OnGameEnded {
        arena_id: SessionId,
        winner: String,
        elapsed_seconds: u64,
    },

    /// Reply to a hit message
    HitResult {
        arena_id: SessionId,
        response: ArenaResponse,
    },

    /// Error message
    Error { message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    /// Event name as seen on the wire
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::LoginResult { .. } => "loginResult",
            Self::OnCountdown { .. } => "onCountdown",
            Self::OnGameStarted => "onGameStarted",
            Self::OnTimerUpdate { .. } => "onTimerUpdate",
            Self::OnPointAdded { .. } => "onPointAdded",
            Self::OnPenalty { .. } => "onPenalty",
            Self::OnCancelGame { .. } => "onCancelGame",
            Self::OnArenaConnect { .. } => "onArenaConnect",
            Self::OnGameEnded { .. } => "onGameEnded",
            Self::HitResult { .. } => "hitResult",
            Self::Error { .. } => "error",
            Self::Pong { .. } => "pong",
        }
    }
}

/// Solo or multiplayer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Solo,
    Multi,
}

/// Request to play a game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRequest {
    pub username: String,
    /// Variant name, parsed leniently
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: GameType,
    pub game_id: u64,
}

/// Withdraw a pending multiplayer request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub mode: String,
    pub game_id: u64,
}

/// Title of a request-level reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageTitle {
    OnSuccess,
    OnError,
    OnWaiting,
    OnModeInvalid,
}

/// Reply to a game request or cancellation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub title: MessageTitle,
    pub body: String,
}

impl Message {
    pub fn new(title: MessageTitle, body: impl Into<String>) -> Self {
        Self {
            title,
            body: body.into(),
        }
    }
}

//! External collaborators consumed by the session core
//!
//! The core never validates hits, stores assets or persists highscores
//! itself; it talks to these traits. Production implementations live in the
//! submodules, tests plug in fakes.

pub mod assets;
pub mod http;
pub mod users;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::error::CollabError;
use crate::game::{GameKey, GameVariant, UserRecord};
use crate::ws::protocol::{HitConfirmation, HitRequest};

pub use assets::FsAssetStore;
pub use http::{HttpHighscores, HttpHitValidator};
pub use users::ConnectedUsers;

/// Remote service deciding whether a click hits a difference
#[async_trait]
pub trait HitValidator: Send + Sync {
    async fn validate(
        &self,
        variant: GameVariant,
        request: &HitRequest,
    ) -> Result<HitConfirmation, CollabError>;
}

/// URLs of a game's staged temporary assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedAssets {
    PixelHunt {
        original_url: String,
        difference_url: String,
    },
    SceneDelta {
        scene_url: String,
    },
}

impl StagedAssets {
    /// The asset the hit validator compares clicks against
    pub fn reference_url(&self) -> &str {
        match self {
            Self::PixelHunt { difference_url, .. } => difference_url,
            Self::SceneDelta { scene_url } => scene_url,
        }
    }
}

/// Storage for the per-game assets sessions read from
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Where the staged copies of `key` live (whether or not staged yet)
    fn staged(&self, key: &GameKey) -> StagedAssets;

    /// Copy the game's assets to the temporary location
    async fn stage(&self, key: &GameKey) -> Result<(), CollabError>;

    /// Fetch an asset by URL
    async fn fetch(&self, url: &str) -> Result<Bytes, CollabError>;

    /// Delete the staged copies
    async fn release(&self, key: &GameKey) -> Result<(), CollabError>;
}

/// Username lookup
pub trait UserDirectory: Send + Sync {
    fn resolve(&self, username: &str) -> Option<UserRecord>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    Singleplayer,
    Multiplayer,
}

impl PlayMode {
    pub fn for_player_count(count: usize) -> Self {
        if count <= 1 {
            Self::Singleplayer
        } else {
            Self::Multiplayer
        }
    }
}

/// Finished game submitted for highscores
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub username: String,
    pub time: u64,
    pub mode: PlayMode,
    pub game_id: u64,
    pub variant: GameVariant,
}

/// Receiver of finished-game records
#[async_trait]
pub trait HighscoreSink: Send + Sync {
    async fn submit(&self, record: &GameRecord) -> Result<(), CollabError>;
}

/// Highscore sink used when no highscore service is configured
pub struct LogHighscores;

#[async_trait]
impl HighscoreSink for LogHighscores {
    async fn submit(&self, record: &GameRecord) -> Result<(), CollabError> {
        info!(
            username = %record.username,
            time = record.time,
            game_id = record.game_id,
            variant = %record.variant,
            "Game finished (no highscore service configured)"
        );
        Ok(())
    }
}

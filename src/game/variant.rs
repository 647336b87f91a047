//! Game variants and the identifiers of the underlying games

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which flavour of spot-the-differences a session plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    /// 2D: find the differing pixel clusters between two images
    PixelHunt,
    /// 3D: find the added, removed or recolored scene objects
    SceneDelta,
}

impl GameVariant {
    /// Parse a mode string from a game request.
    /// Accepts the legacy `simple`/`free` names as well.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "pixel_hunt" | "simple" => Some(Self::PixelHunt),
            "scene_delta" | "free" => Some(Self::SceneDelta),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PixelHunt => "pixel_hunt",
            Self::SceneDelta => "scene_delta",
        }
    }
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one underlying game (the asset set several sessions may share)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameKey {
    pub variant: GameVariant,
    pub game_id: u64,
}

impl GameKey {
    pub fn new(variant: GameVariant, game_id: u64) -> Self {
        Self { variant, game_id }
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.variant, self.game_id)
    }
}

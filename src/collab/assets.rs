//! Filesystem asset store with temporary per-game copies

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::error::CollabError;
use crate::game::{GameKey, GameVariant};

use super::{AssetStore, StagedAssets};

const ORIGINAL_SUFFIX: &str = "_original.bmp";
const GENERATED_SUFFIX: &str = "_generated.bmp";
const SCENE_SUFFIX: &str = "_scene.json";

/// Reads game assets from `asset_root` and stages copies in `temp_dir`,
/// which the HTTP layer serves under `{public_base_url}/temp/`.
#[derive(Clone)]
pub struct FsAssetStore {
    asset_root: PathBuf,
    temp_dir: PathBuf,
    public_base_url: String,
    client: Client,
}

impl FsAssetStore {
    pub fn new(
        asset_root: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            asset_root: asset_root.into(),
            temp_dir: temp_dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// (source file, staged file name) pairs for a game
    fn files(&self, key: &GameKey) -> Vec<(PathBuf, String)> {
        let id = key.game_id;
        let staged = |suffix: &str| format!("{}-{}{}", key.variant, id, suffix);
        match key.variant {
            GameVariant::PixelHunt => {
                let images = self.asset_root.join("images");
                vec![
                    (
                        images.join(format!("{}{}", id, ORIGINAL_SUFFIX)),
                        staged(ORIGINAL_SUFFIX),
                    ),
                    (
                        images.join(format!("{}{}", id, GENERATED_SUFFIX)),
                        staged(GENERATED_SUFFIX),
                    ),
                ]
            }
            GameVariant::SceneDelta => vec![(
                self.asset_root
                    .join("scenes")
                    .join(format!("{}{}", id, SCENE_SUFFIX)),
                staged(SCENE_SUFFIX),
            )],
        }
    }

    fn temp_url(&self, name: &str) -> String {
        format!("{}/temp/{}", self.public_base_url, name)
    }

    /// Map one of our own temp URLs back to a local path
    fn local_path(&self, url: &str) -> Option<PathBuf> {
        let prefix = format!("{}/temp/", self.public_base_url);
        let name = url.strip_prefix(&prefix)?;
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }
        Some(self.temp_dir.join(name))
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    fn staged(&self, key: &GameKey) -> StagedAssets {
        let names: Vec<String> = self
            .files(key)
            .into_iter()
            .map(|(_, name)| self.temp_url(&name))
            .collect();

        match key.variant {
            GameVariant::PixelHunt => StagedAssets::PixelHunt {
                original_url: names[0].clone(),
                difference_url: names[1].clone(),
            },
            GameVariant::SceneDelta => StagedAssets::SceneDelta {
                scene_url: names[0].clone(),
            },
        }
    }

    async fn stage(&self, key: &GameKey) -> Result<(), CollabError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        for (source, name) in self.files(key) {
            tokio::fs::copy(&source, self.temp_dir.join(&name)).await?;
            debug!(game = %key, file = %name, "Staged asset");
        }
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, CollabError> {
        if let Some(path) = self.local_path(url) {
            return Ok(Bytes::from(tokio::fs::read(path).await?));
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CollabError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?)
    }

    async fn release(&self, key: &GameKey) -> Result<(), CollabError> {
        for (_, name) in self.files(key) {
            match tokio::fs::remove_file(self.temp_dir.join(&name)).await {
                Ok(()) => debug!(game = %key, file = %name, "Released asset"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

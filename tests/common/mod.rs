//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use spot_diff_server::collab::{
    AssetStore, ConnectedUsers, GameRecord, HighscoreSink, HitValidator, StagedAssets,
};
use spot_diff_server::config::GameRules;
use spot_diff_server::error::CollabError;
use spot_diff_server::game::{GameKey, GameVariant};
use spot_diff_server::session::{Collaborators, SessionManager};
use spot_diff_server::ws::protocol::{HitConfirmation, HitEvent, HitRequest, ServerMsg};

enum Source {
    Scene(u32),
    Pixels { original: Bytes, difference: Bytes },
    Stalled,
    Unavailable,
}

/// In-memory game assets: a scene, a pair of bitmaps, a fetch that never
/// answers or a store that cannot stage anything
pub struct MemoryAssets {
    source: Source,
    pub staged: AtomicUsize,
    pub released: AtomicUsize,
}

impl MemoryAssets {
    fn serving(source: Source) -> Arc<Self> {
        Arc::new(Self {
            source,
            staged: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        })
    }

    /// Scene with modifications `0..count`
    pub fn with_differences(count: u32) -> Arc<Self> {
        Self::serving(Source::Scene(count))
    }

    /// Original and difference bitmaps
    pub fn pixels(original: Vec<u8>, difference: Vec<u8>) -> Arc<Self> {
        Self::serving(Source::Pixels {
            original: Bytes::from(original),
            difference: Bytes::from(difference),
        })
    }

    pub fn stalled() -> Arc<Self> {
        Self::serving(Source::Stalled)
    }

    pub fn unavailable() -> Arc<Self> {
        Self::serving(Source::Unavailable)
    }

    pub fn staged(&self) -> usize {
        self.staged.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

fn missing() -> CollabError {
    CollabError::Api {
        status: 404,
        body: "no such game".to_string(),
    }
}

#[async_trait]
impl AssetStore for MemoryAssets {
    fn staged(&self, key: &GameKey) -> StagedAssets {
        match key.variant {
            GameVariant::PixelHunt => StagedAssets::PixelHunt {
                original_url: format!("memory://{}/original", key),
                difference_url: format!("memory://{}/difference", key),
            },
            GameVariant::SceneDelta => StagedAssets::SceneDelta {
                scene_url: format!("memory://{}/scene", key),
            },
        }
    }

    async fn stage(&self, _key: &GameKey) -> Result<(), CollabError> {
        if let Source::Unavailable = self.source {
            return Err(missing());
        }
        self.staged.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, CollabError> {
        match &self.source {
            Source::Scene(count) => {
                let modifications: Vec<serde_json::Value> = (0..*count)
                    .map(|id| serde_json::json!({ "id": id, "type": "changedColor" }))
                    .collect();
                let scene = serde_json::json!({
                    "originalScene": { "sceneObjects": [] },
                    "modifiedScene": { "sceneObjects": [] },
                    "modifications": modifications,
                });
                Ok(Bytes::from(scene.to_string()))
            }
            Source::Pixels {
                original,
                difference,
            } => {
                if url.ends_with("/original") {
                    Ok(original.clone())
                } else {
                    Ok(difference.clone())
                }
            }
            Source::Stalled => std::future::pending().await,
            Source::Unavailable => Err(missing()),
        }
    }

    async fn release(&self, _key: &GameKey) -> Result<(), CollabError> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Object clicks hit the difference with the same id; pixel clicks hit
/// difference `x / 10`
pub struct GridValidator;

#[async_trait]
impl HitValidator for GridValidator {
    async fn validate(
        &self,
        _variant: GameVariant,
        request: &HitRequest,
    ) -> Result<HitConfirmation, CollabError> {
        let matched_difference_id = match request.event_info {
            HitEvent::Object(id) => id,
            HitEvent::Pixel(position) => position.x / 10,
        };
        Ok(HitConfirmation {
            is_hit: true,
            matched_difference_id,
        })
    }
}

#[derive(Default)]
pub struct RecordedHighscores {
    pub records: Mutex<Vec<GameRecord>>,
}

#[async_trait]
impl HighscoreSink for RecordedHighscores {
    async fn submit(&self, record: &GameRecord) -> Result<(), CollabError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

pub struct Harness {
    pub sessions: Arc<SessionManager>,
    pub users: Arc<ConnectedUsers>,
    pub assets: Arc<MemoryAssets>,
    pub highscores: Arc<RecordedHighscores>,
}

impl Harness {
    pub fn new(assets: Arc<MemoryAssets>) -> Self {
        let users = Arc::new(ConnectedUsers::new());
        let highscores = Arc::new(RecordedHighscores::default());
        let collab = Collaborators {
            validator: Arc::new(GridValidator),
            assets: assets.clone(),
            users: users.clone(),
            highscores: highscores.clone(),
        };

        Self {
            sessions: SessionManager::new(collab, GameRules::default()),
            users,
            assets,
            highscores,
        }
    }

    /// Log a user in on a fresh connection and return its inbox
    pub fn connect(&self, username: &str) -> Client {
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(256);
        self.sessions.register_connection(connection_id, tx);
        assert!(self.users.login(username, connection_id));
        Client {
            username: username.to_string(),
            connection_id,
            rx,
        }
    }
}

pub struct Client {
    pub username: String,
    pub connection_id: Uuid,
    pub rx: mpsc::Receiver<ServerMsg>,
}

impl Client {
    /// Everything received so far
    pub fn drain(&mut self) -> Vec<ServerMsg> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }
}

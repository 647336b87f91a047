//! Fakes for session tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::collab::{AssetStore, HitValidator, StagedAssets};
use crate::config::GameRules;
use crate::error::CollabError;
use crate::util::tasks::ScheduledTasks;
use crate::ws::protocol::{
    ActionType, HitConfirmation, HitEvent, HitRequest, Reveal, SceneObjectUpdate, ServerMsg,
};

use super::context::{GameOutcome, SessionContext, SessionHost};
use super::{
    ConnId, DifferenceTargets, GameKey, GameVariant, Roster, SessionId, Timer, UserRecord,
};

/// Host that records everything sent through it
#[derive(Default)]
pub struct RecordingHost {
    sent: Mutex<Vec<(ConnId, ServerMsg)>>,
    outcomes: Mutex<Vec<(SessionId, GameOutcome)>>,
    teardowns: Mutex<Vec<SessionId>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages_for(&self, connection_id: ConnId) -> Vec<ServerMsg> {
        self.sent
            .lock()
            .iter()
            .filter(|(conn, _)| *conn == connection_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub fn count(&self, connection_id: ConnId, event_type: &str) -> usize {
        self.messages_for(connection_id)
            .iter()
            .filter(|msg| msg.event_type() == event_type)
            .count()
    }

    pub fn outcomes(&self) -> Vec<(SessionId, GameOutcome)> {
        self.outcomes.lock().clone()
    }

    pub fn teardowns(&self) -> Vec<SessionId> {
        self.teardowns.lock().clone()
    }
}

#[async_trait]
impl SessionHost for RecordingHost {
    fn send(&self, connection_id: ConnId, msg: ServerMsg) {
        self.sent.lock().push((connection_id, msg));
    }

    async fn end_of_game(&self, session_id: SessionId, outcome: GameOutcome) {
        self.outcomes.lock().push((session_id, outcome));
    }

    async fn teardown(&self, session_id: SessionId) {
        self.teardowns.lock().push(session_id);
    }
}

type Script = dyn Fn(&HitRequest) -> (Duration, Result<HitConfirmation, CollabError>) + Send + Sync;

/// Validator answering from a closure, optionally after a delay
pub struct ScriptedValidator(Box<Script>);

#[async_trait]
impl HitValidator for ScriptedValidator {
    async fn validate(
        &self,
        _variant: GameVariant,
        request: &HitRequest,
    ) -> Result<HitConfirmation, CollabError> {
        let (delay, result) = (self.0)(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

fn hit(id: u32) -> Result<HitConfirmation, CollabError> {
    Ok(HitConfirmation {
        is_hit: true,
        matched_difference_id: id,
    })
}

fn object_id(request: &HitRequest) -> u32 {
    match request.event_info {
        HitEvent::Object(id) => id,
        HitEvent::Pixel(position) => position.x,
    }
}

/// Every click hits the difference whose id is the clicked object
pub fn object_validator() -> Arc<dyn HitValidator> {
    Arc::new(ScriptedValidator(Box::new(|request: &HitRequest| {
        (Duration::ZERO, hit(object_id(request)))
    })))
}

/// Object `n` hits difference `n % 100` after `delay(request)`
pub fn delayed_object_validator<F>(delay: F) -> Arc<dyn HitValidator>
where
    F: Fn(&HitRequest) -> Duration + Send + Sync + 'static,
{
    Arc::new(ScriptedValidator(Box::new(move |request: &HitRequest| {
        (delay(request), hit(object_id(request) % 100))
    })))
}

pub fn failing_validator() -> Arc<dyn HitValidator> {
    Arc::new(ScriptedValidator(Box::new(|_: &HitRequest| {
        (
            Duration::ZERO,
            Err::<HitConfirmation, _>(CollabError::Api {
                status: 503,
                body: "unavailable".to_string(),
            }),
        )
    })))
}

/// Scene targets with ids `0..count`
pub fn scene_targets(count: u32) -> Arc<DifferenceTargets> {
    Arc::new(
        (0..count)
            .map(|id| {
                (
                    id,
                    Reveal::SceneObject(SceneObjectUpdate {
                        action_to_apply: ActionType::ChangeColor,
                        scene_object: None,
                    }),
                )
            })
            .collect(),
    )
}

pub fn users(names: &[&str]) -> Vec<UserRecord> {
    names
        .iter()
        .map(|name| UserRecord::new(*name, Uuid::new_v4()))
        .collect()
}

/// Session context over `names`, session id 1000, SceneDelta game 1
pub fn context(
    host: &Arc<RecordingHost>,
    validator: Arc<dyn HitValidator>,
    names: &[&str],
) -> (Arc<SessionContext>, Vec<ConnId>) {
    let users = users(names);
    let connections = users.iter().map(|u| u.connection_id).collect();
    let host: Arc<dyn SessionHost> = host.clone();

    let ctx = SessionContext {
        id: 1000,
        key: GameKey::new(GameVariant::SceneDelta, 1),
        rules: GameRules::default(),
        roster: Mutex::new(Roster::new(&users)),
        timer: Timer::new(),
        tasks: ScheduledTasks::new(),
        host: Arc::downgrade(&host),
        validator,
    };
    (Arc::new(ctx), connections)
}

/// Serves one scene file for every game, or never answers
pub struct SceneStore {
    pub scene: Option<serde_json::Value>,
}

impl SceneStore {
    /// Scene with modifications `0..count`
    pub fn with_differences(count: u32) -> Arc<Self> {
        let modifications: Vec<serde_json::Value> = (0..count)
            .map(|id| serde_json::json!({ "id": id, "type": "changedColor" }))
            .collect();
        Arc::new(Self {
            scene: Some(serde_json::json!({
                "originalScene": { "sceneObjects": [] },
                "modifiedScene": { "sceneObjects": [] },
                "modifications": modifications,
            })),
        })
    }
}

#[async_trait]
impl AssetStore for SceneStore {
    fn staged(&self, _key: &GameKey) -> StagedAssets {
        StagedAssets::SceneDelta {
            scene_url: "scene".to_string(),
        }
    }

    async fn stage(&self, _key: &GameKey) -> Result<(), CollabError> {
        Ok(())
    }

    async fn fetch(&self, _url: &str) -> Result<Bytes, CollabError> {
        match &self.scene {
            Some(scene) => Ok(Bytes::from(serde_json::to_vec(scene).unwrap_or_default())),
            None => std::future::pending().await,
        }
    }

    async fn release(&self, _key: &GameKey) -> Result<(), CollabError> {
        Ok(())
    }
}

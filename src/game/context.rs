//! State and services shared by an arena and its referee

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::collab::HitValidator;
use crate::config::GameRules;
use crate::util::tasks::ScheduledTasks;
use crate::ws::protocol::ServerMsg;

use super::{ConnId, GameKey, Roster, SessionId, Timer};

/// How a finished game ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub winner: String,
    pub elapsed_seconds: u64,
    pub player_count: usize,
}

/// What a session needs from the registry that owns it
#[async_trait]
pub trait SessionHost: Send + Sync {
    /// Best-effort delivery to one connection
    fn send(&self, connection_id: ConnId, msg: ServerMsg);

    /// The referee decided a winner
    async fn end_of_game(&self, session_id: SessionId, outcome: GameOutcome);

    /// Remove the session and release what it holds
    async fn teardown(&self, session_id: SessionId);
}

/// Per-session context. Nothing in here is reachable from another session.
pub struct SessionContext {
    pub id: SessionId,
    pub key: GameKey,
    pub rules: GameRules,
    pub roster: Mutex<Roster>,
    pub timer: Timer,
    pub tasks: ScheduledTasks,
    pub host: Weak<dyn SessionHost>,
    pub validator: Arc<dyn HitValidator>,
}

impl SessionContext {
    pub fn send(&self, connection_id: ConnId, msg: ServerMsg) {
        if let Some(host) = self.host.upgrade() {
            host.send(connection_id, msg);
        }
    }

    /// Send to every current player
    pub fn broadcast(&self, msg: ServerMsg) {
        let connections = self.roster.lock().connection_ids();
        for connection_id in connections {
            self.send(connection_id, msg.clone());
        }
    }

    pub fn host(&self) -> Option<Arc<dyn SessionHost>> {
        self.host.upgrade()
    }
}

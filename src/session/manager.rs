//! Session manager - owns every arena, the lobby and the shared asset counts

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::collab::{
    AssetStore, GameRecord, HighscoreSink, HitValidator, PlayMode, UserDirectory,
};
use crate::config::GameRules;
use crate::error::GameError;
use crate::game::{
    Arena, ConnId, DifferenceId, GameKey, GameOutcome, GameVariant, PlayerInput, SessionHost,
    SessionId, UserRecord,
};
use crate::matchmaking::{LobbyOutcome, MatchmakingLobby};
use crate::ws::protocol::{
    ArenaResponse, CancelRequest, GameRequest, GameType, Message, MessageTitle, ServerMsg,
};

use super::assets::AssetRefCount;
use super::connections::ConnectionRegistry;

/// First session id handed out
pub const FIRST_SESSION_ID: SessionId = 1000;

/// External services the sessions depend on
#[derive(Clone)]
pub struct Collaborators {
    pub validator: Arc<dyn HitValidator>,
    pub assets: Arc<dyn AssetStore>,
    pub users: Arc<dyn UserDirectory>,
    pub highscores: Arc<dyn HighscoreSink>,
}

/// Result of a multiplayer join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Waiting,
    Joined(SessionId),
}

/// Check-then-act state shared by every session
#[derive(Default)]
struct World {
    lobby: MatchmakingLobby,
    refs: AssetRefCount,
}

pub struct SessionManager {
    this: Weak<SessionManager>,
    rules: GameRules,
    collab: Collaborators,
    next_id: AtomicU64,
    sessions: DashMap<SessionId, Arc<Arena>>,
    connections: ConnectionRegistry,
    world: Mutex<World>,
}

impl SessionManager {
    pub fn new(collab: Collaborators, rules: GameRules) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            rules,
            collab,
            next_id: AtomicU64::new(FIRST_SESSION_ID),
            sessions: DashMap::new(),
            connections: ConnectionRegistry::new(),
            world: Mutex::new(World::default()),
        })
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Turn a game request into a session or a lobby entry
    pub async fn analyse_request(&self, request: &GameRequest) -> Message {
        let Some(user) = self.collab.users.resolve(&request.username) else {
            let e = GameError::UserNotFound(request.username.clone());
            return Message::new(MessageTitle::OnError, e.to_string());
        };
        let Some(variant) = GameVariant::from_name(&request.mode) else {
            let e = GameError::InvalidMode(request.mode.clone());
            return Message::new(MessageTitle::OnModeInvalid, e.to_string());
        };
        let key = GameKey::new(variant, request.game_id);

        let result = match request.kind {
            GameType::Solo => self.create_session(key, vec![user]).await.map(JoinOutcome::Joined),
            GameType::Multi => self.join_lobby(key, user).await,
        };

        match result {
            Ok(JoinOutcome::Joined(id)) => Message::new(MessageTitle::OnSuccess, id.to_string()),
            Ok(JoinOutcome::Waiting) => {
                Message::new(MessageTitle::OnWaiting, "Waiting for another player")
            }
            Err(e) => Message::new(MessageTitle::OnError, e.to_string()),
        }
    }

    /// Queue a user for a multiplayer game; the second arrival creates the session
    pub async fn join_lobby(&self, key: GameKey, user: UserRecord) -> Result<JoinOutcome, GameError> {
        let username = user.username.clone();
        let outcome = self.world.lock().await.lobby.enqueue(key, user);

        let peers = match outcome {
            LobbyOutcome::Waiting => {
                info!(game = %key, username = %username, "Waiting in lobby");
                return Ok(JoinOutcome::Waiting);
            }
            LobbyOutcome::Paired { peers, waited } => {
                info!(
                    game = %key,
                    username = %username,
                    waited_ms = waited.as_millis() as u64,
                    "Lobby entry filled"
                );
                peers
            }
        };

        let waiting: Vec<ConnId> = peers
            .iter()
            .filter(|p| p.username != username)
            .map(|p| p.connection_id)
            .collect();

        match self.create_session(key, peers).await {
            Ok(id) => {
                for connection_id in waiting {
                    self.send(connection_id, ServerMsg::OnArenaConnect { arena_id: id });
                }
                Ok(JoinOutcome::Joined(id))
            }
            Err(e) => {
                for connection_id in waiting {
                    self.send(
                        connection_id,
                        ServerMsg::Error {
                            message: e.to_string(),
                        },
                    );
                }
                Err(e)
            }
        }
    }

    /// Withdraw a pending multiplayer request
    pub async fn cancel_request(&self, request: &CancelRequest) -> Message {
        let Some(variant) = GameVariant::from_name(&request.mode) else {
            let e = GameError::InvalidMode(request.mode.clone());
            return Message::new(MessageTitle::OnModeInvalid, e.to_string());
        };

        if self.cancel_lobby(GameKey::new(variant, request.game_id)).await {
            Message::new(MessageTitle::OnSuccess, request.game_id.to_string())
        } else {
            Message::new(MessageTitle::OnError, request.game_id.to_string())
        }
    }

    pub async fn cancel_lobby(&self, key: GameKey) -> bool {
        let cancelled = self.world.lock().await.lobby.cancel(key);
        debug!(game = %key, cancelled, "Lobby entry cancelled");
        cancelled
    }

    /// Stage assets, register an arena and start preparing it
    pub async fn create_session(
        &self,
        key: GameKey,
        users: Vec<UserRecord>,
    ) -> Result<SessionId, GameError> {
        {
            let mut world = self.world.lock().await;
            if world.refs.count(key) == 0 {
                self.collab
                    .assets
                    .stage(&key)
                    .await
                    .map_err(GameError::AssetFetch)?;
            }
            world.refs.acquire(key);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let host: Weak<dyn SessionHost> = self.this.clone();
        let arena = Arena::new(
            id,
            key,
            &users,
            self.collab.assets.staged(&key),
            self.rules.clone(),
            host,
            self.collab.validator.clone(),
        );

        self.sessions.insert(id, arena.clone());
        arena.start_preparation(self.collab.assets.clone());

        info!(
            session_id = id,
            game = %key,
            player_count = users.len(),
            "Session created"
        );
        Ok(id)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Remove a session and release its assets. A second call is a no-op.
    pub async fn teardown(&self, session_id: SessionId) {
        let Some((_, arena)) = self.sessions.remove(&session_id) else {
            debug!(session_id, "Teardown of unknown session ignored");
            return;
        };
        arena.shutdown();

        let key = arena.key();
        let mut world = self.world.lock().await;
        match world.refs.release(key) {
            Some(0) => {
                if let Err(e) = self.collab.assets.release(&key).await {
                    error!(game = %key, error = %e, "Failed to release staged assets");
                }
            }
            Some(remaining) => debug!(game = %key, remaining, "Assets still in use"),
            None => warn!(game = %key, "Session held no asset reference"),
        }

        info!(session_id, "Session torn down");
    }

    /// Announce the result, record the highscore and tear down
    pub async fn end_of_game(&self, session_id: SessionId, outcome: GameOutcome) {
        let Some(arena) = self.session(session_id) else {
            return;
        };

        for player in arena.players() {
            self.send(
                player.connection_id,
                ServerMsg::OnGameEnded {
                    arena_id: session_id,
                    winner: outcome.winner.clone(),
                    elapsed_seconds: outcome.elapsed_seconds,
                },
            );
        }

        let key = arena.key();
        let record = GameRecord {
            username: outcome.winner.clone(),
            time: outcome.elapsed_seconds,
            mode: PlayMode::for_player_count(outcome.player_count),
            game_id: key.game_id,
            variant: key.variant,
        };
        if let Err(e) = self.collab.highscores.submit(&record).await {
            warn!(session_id, error = %e, "Failed to submit highscore");
        }

        self.teardown(session_id).await;
    }

    // ========================================================================
    // Connections and routing
    // ========================================================================

    pub fn register_connection(&self, connection_id: ConnId, tx: mpsc::Sender<ServerMsg>) {
        self.connections.register(connection_id, tx);
        debug!(connection_id = %connection_id, "Connection registered");
    }

    /// Forget a connection and take its user out of the lobby and every session
    pub async fn unregister_connection(&self, connection_id: ConnId, username: Option<&str>) {
        self.connections.unregister(connection_id);

        if let Some(username) = username {
            self.remove_user(username).await;
        }
        debug!(connection_id = %connection_id, username = ?username, "Connection unregistered");
    }

    /// Take a user out of the lobby and every session they play in.
    /// Returns the number of sessions left.
    pub async fn remove_user(&self, username: &str) -> usize {
        self.world.lock().await.lobby.remove_user(username);

        let arenas: Vec<Arc<Arena>> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().contains(username))
            .map(|entry| entry.value().clone())
            .collect();
        for arena in &arenas {
            arena.remove_player(username).await;
        }

        info!(username = %username, sessions = arenas.len(), "User removed");
        arenas.len()
    }

    /// Route a player input to its session
    pub async fn route_input(&self, input: PlayerInput) -> Result<ArenaResponse, GameError> {
        let arena = self
            .session(input.session_id)
            .ok_or(GameError::UnknownSession(input.session_id))?;
        if !arena.contains(&input.username) {
            return Err(GameError::PlayerNotInSession {
                session_id: input.session_id,
                username: input.username,
            });
        }
        Ok(arena.on_input(input).await)
    }

    pub fn player_ready(&self, session_id: SessionId, username: &str) -> Result<(), GameError> {
        let arena = self
            .session(session_id)
            .ok_or(GameError::UnknownSession(session_id))?;
        if !arena.on_ready(username) {
            return Err(GameError::PlayerNotInSession {
                session_id,
                username: username.to_string(),
            });
        }
        Ok(())
    }

    pub fn send(&self, connection_id: ConnId, msg: ServerMsg) {
        self.connections.send(connection_id, msg);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn session(&self, session_id: SessionId) -> Option<Arc<Arena>> {
        self.sessions.get(&session_id).map(|a| a.value().clone())
    }

    /// Empty for unknown sessions
    pub fn remaining_difference_ids(&self, session_id: SessionId) -> Vec<DifferenceId> {
        self.session(session_id)
            .map(|arena| arena.remaining_difference_ids())
            .unwrap_or_default()
    }

    pub fn users_in_session(&self, session_id: SessionId) -> Vec<UserRecord> {
        self.session(session_id)
            .map(|arena| arena.players())
            .unwrap_or_default()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub async fn waiting_lobbies(&self) -> usize {
        self.world.lock().await.lobby.len()
    }

    pub async fn asset_refs(&self, key: GameKey) -> u32 {
        self.world.lock().await.refs.count(key)
    }
}

#[async_trait]
impl SessionHost for SessionManager {
    fn send(&self, connection_id: ConnId, msg: ServerMsg) {
        SessionManager::send(self, connection_id, msg);
    }

    async fn end_of_game(&self, session_id: SessionId, outcome: GameOutcome) {
        SessionManager::end_of_game(self, session_id, outcome).await;
    }

    async fn teardown(&self, session_id: SessionId) {
        SessionManager::teardown(self, session_id).await;
    }
}

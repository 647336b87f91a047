//! Application state shared across routes

use std::sync::Arc;

use crate::collab::{
    ConnectedUsers, FsAssetStore, HighscoreSink, HttpHighscores, HttpHitValidator, LogHighscores,
};
use crate::config::Config;
use crate::session::{Collaborators, SessionManager};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionManager>,
    pub users: Arc<ConnectedUsers>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let users = Arc::new(ConnectedUsers::new());

        let highscores: Arc<dyn HighscoreSink> = match &config.highscore_url {
            Some(url) => Arc::new(HttpHighscores::new(url.clone())),
            None => Arc::new(LogHighscores),
        };

        let collab = Collaborators {
            validator: Arc::new(HttpHitValidator::new(config.hit_validator_url.clone())),
            assets: Arc::new(FsAssetStore::new(
                config.asset_root.clone(),
                config.temp_dir.clone(),
                config.public_base_url.clone(),
            )),
            users: users.clone(),
            highscores,
        };

        let sessions = SessionManager::new(collab, config.rules.clone());
        Self::from_parts(config, sessions, users)
    }

    /// Assemble state around an existing session manager
    pub fn from_parts(
        config: Config,
        sessions: Arc<SessionManager>,
        users: Arc<ConnectedUsers>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            users,
        }
    }
}

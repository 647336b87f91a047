//! Session-scoped participant record

use serde::Serialize;

use crate::game::ConnId;

/// Player state in a session
#[derive(Debug, Clone)]
pub struct Player {
    username: String,
    connection_id: ConnId,
    points: u32,
    ready: bool,
    penalized: bool,
}

impl Player {
    pub fn new(username: impl Into<String>, connection_id: ConnId) -> Self {
        Self {
            username: username.into(),
            connection_id,
            points: 0,
            ready: false,
            penalized: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn connection_id(&self) -> ConnId {
        self.connection_id
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    /// Points only ever go up
    pub fn add_points(&mut self, points: u32) -> u32 {
        self.points = self.points.saturating_add(points);
        self.points
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_penalized(&self) -> bool {
        self.penalized
    }

    pub fn set_penalized(&mut self, penalized: bool) {
        self.penalized = penalized;
    }

    pub fn to_user(&self) -> UserRecord {
        UserRecord {
            username: self.username.clone(),
            connection_id: self.connection_id,
        }
    }
}

/// A user as known to the user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub connection_id: ConnId,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, connection_id: ConnId) -> Self {
        Self {
            username: username.into(),
            connection_id,
        }
    }
}

impl From<&UserRecord> for Player {
    fn from(user: &UserRecord) -> Self {
        Player::new(user.username.clone(), user.connection_id)
    }
}

/// Ordered players of one session
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub fn new(users: &[UserRecord]) -> Self {
        Self {
            players: users.iter().map(Player::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.username() == username)
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.username() == username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.get(username).is_some()
    }

    /// Remove a player, returning it if present
    pub fn remove(&mut self, username: &str) -> Option<Player> {
        let pos = self.players.iter().position(|p| p.username() == username)?;
        Some(self.players.remove(pos))
    }

    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(Player::is_ready)
    }

    pub fn connection_ids(&self) -> Vec<ConnId> {
        self.players.iter().map(Player::connection_id).collect()
    }

    pub fn users(&self) -> Vec<UserRecord> {
        self.players.iter().map(Player::to_user).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }
}

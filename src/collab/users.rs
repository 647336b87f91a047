//! In-memory user directory fed by WebSocket logins

use dashmap::DashMap;

use crate::game::{ConnId, UserRecord};

use super::UserDirectory;

/// Usernames currently logged in, with their connection
#[derive(Default)]
pub struct ConnectedUsers {
    by_name: DashMap<String, ConnId>,
}

impl ConnectedUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `username` for `connection_id`.
    /// Fails if another live connection already holds the name.
    pub fn login(&self, username: &str, connection_id: ConnId) -> bool {
        match self.by_name.entry(username.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => *entry.get() == connection_id,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(connection_id);
                true
            }
        }
    }

    /// Release `username` if `connection_id` still holds it
    pub fn logout(&self, username: &str, connection_id: ConnId) {
        self.by_name
            .remove_if(username, |_, holder| *holder == connection_id);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl UserDirectory for ConnectedUsers {
    fn resolve(&self, username: &str) -> Option<UserRecord> {
        self.by_name
            .get(username)
            .map(|conn| UserRecord::new(username, *conn))
    }
}

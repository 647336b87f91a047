//! Matchmaking lobby: per-game queues of waiting users

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::game::{GameKey, UserRecord};

/// User waiting in a lobby entry
#[derive(Debug, Clone)]
pub struct QueuedUser {
    pub user: UserRecord,
    pub queued_at: Instant,
}

impl QueuedUser {
    pub fn new(user: UserRecord) -> Self {
        Self {
            user,
            queued_at: Instant::now(),
        }
    }

    /// How long this user has been waiting
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

/// Result of joining a lobby entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyOutcome {
    /// Nobody to play with yet
    Waiting,
    /// Entry filled; peers in arrival order, the new user last.
    /// `waited` is how long the first of them had been queued.
    Paired {
        peers: Vec<UserRecord>,
        waited: Duration,
    },
}

/// The matchmaking lobby
pub struct MatchmakingLobby {
    entries: HashMap<GameKey, Vec<QueuedUser>>,
    /// Players per multiplayer session
    party_size: usize,
}

impl MatchmakingLobby {
    pub fn new(party_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            party_size: party_size.max(2),
        }
    }

    /// Add a user to the entry for `key`
    pub fn enqueue(&mut self, key: GameKey, user: UserRecord) -> LobbyOutcome {
        let entry = self.entries.entry(key).or_default();

        // Re-requesting the same game keeps the user waiting, never paired with themself
        if entry.iter().any(|q| q.user.username == user.username) {
            return LobbyOutcome::Waiting;
        }
        entry.push(QueuedUser::new(user));

        if entry.len() < self.party_size {
            return LobbyOutcome::Waiting;
        }

        let queued = self.entries.remove(&key).unwrap_or_default();
        let waited = queued
            .iter()
            .map(QueuedUser::wait_time)
            .max()
            .unwrap_or_default();
        LobbyOutcome::Paired {
            peers: queued.into_iter().map(|q| q.user).collect(),
            waited,
        }
    }

    /// Drop the pending entry for `key`. Returns whether one existed.
    pub fn cancel(&mut self, key: GameKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Remove a user from every entry they wait in
    pub fn remove_user(&mut self, username: &str) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, queue| {
            let before = queue.len();
            queue.retain(|q| q.user.username != username);
            removed += before - queue.len();
            !queue.is_empty()
        });
        removed
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_waiting(&self, key: GameKey) -> bool {
        self.entries.contains_key(&key)
    }
}

impl Default for MatchmakingLobby {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameVariant;
    use uuid::Uuid;

    fn user(name: &str) -> UserRecord {
        UserRecord::new(name, Uuid::new_v4())
    }

    const GAME: GameKey = GameKey {
        variant: GameVariant::PixelHunt,
        game_id: 7,
    };

    #[test]
    fn second_request_pairs_and_clears_the_entry() {
        let mut lobby = MatchmakingLobby::default();
        let alice = user("alice");
        let bob = user("bob");

        assert_eq!(lobby.enqueue(GAME, alice.clone()), LobbyOutcome::Waiting);
        assert!(lobby.is_waiting(GAME));

        match lobby.enqueue(GAME, bob.clone()) {
            LobbyOutcome::Paired { peers, .. } => assert_eq!(peers, vec![alice, bob]),
            other => panic!("expected a pairing, got {:?}", other),
        }
        assert!(lobby.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pairing_reports_how_long_the_first_user_waited() {
        let mut lobby = MatchmakingLobby::default();
        lobby.enqueue(GAME, user("alice"));
        tokio::time::sleep(Duration::from_secs(42)).await;

        match lobby.enqueue(GAME, user("bob")) {
            LobbyOutcome::Paired { waited, .. } => assert_eq!(waited, Duration::from_secs(42)),
            other => panic!("expected a pairing, got {:?}", other),
        }
    }

    #[test]
    fn same_user_twice_keeps_waiting() {
        let mut lobby = MatchmakingLobby::default();
        let alice = user("alice");

        assert_eq!(lobby.enqueue(GAME, alice.clone()), LobbyOutcome::Waiting);
        assert_eq!(lobby.enqueue(GAME, alice), LobbyOutcome::Waiting);
        assert_eq!(lobby.len(), 1);
    }

    #[test]
    fn variants_do_not_share_entries() {
        let mut lobby = MatchmakingLobby::default();
        let scene = GameKey::new(GameVariant::SceneDelta, 7);

        lobby.enqueue(GAME, user("alice"));
        assert_eq!(lobby.enqueue(scene, user("bob")), LobbyOutcome::Waiting);
        assert_eq!(lobby.len(), 2);
    }

    #[test]
    fn cancel_reports_whether_an_entry_existed() {
        let mut lobby = MatchmakingLobby::default();
        assert!(!lobby.cancel(GAME));

        lobby.enqueue(GAME, user("alice"));
        assert!(lobby.cancel(GAME));
        assert!(!lobby.cancel(GAME));

        // a cancelled entry starts over
        assert_eq!(lobby.enqueue(GAME, user("bob")), LobbyOutcome::Waiting);
    }

    #[test]
    fn departed_user_leaves_every_entry() {
        let mut lobby = MatchmakingLobby::default();
        lobby.enqueue(GAME, user("alice"));
        lobby.enqueue(GameKey::new(GameVariant::PixelHunt, 8), user("alice"));

        assert_eq!(lobby.remove_user("alice"), 2);
        assert!(lobby.is_empty());
    }
}

//! Matchmaking

pub mod lobby;

pub use lobby::{LobbyOutcome, MatchmakingLobby, QueuedUser};

//! Session core: arenas, referees and their supporting types

pub mod arena;
pub mod context;
pub mod player;
pub mod referee;
pub mod targets;
pub mod timer;
pub mod variant;

#[cfg(test)]
pub(crate) mod testing;

pub use arena::{Arena, ArenaStatus};
pub use context::{GameOutcome, SessionContext, SessionHost};
pub use player::{Player, Roster, UserRecord};
pub use referee::{Referee, RefereePhase};
pub use targets::DifferenceTargets;
pub use timer::Timer;
pub use variant::{GameKey, GameVariant};

use crate::ws::protocol::HitEvent;

/// Session identifier, unique for the process lifetime
pub type SessionId = u64;

/// Connection handle identifier
pub type ConnId = uuid::Uuid;

/// Difference identifier within one game
pub type DifferenceId = u32;

/// Player input routed to a session
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub session_id: SessionId,
    pub username: String,
    pub action: InputAction,
}

impl PlayerInput {
    pub fn click(session_id: SessionId, username: impl Into<String>, event: HitEvent) -> Self {
        Self {
            session_id,
            username: username.into(),
            action: InputAction::Click(event),
        }
    }
}

/// What the player did
#[derive(Debug, Clone)]
pub enum InputAction {
    /// Hit attempt on a difference
    Click(HitEvent),
}

//! A running session: its players, its preparation and, once built, its referee

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::collab::{AssetStore, HitValidator, StagedAssets};
use crate::config::GameRules;
use crate::error::GameError;
use crate::util::tasks::{ScheduledTasks, TaskKind};
use crate::ws::protocol::{ArenaResponse, ServerMsg};

use super::context::{SessionContext, SessionHost};
use super::referee::{Referee, RefereePhase};
use super::targets::{prepare_for_gameplay, DifferenceTargets};
use super::{
    DifferenceId, GameKey, GameVariant, InputAction, PlayerInput, Roster, SessionId, Timer,
    UserRecord,
};

/// Session lifecycle as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaStatus {
    /// Preparing targets or waiting for players
    Forming,
    /// Everyone is ready, countdown running
    Ready,
    InProgress,
    Finished,
    Cancelled,
}

#[derive(Default)]
struct ArenaInner {
    cancelled: bool,
    referee: Option<Arc<Referee>>,
}

pub struct Arena {
    ctx: Arc<SessionContext>,
    staged: StagedAssets,
    inner: Mutex<ArenaInner>,
}

impl Arena {
    pub fn new(
        id: SessionId,
        key: GameKey,
        users: &[UserRecord],
        staged: StagedAssets,
        rules: GameRules,
        host: Weak<dyn SessionHost>,
        validator: Arc<dyn HitValidator>,
    ) -> Arc<Self> {
        let ctx = SessionContext {
            id,
            key,
            rules,
            roster: Mutex::new(Roster::new(users)),
            timer: Timer::new(),
            tasks: ScheduledTasks::new(),
            host,
            validator,
        };

        Arc::new(Self {
            ctx: Arc::new(ctx),
            staged,
            inner: Mutex::new(ArenaInner::default()),
        })
    }

    pub fn id(&self) -> SessionId {
        self.ctx.id
    }

    pub fn key(&self) -> GameKey {
        self.ctx.key
    }

    pub fn variant(&self) -> GameVariant {
        self.ctx.key.variant
    }

    pub fn players(&self) -> Vec<UserRecord> {
        self.ctx.roster.lock().users()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.ctx.roster.lock().contains(username)
    }

    pub fn referee(&self) -> Option<Arc<Referee>> {
        self.inner.lock().referee.clone()
    }

    pub fn status(&self) -> ArenaStatus {
        let inner = self.inner.lock();
        if inner.cancelled {
            return ArenaStatus::Cancelled;
        }
        match inner.referee.as_ref().map(|r| r.phase()) {
            None | Some(RefereePhase::WaitingForPlayers) => ArenaStatus::Forming,
            Some(RefereePhase::Countdown) => ArenaStatus::Ready,
            Some(RefereePhase::InProgress) => ArenaStatus::InProgress,
            Some(RefereePhase::Finished) => ArenaStatus::Finished,
            Some(RefereePhase::Cancelled) => ArenaStatus::Cancelled,
        }
    }

    /// Fetch the staged assets and build the referee in the background.
    /// A fetch or decode failure cancels the session.
    pub fn start_preparation(self: &Arc<Self>, assets: Arc<dyn AssetStore>) {
        let arena = self.clone();
        self.ctx.tasks.spawn(TaskKind::Preparation, async move {
            match prepare_for_gameplay(&arena.staged, assets.as_ref()).await {
                Ok(targets) => arena.install_referee(Arc::new(targets)),
                Err(e) => {
                    // detached: cancelling aborts this very task
                    tokio::spawn(async move {
                        arena.cancel_game(GameError::AssetFetch(e)).await;
                    });
                }
            }
        });
    }

    /// Build the referee over prepared targets. Ignored once cancelled.
    pub fn install_referee(&self, targets: Arc<DifferenceTargets>) {
        let mut inner = self.inner.lock();
        if inner.cancelled || inner.referee.is_some() {
            return;
        }
        inner.referee = Some(Referee::new(
            self.ctx.clone(),
            targets,
            self.staged.reference_url(),
        ));
        info!(session_id = self.ctx.id, "Referee ready");
    }

    /// Mark a player ready. Returns false if they are not in the session.
    pub fn on_ready(self: &Arc<Self>, username: &str) -> bool {
        let all_ready = {
            let mut roster = self.ctx.roster.lock();
            match roster.get_mut(username) {
                Some(player) => player.set_ready(true),
                None => return false,
            }
            roster.all_ready()
        };
        debug!(session_id = self.ctx.id, username = %username, all_ready, "Player ready");

        if all_ready {
            self.start_when_prepared();
        }
        true
    }

    /// Everyone left is ready: start now or wait for preparation to finish
    fn start_when_prepared(self: &Arc<Self>) {
        match self.referee() {
            Some(referee) => referee.on_players_ready(),
            None => self.wait_for_referee(),
        }
    }

    /// Bounded wait for the referee after everyone is ready
    fn wait_for_referee(self: &Arc<Self>) {
        if self.ctx.tasks.is_pending(TaskKind::ReadyPoll) {
            return;
        }

        let arena = self.clone();
        self.ctx.tasks.spawn(TaskKind::ReadyPoll, async move {
            let rules = &arena.ctx.rules;
            for attempt in 1..=rules.ready_poll_attempts {
                tokio::time::sleep(rules.ready_poll_interval).await;
                if let Some(referee) = arena.referee() {
                    debug!(session_id = arena.ctx.id, attempt, "Referee found");
                    referee.on_players_ready();
                    return;
                }
            }

            let id = arena.ctx.id;
            tokio::spawn(async move {
                arena.cancel_game(GameError::RefereeInitTimeout(id)).await;
            });
        });
    }

    /// Cancel before completion: notify everyone, stop and ask for teardown
    pub async fn cancel_game(&self, reason: GameError) {
        {
            let mut inner = self.inner.lock();
            if inner.cancelled {
                return;
            }
            inner.cancelled = true;
        }

        warn!(session_id = self.ctx.id, reason = %reason, "Game cancelled");
        self.ctx.broadcast(ServerMsg::OnCancelGame {
            arena_id: self.ctx.id,
        });
        self.shutdown();

        if let Some(host) = self.ctx.host() {
            host.teardown(self.ctx.id).await;
        }
    }

    /// Cancel every scheduled task and stop the clock. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.ctx.tasks.cancel_all();
        self.ctx.timer.stop();
        if let Some(referee) = self.referee() {
            referee.cancel();
        }
    }

    /// Route one player input to the referee
    pub async fn on_input(&self, input: PlayerInput) -> ArenaResponse {
        let variant = self.variant();
        let response = match input.action {
            InputAction::Click(event) if event.variant() != variant => {
                debug!(
                    session_id = self.ctx.id,
                    username = %input.username,
                    "Hit event does not match the session variant"
                );
                ArenaResponse::error()
            }
            InputAction::Click(event) => match self.referee() {
                Some(referee) => referee.on_hit(&input.username, event).await,
                None => ArenaResponse::failed_click(),
            },
        };
        response.with_arena_type(variant)
    }

    /// Remove a player. The last one leaving tears the session down; if the
    /// ones left were only waiting on the leaver, the game starts.
    pub async fn remove_player(self: &Arc<Self>, username: &str) -> bool {
        let (now_empty, all_ready) = {
            let mut roster = self.ctx.roster.lock();
            if roster.remove(username).is_none() {
                return false;
            }
            (roster.is_empty(), roster.all_ready())
        };
        info!(session_id = self.ctx.id, username = %username, "Player left");

        if now_empty {
            self.shutdown();
            if let Some(host) = self.ctx.host() {
                host.teardown(self.ctx.id).await;
            }
        } else if all_ready && !self.inner.lock().cancelled {
            self.start_when_prepared();
        }
        true
    }

    /// Target ids not discovered yet; empty before the referee exists
    pub fn remaining_difference_ids(&self) -> Vec<DifferenceId> {
        self.referee()
            .map(|referee| referee.remaining())
            .unwrap_or_default()
    }
}

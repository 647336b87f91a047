//! Per-session referee: countdown, hit validation, scoring and win detection

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::GameError;
use crate::util::tasks::TaskKind;
use crate::ws::protocol::{ArenaResponse, HitConfirmation, HitEvent, HitRequest, Reveal, ServerMsg};

use super::context::{GameOutcome, SessionContext};
use super::targets::DifferenceTargets;
use super::{ConnId, DifferenceId};

/// Referee phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefereePhase {
    /// Waiting for every player to be ready
    WaitingForPlayers,
    /// Counting down before the start
    Countdown,
    /// Accepting hits
    InProgress,
    /// A winner was decided
    Finished,
    /// The session was shut down before finishing
    Cancelled,
}

struct RefereeState {
    phase: RefereePhase,
    discovered: BTreeSet<DifferenceId>,
}

enum Verdict {
    Miss,
    Found {
        reveal: Reveal,
        points: u32,
        finished: bool,
    },
    Stale,
}

pub struct Referee {
    ctx: Arc<SessionContext>,
    targets: Arc<DifferenceTargets>,
    reference_url: String,
    points_to_win: u32,
    state: Mutex<RefereeState>,
}

impl Referee {
    /// Build a referee for the session's current players. The win threshold is
    /// fixed here from the player count.
    pub fn new(
        ctx: Arc<SessionContext>,
        targets: Arc<DifferenceTargets>,
        reference_url: impl Into<String>,
    ) -> Arc<Self> {
        let points_to_win = ctx.rules.points_to_win(ctx.roster.lock().len());

        let weak_ctx = Arc::downgrade(&ctx);
        ctx.timer.subscribe(move |seconds| {
            if let Some(ctx) = weak_ctx.upgrade() {
                ctx.broadcast(ServerMsg::OnTimerUpdate { seconds });
            }
        });

        Arc::new(Self {
            ctx,
            targets,
            reference_url: reference_url.into(),
            points_to_win,
            state: Mutex::new(RefereeState {
                phase: RefereePhase::WaitingForPlayers,
                discovered: BTreeSet::new(),
            }),
        })
    }

    pub fn phase(&self) -> RefereePhase {
        self.state.lock().phase
    }

    pub fn points_to_win(&self) -> u32 {
        self.points_to_win
    }

    pub fn discovered(&self) -> Vec<DifferenceId> {
        self.state.lock().discovered.iter().copied().collect()
    }

    /// Target ids not discovered yet
    pub fn remaining(&self) -> Vec<DifferenceId> {
        let state = self.state.lock();
        self.targets
            .ids()
            .filter(|id| !state.discovered.contains(id))
            .collect()
    }

    /// Every player is ready: start the countdown. Ignored outside
    /// `WaitingForPlayers`, so a reconnecting player cannot restart it.
    pub fn on_players_ready(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.phase != RefereePhase::WaitingForPlayers {
                debug!(session_id = self.ctx.id, phase = ?state.phase, "Ready signal ignored");
                return;
            }
            state.phase = RefereePhase::Countdown;
        }

        info!(session_id = self.ctx.id, "Countdown started");
        let referee = self.clone();
        self.ctx
            .tasks
            .spawn(TaskKind::Countdown, async move { referee.run_countdown().await });
    }

    async fn run_countdown(&self) {
        let step = self.ctx.rules.countdown_step;
        for count in (0..=self.ctx.rules.countdown_start).rev() {
            tokio::time::sleep(step).await;
            self.ctx.broadcast(ServerMsg::OnCountdown { count });
        }
        tokio::time::sleep(step).await;

        {
            let mut state = self.state.lock();
            if state.phase != RefereePhase::Countdown {
                return;
            }
            state.phase = RefereePhase::InProgress;
        }

        self.ctx.broadcast(ServerMsg::OnGameStarted);
        self.ctx.timer.start();
        info!(session_id = self.ctx.id, "Game started");
    }

    /// Judge one hit attempt.
    ///
    /// Concurrent hits are validated in parallel; the first confirmation to
    /// come back claims the difference.
    pub async fn on_hit(self: &Arc<Self>, username: &str, event: HitEvent) -> ArenaResponse {
        if self.phase() != RefereePhase::InProgress {
            return ArenaResponse::failed_click();
        }

        let connection_id = {
            let roster = self.ctx.roster.lock();
            match roster.get(username) {
                None => return ArenaResponse::failed_click(),
                Some(player) if player.is_penalized() => return ArenaResponse::penalty(),
                Some(player) => player.connection_id(),
            }
        };

        let request = HitRequest {
            event_info: event,
            asset_reference_url: self.reference_url.clone(),
            ignored_color: self.ctx.rules.ignored_color,
        };

        let confirmation = match self.ctx.validator.validate(self.ctx.key.variant, &request).await {
            Ok(confirmation) => confirmation,
            Err(e) => {
                let e = GameError::ValidationService(e);
                warn!(
                    session_id = self.ctx.id,
                    username = %username,
                    error = %e,
                    "Hit rejected"
                );
                return ArenaResponse::error();
            }
        };

        self.on_confirmation(username, connection_id, confirmation)
            .await
    }

    async fn on_confirmation(
        self: &Arc<Self>,
        username: &str,
        connection_id: ConnId,
        confirmation: HitConfirmation,
    ) -> ArenaResponse {
        let verdict = self.judge(username, confirmation);

        match verdict {
            Verdict::Stale => ArenaResponse::failed_click(),
            Verdict::Miss => {
                self.impose_penalty(username, connection_id);
                ArenaResponse::failed_click()
            }
            Verdict::Found {
                reveal,
                points,
                finished,
            } => {
                self.ctx
                    .send(connection_id, ServerMsg::OnPointAdded { points });
                debug!(
                    session_id = self.ctx.id,
                    username = %username,
                    difference = confirmation.matched_difference_id,
                    points,
                    "Difference found"
                );

                if finished {
                    self.end_of_game(username).await;
                }

                ArenaResponse::success(reveal)
            }
        }
    }

    /// Apply a validator verdict to the shared state in one critical section
    fn judge(&self, username: &str, confirmation: HitConfirmation) -> Verdict {
        let mut state = self.state.lock();
        if state.phase != RefereePhase::InProgress {
            return Verdict::Stale;
        }

        let id = confirmation.matched_difference_id;
        let reveal = match self.targets.get(id) {
            Some(reveal) if confirmation.is_hit && !state.discovered.contains(&id) => reveal.clone(),
            _ => return Verdict::Miss,
        };

        let mut roster = self.ctx.roster.lock();
        let Some(player) = roster.get_mut(username) else {
            return Verdict::Stale;
        };

        state.discovered.insert(id);
        let points = player.add_points(1);
        let finished =
            points >= self.points_to_win || state.discovered.len() >= self.targets.len();
        if finished {
            state.phase = RefereePhase::Finished;
        }

        Verdict::Found {
            reveal,
            points,
            finished,
        }
    }

    fn impose_penalty(&self, username: &str, connection_id: ConnId) {
        match self.ctx.roster.lock().get_mut(username) {
            Some(player) => player.set_penalized(true),
            None => return,
        }

        let arena_type = self.ctx.key.variant;
        self.ctx.send(
            connection_id,
            ServerMsg::OnPenalty {
                is_on_penalty: true,
                arena_type,
            },
        );
        debug!(session_id = self.ctx.id, username = %username, "Penalty imposed");

        let ctx = self.ctx.clone();
        let username = username.to_string();
        self.ctx.tasks.spawn(TaskKind::Penalty, async move {
            tokio::time::sleep(ctx.rules.penalty).await;
            if let Some(player) = ctx.roster.lock().get_mut(&username) {
                player.set_penalized(false);
            }
            ctx.send(
                connection_id,
                ServerMsg::OnPenalty {
                    is_on_penalty: false,
                    arena_type,
                },
            );
        });
    }

    async fn end_of_game(&self, winner: &str) {
        let elapsed_seconds = self.ctx.timer.stop();
        let player_count = self.ctx.roster.lock().len();
        info!(
            session_id = self.ctx.id,
            winner = %winner,
            elapsed_seconds,
            "Game finished"
        );

        if let Some(host) = self.ctx.host() {
            host.end_of_game(
                self.ctx.id,
                GameOutcome {
                    winner: winner.to_string(),
                    elapsed_seconds,
                    player_count,
                },
            )
            .await;
        }
    }

    /// Stop refereeing. A finished game stays finished.
    pub fn cancel(&self) {
        {
            let mut state = self.state.lock();
            if state.phase != RefereePhase::Finished {
                state.phase = RefereePhase::Cancelled;
            }
        }
        self.ctx.tasks.cancel(TaskKind::Countdown);
    }
}

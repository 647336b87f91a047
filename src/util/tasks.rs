//! Cancellable scheduled tasks owned by a single session

use std::future::Future;

use parking_lot::Mutex;
use tokio::task::AbortHandle;

/// What a scheduled task is doing, so one kind can be cancelled on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Fetching and building the difference targets
    Preparation,
    /// Bounded wait for the referee after all players are ready
    ReadyPoll,
    /// 3..0 countdown before the game starts
    Countdown,
    /// Delayed penalty clear
    Penalty,
}

#[derive(Default)]
struct TasksInner {
    closed: bool,
    tasks: Vec<(TaskKind, AbortHandle)>,
}

/// Set of spawned tasks that can be positively cancelled.
///
/// Once [`ScheduledTasks::cancel_all`] has run the set is closed and refuses
/// new work, so nothing can be scheduled for a session after its teardown.
#[derive(Default)]
pub struct ScheduledTasks {
    inner: Mutex<TasksInner>,
}

impl ScheduledTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` on the runtime and keep its abort handle.
    /// Returns false (and drops `fut`) if the set is already closed.
    pub fn spawn<F>(&self, kind: TaskKind, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }

        inner.tasks.retain(|(_, handle)| !handle.is_finished());
        let handle = tokio::spawn(fut);
        inner.tasks.push((kind, handle.abort_handle()));
        true
    }

    /// Abort every pending task of one kind
    pub fn cancel(&self, kind: TaskKind) -> usize {
        let mut inner = self.inner.lock();
        let mut cancelled = 0;
        inner.tasks.retain(|(k, handle)| {
            if *k == kind {
                if !handle.is_finished() {
                    handle.abort();
                    cancelled += 1;
                }
                false
            } else {
                true
            }
        });
        cancelled
    }

    /// Whether a task of this kind is still running
    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.inner
            .lock()
            .tasks
            .iter()
            .any(|(k, handle)| *k == kind && !handle.is_finished())
    }

    /// Number of tasks still running
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .tasks
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .count()
    }

    /// Abort everything and close the set. Safe to call repeatedly.
    pub fn cancel_all(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        for (_, handle) in inner.tasks.drain(..) {
            handle.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs() {
        let tasks = ScheduledTasks::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = fired.clone();
        assert!(tasks.spawn(TaskKind::Penalty, async move {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            flag.store(true, Ordering::SeqCst);
        }));
        assert!(tasks.is_pending(TaskKind::Penalty));

        assert_eq!(tasks.cancel(TaskKind::Penalty), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!fired.load(Ordering::SeqCst));
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_set_refuses_new_tasks() {
        let tasks = ScheduledTasks::new();
        tasks.spawn(TaskKind::Countdown, std::future::pending());
        tasks.spawn(TaskKind::ReadyPoll, std::future::pending());
        assert_eq!(tasks.pending(), 2);

        tasks.cancel_all();
        tasks.cancel_all();
        tokio::task::yield_now().await;

        assert!(tasks.is_closed());
        assert_eq!(tasks.pending(), 0);
        assert!(!tasks.spawn(TaskKind::Penalty, async {}));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_only_touches_one_kind() {
        let tasks = ScheduledTasks::new();
        tasks.spawn(TaskKind::Countdown, std::future::pending());
        tasks.spawn(TaskKind::Penalty, std::future::pending());

        tasks.cancel(TaskKind::Countdown);
        tokio::task::yield_now().await;

        assert!(!tasks.is_pending(TaskKind::Countdown));
        assert!(tasks.is_pending(TaskKind::Penalty));
    }
}

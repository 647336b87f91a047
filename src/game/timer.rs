//! Elapsed-time ticker for a running game

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant};

type TickCallback = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct TimerState {
    started_at: Option<Instant>,
    /// Final value, frozen by the first `stop`
    stopped_secs: Option<u64>,
    ticker: Option<AbortHandle>,
    subscribers: Vec<TickCallback>,
}

impl TimerState {
    fn elapsed_secs(&self) -> u64 {
        match (self.stopped_secs, self.started_at) {
            (Some(secs), _) => secs,
            (None, Some(start)) => start.elapsed().as_secs(),
            (None, None) => 0,
        }
    }
}

/// Emits the elapsed seconds to its subscribers once per tick.
/// Clones share the same clock.
#[derive(Clone)]
pub struct Timer {
    state: Arc<Mutex<TimerState>>,
    tick: Duration,
}

impl Timer {
    pub fn new() -> Self {
        Self::with_tick(Duration::from_secs(1))
    }

    pub fn with_tick(tick: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::default())),
            tick,
        }
    }

    /// Register a tick callback. Callbacks are dropped with the timer.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.state.lock().subscribers.push(Arc::new(callback));
    }

    /// Start ticking. No-op if already started or stopped.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.started_at.is_some() || state.stopped_secs.is_some() {
            return;
        }

        let now = Instant::now();
        state.started_at = Some(now);

        let weak: Weak<Mutex<TimerState>> = Arc::downgrade(&self.state);
        let tick = self.tick;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(now + tick, tick);
            loop {
                ticker.tick().await;
                let Some(state) = weak.upgrade() else {
                    break;
                };
                let (elapsed, subscribers) = {
                    let state = state.lock();
                    (state.elapsed_secs(), state.subscribers.clone())
                };
                for callback in subscribers {
                    callback(elapsed);
                }
            }
        });
        state.ticker = Some(handle.abort_handle());
    }

    /// Stop ticking and return the final elapsed seconds. Repeated calls
    /// return the same value.
    pub fn stop(&self) -> u64 {
        let mut state = self.state.lock();
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        let elapsed = state.elapsed_secs();
        state.stopped_secs = Some(elapsed);
        elapsed
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.state.lock().elapsed_secs()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    pub fn is_running(&self) -> bool {
        let state = self.state.lock();
        state.started_at.is_some() && state.stopped_secs.is_none()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

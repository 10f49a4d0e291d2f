//! Cooperative timers.
//!
//! Timers never run session code themselves. When one fires it posts
//! [`Input::Timer`] to the session inbox, so timer callbacks are processed in
//! the same single consumer loop as stream events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tracing::trace;

use beaty_core::types::SessionId;

use crate::input::Input;

/// Shortest period a periodic timer runs at. A zero period is raised to it.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Periodic typewriter tick for one engine generation. `arm` counts how
    /// many times ticking was started, so a tick queued before a pause is
    /// told apart from the ticks of the resumed run.
    RevealTick { generation: u32, arm: u32 },
    /// Upper bound on waiting for a camera settle signal.
    SettleTimeout { animation: u32 },
    /// Hides a floating bubble once the response has finished.
    AutoDismiss,
}

/// A timer is identified by its session and purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub session: SessionId,
    pub kind: TimerKind,
}

impl TimerKey {
    pub fn new(session: SessionId, kind: TimerKind) -> Self {
        Self { session, kind }
    }
}

/// Arms and cancels timers. Scheduling a key that is already armed replaces it.
pub trait Scheduler: Send {
    fn schedule_once(&mut self, key: TimerKey, after: Duration);

    fn schedule_every(&mut self, key: TimerKey, period: Duration);

    /// Disarm `key`. A no-op if it is not armed.
    fn cancel(&mut self, key: &TimerKey);

    /// Disarm every timer of `session`.
    fn cancel_session(&mut self, session: SessionId);
}

// =============================================================================
// Tokio
// =============================================================================

/// Scheduler backed by spawned tokio tasks. Must be used inside a runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    inbox: UnboundedSender<Input>,
    tasks: HashMap<TimerKey, AbortHandle>,
}

impl TokioScheduler {
    pub fn new(inbox: UnboundedSender<Input>) -> Self {
        Self {
            inbox,
            tasks: HashMap::new(),
        }
    }

    pub fn armed(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    fn track(&mut self, key: TimerKey, handle: AbortHandle) {
        self.tasks.retain(|_, h| !h.is_finished());
        if let Some(previous) = self.tasks.insert(key, handle) {
            previous.abort();
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&mut self, key: TimerKey, after: Duration) {
        let inbox = self.inbox.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if inbox.send(Input::Timer(key)).is_err() {
                trace!(?key, "inbox closed before timer fired");
            }
        });
        self.track(key, task.abort_handle());
    }

    fn schedule_every(&mut self, key: TimerKey, period: Duration) {
        // `interval_at` panics on a zero period.
        let period = period.max(MIN_PERIOD);
        let inbox = self.inbox.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if inbox.send(Input::Timer(key)).is_err() {
                    break;
                }
            }
        });
        self.track(key, task.abort_handle());
    }

    fn cancel(&mut self, key: &TimerKey) {
        if let Some(handle) = self.tasks.remove(key) {
            handle.abort();
        }
    }

    fn cancel_session(&mut self, session: SessionId) {
        self.tasks.retain(|key, handle| {
            if key.session == session {
                handle.abort();
                false
            } else {
                true
            }
        });
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
    }
}

// =============================================================================
// Manual
// =============================================================================

#[derive(Debug, Clone)]
struct Armed {
    due: Duration,
    period: Option<Duration>,
    /// Arm order, breaks ties between timers due at the same instant.
    seq: u64,
}

#[derive(Debug, Default)]
struct Clock {
    now: Duration,
    seq: u64,
    armed: HashMap<TimerKey, Armed>,
}

/// Deterministic scheduler on a virtual clock.
///
/// Clones share the same clock, so a test keeps one handle while the session
/// layer owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<Clock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.lock().armed.contains_key(key)
    }

    pub fn armed(&self) -> Vec<TimerKey> {
        let clock = self.lock();
        let mut keys: Vec<_> = clock.armed.iter().map(|(k, a)| (a.due, a.seq, *k)).collect();
        keys.sort_by_key(|(due, seq, _)| (*due, *seq));
        keys.into_iter().map(|(_, _, k)| k).collect()
    }

    /// Advance the clock by `by`, handing every timer that falls due to
    /// `fire` one at a time, in due order.
    ///
    /// The clock is unlocked while `fire` runs, so it may arm or cancel
    /// timers; a timer cancelled by an earlier firing never fires.
    pub fn advance(&self, by: Duration, mut fire: impl FnMut(TimerKey)) {
        let deadline = self.lock().now + by;
        while let Some(key) = self.pop_due(deadline) {
            fire(key);
        }
        let mut clock = self.lock();
        clock.now = clock.now.max(deadline);
    }

    fn pop_due(&self, deadline: Duration) -> Option<TimerKey> {
        let mut clock = self.lock();
        let (key, armed) = clock
            .armed
            .iter()
            .filter(|(_, a)| a.due <= deadline)
            .min_by_key(|(_, a)| (a.due, a.seq))
            .map(|(k, a)| (*k, a.clone()))?;

        clock.now = armed.due;
        match armed.period {
            Some(period) => {
                clock.seq += 1;
                let seq = clock.seq;
                clock.armed.insert(
                    key,
                    Armed {
                        due: armed.due + period,
                        period: Some(period),
                        seq,
                    },
                );
            }
            None => {
                clock.armed.remove(&key);
            }
        }
        Some(key)
    }

    fn arm(&self, key: TimerKey, after: Duration, period: Option<Duration>) {
        let mut clock = self.lock();
        clock.seq += 1;
        let armed = Armed {
            due: clock.now + after,
            period,
            seq: clock.seq,
        };
        clock.armed.insert(key, armed);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&mut self, key: TimerKey, after: Duration) {
        self.arm(key, after, None);
    }

    fn schedule_every(&mut self, key: TimerKey, period: Duration) {
        // A zero period would fire forever within one `advance`.
        let period = period.max(MIN_PERIOD);
        self.arm(key, period, Some(period));
    }

    fn cancel(&mut self, key: &TimerKey) {
        self.lock().armed.remove(key);
    }

    fn cancel_session(&mut self, session: SessionId) {
        self.lock().armed.retain(|key, _| key.session != session);
    }
}

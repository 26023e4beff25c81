//! Playback timers: cancellable repeating tasks.
//!
//! RULE: After `cancel(handle)` returns, `handle` never fires again.
//! The engine only ever holds one live handle; starting a new timer is
//! always preceded by cancelling the old one.

use std::collections::BTreeMap;
use std::time::Duration;

/// Smallest period a timer may run at. Guards against a zero period
/// spinning the clock forever.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Opaque handle to a scheduled repeating task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The host's timer facility.
///
/// The scheduler does not call back into the engine itself: the host loop
/// receives due handles and forwards them to `ReplayEngine::on_timer`, which
/// keeps every callback on the single thread of control.
pub trait TimerScheduler {
    /// Start firing every `period` from now on.
    fn start_repeating(&mut self, period: Duration) -> TimerHandle;

    /// Stop a timer. Unknown or already cancelled handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug, Clone)]
struct Timer {
    period:   Duration,
    next_due: Duration,
}

/// Deterministic scheduler driven by explicit time advancement.
///
/// Used by tests and by the headless runner. Firings are handed out one at a
/// time so a cancellation made while handling one firing suppresses every
/// later one.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now:     Duration,
    next_id: u64,
    timers:  BTreeMap<u64, Timer>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn period_of(&self, handle: TimerHandle) -> Option<Duration> {
        self.timers.get(&handle.0).map(|t| t.period)
    }

    /// When the earliest live timer fires next.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.values().map(|t| t.next_due).min()
    }

    /// Pop the earliest firing due at or before `deadline`, moving `now` to
    /// its due time. Ties go to the older handle.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<TimerHandle> {
        let (id, due) = self
            .timers
            .iter()
            .filter(|(_, t)| t.next_due <= deadline)
            .min_by_key(|(id, t)| (t.next_due, **id))
            .map(|(id, t)| (*id, t.next_due))?;

        if let Some(timer) = self.timers.get_mut(&id) {
            timer.next_due = due + timer.period;
        }
        self.now = self.now.max(due);
        Some(TimerHandle(id))
    }

    /// Move `now` forward without firing anything.
    pub fn settle(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }
}

impl TimerScheduler for VirtualClock {
    fn start_repeating(&mut self, period: Duration) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        let id = self.next_id;
        self.next_id += 1;
        self.timers.insert(
            id,
            Timer {
                period,
                next_due: self.now + period,
            },
        );
        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle.0);
    }
}

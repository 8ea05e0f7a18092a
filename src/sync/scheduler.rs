use std::time::{Duration, Instant};

use tracing::debug;

/// Whether periodic fetching should run, derived from explicit signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerState {
    pub active: bool,
}

impl SchedulerState {
    /// Active while someone is present and the view is on screen
    pub fn from_signals(user_present: bool, hidden: bool) -> Self {
        SchedulerState {
            active: user_present && !hidden,
        }
    }
}

impl Default for SchedulerState {
    fn default() -> Self {
        SchedulerState { active: true }
    }
}

/// Interval timer for fetch cycles. Callers pass `now` in, so nothing here
/// reads the clock.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    state: SchedulerState,
    next_due: Option<Instant>,
}

impl Scheduler {
    /// An active scheduler is due immediately
    pub fn new(interval: Duration, state: SchedulerState, now: Instant) -> Self {
        Scheduler {
            interval,
            state,
            next_due: state.active.then_some(now),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Apply a new state. Returns true when the caller should fetch right
    /// away (the scheduler just became active); the interval is re-armed
    /// from `now`. Going inactive disarms the timer.
    pub fn on_state_change(&mut self, state: SchedulerState, now: Instant) -> bool {
        let was_active = self.state.active;
        self.state = state;
        match (was_active, state.active) {
            (false, true) => {
                debug!(interval_secs = self.interval.as_secs(), "scheduler resumed");
                self.next_due = Some(now + self.interval);
                true
            }
            (true, false) => {
                debug!("scheduler paused");
                self.next_due = None;
                false
            }
            _ => false,
        }
    }

    /// True when a fetch is due; re-arms the interval from `now`
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    /// Time left until the next fetch, `None` while paused
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn state_from_signals() {
        assert!(SchedulerState::from_signals(true, false).active);
        assert!(!SchedulerState::from_signals(false, false).active);
        assert!(!SchedulerState::from_signals(true, true).active);
    }

    #[test]
    fn active_scheduler_fires_then_waits_an_interval() {
        let t0 = Instant::now();
        let mut s = Scheduler::new(MINUTE, SchedulerState::default(), t0);
        assert!(s.poll(t0));
        assert!(!s.poll(t0 + Duration::from_secs(30)));
        assert!(s.poll(t0 + MINUTE));
        assert_eq!(s.time_until_next(t0 + MINUTE), Some(MINUTE));
    }

    #[test]
    fn pausing_disarms_and_resuming_fetches_immediately() {
        let t0 = Instant::now();
        let mut s = Scheduler::new(MINUTE, SchedulerState::default(), t0);
        assert!(s.poll(t0));

        assert!(!s.on_state_change(SchedulerState { active: false }, t0));
        assert!(!s.poll(t0 + 10 * MINUTE));
        assert_eq!(s.time_until_next(t0), None);

        let later = t0 + 11 * MINUTE;
        assert!(s.on_state_change(SchedulerState { active: true }, later));
        assert!(!s.poll(later));
        assert!(s.poll(later + MINUTE));
    }

    #[test]
    fn repeated_state_is_a_no_op() {
        let t0 = Instant::now();
        let mut s = Scheduler::new(MINUTE, SchedulerState { active: false }, t0);
        assert!(!s.poll(t0));
        assert!(!s.on_state_change(SchedulerState { active: false }, t0));
        assert!(s.on_state_change(SchedulerState { active: true }, t0));
        assert!(!s.on_state_change(SchedulerState { active: true }, t0));
    }
}

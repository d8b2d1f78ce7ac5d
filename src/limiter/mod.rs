// ============================================================================
// Rate Limiter
// ============================================================================
//
// Sliding windows over observation instants. The instant is always passed
// in by the caller, so windows roll continuously instead of snapping to
// wall-clock minute boundaries and every path is testable with fabricated
// instants.
//
// A breached check never records the rejected hit; only admitted calls
// consume budget.
// ============================================================================

use log::warn;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::core::{LearnerId, Result, RuntimeError};

/// Rolling count of hits inside a fixed-length window.
#[derive(Debug)]
pub struct SlidingWindow {
    window: Duration,
    hits: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            hits: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.hits.front() {
            if now.duration_since(*front) >= self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    /// Hits still inside the window as of `now`.
    pub fn count(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.hits.len()
    }

    pub fn record(&mut self, now: Instant) {
        self.prune(now);
        self.hits.push_back(now);
    }
}

/// How an action is classified against the per-session windows.
///
/// `setvalue` and `commit` consume their own tighter budget in addition to
/// the general one. Terminate counts into the windows but is never
/// rejected: the final blocking commit must stay reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    Generic,
    SetValue,
    Commit,
    Exempt,
}

/// Per-session thresholds, all counted inside one rolling window.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub window: Duration,
    pub max_calls: usize,
    pub max_setvalue: usize,
    pub max_commit: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_calls: 120,
            max_setvalue: 60,
            max_commit: 20,
        }
    }
}

/// The three per-session counters guarding one runtime session.
#[derive(Debug)]
pub struct SessionWindows {
    limits: SessionLimits,
    calls: SlidingWindow,
    setvalue: SlidingWindow,
    commit: SlidingWindow,
}

impl SessionWindows {
    pub fn new(limits: SessionLimits) -> Self {
        let window = limits.window;
        Self {
            limits,
            calls: SlidingWindow::new(window),
            setvalue: SlidingWindow::new(window),
            commit: SlidingWindow::new(window),
        }
    }

    /// Admit or reject an action as of `now`.
    ///
    /// All applicable thresholds are checked before anything is recorded,
    /// so a rejection leaves every counter untouched.
    pub fn admit(&mut self, class: ActionClass, now: Instant) -> Result<()> {
        if class != ActionClass::Exempt {
            if self.calls.count(now) >= self.limits.max_calls {
                return Err(RuntimeError::RateLimit(
                    "session call budget exhausted".to_string(),
                ));
            }
            if class == ActionClass::SetValue
                && self.setvalue.count(now) >= self.limits.max_setvalue
            {
                return Err(RuntimeError::RateLimit(
                    "session setvalue budget exhausted".to_string(),
                ));
            }
            if class == ActionClass::Commit && self.commit.count(now) >= self.limits.max_commit {
                return Err(RuntimeError::RateLimit(
                    "session commit budget exhausted".to_string(),
                ));
            }
        }

        self.calls.record(now);
        match class {
            ActionClass::SetValue => self.setvalue.record(now),
            ActionClass::Commit => self.commit.record(now),
            _ => {}
        }
        Ok(())
    }

    /// Calls admitted inside the current window.
    pub fn recent_calls(&mut self, now: Instant) -> usize {
        self.calls.count(now)
    }
}

/// Global per-caller window, checked before any session-specific logic.
pub struct CallerLimiter {
    window: Duration,
    max_calls: usize,
    windows: Mutex<HashMap<LearnerId, SlidingWindow>>,
}

impl CallerLimiter {
    pub fn new(window: Duration, max_calls: usize) -> Self {
        Self {
            window,
            max_calls,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub async fn admit(&self, caller: LearnerId, now: Instant) -> Result<()> {
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry(caller)
            .or_insert_with(|| SlidingWindow::new(self.window));

        if window.count(now) >= self.max_calls {
            warn!("caller {caller} exceeded {} calls per window", self.max_calls);
            return Err(RuntimeError::RateLimit(
                "caller call budget exhausted".to_string(),
            ));
        }
        window.record(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_calls: usize, max_setvalue: usize, max_commit: usize) -> SessionLimits {
        SessionLimits {
            window: Duration::from_secs(60),
            max_calls,
            max_setvalue,
            max_commit,
        }
    }

    #[test]
    fn test_window_rolls_over() {
        let mut window = SlidingWindow::new(Duration::from_secs(60));
        let start = Instant::now();

        window.record(start);
        window.record(start + Duration::from_secs(10));
        assert_eq!(window.count(start + Duration::from_secs(30)), 2);

        // First hit ages out, second survives
        assert_eq!(window.count(start + Duration::from_secs(65)), 1);
        assert_eq!(window.count(start + Duration::from_secs(120)), 0);
    }

    #[test]
    fn test_breach_does_not_consume_budget() {
        let mut windows = SessionWindows::new(limits(2, 2, 2));
        let start = Instant::now();

        windows.admit(ActionClass::Generic, start).unwrap();
        windows.admit(ActionClass::Generic, start).unwrap();

        // Two rejections in a row: counters unchanged by the first rejection
        assert!(windows.admit(ActionClass::Generic, start).is_err());
        assert!(windows.admit(ActionClass::Generic, start).is_err());
        assert_eq!(windows.recent_calls(start), 2);

        // After the window passes, calls are admitted again
        let later = start + Duration::from_secs(61);
        assert!(windows.admit(ActionClass::Generic, later).is_ok());
    }

    #[test]
    fn test_setvalue_budget_is_subset_of_general() {
        let mut windows = SessionWindows::new(limits(10, 2, 10));
        let start = Instant::now();

        windows.admit(ActionClass::SetValue, start).unwrap();
        windows.admit(ActionClass::SetValue, start).unwrap();
        assert!(windows.admit(ActionClass::SetValue, start).is_err());

        // Generic calls still fit; setvalue consumed general budget too
        assert!(windows.admit(ActionClass::Generic, start).is_ok());
        assert_eq!(windows.recent_calls(start), 3);
    }

    #[test]
    fn test_commit_budget_independent_of_setvalue() {
        let mut windows = SessionWindows::new(limits(10, 1, 1));
        let start = Instant::now();

        windows.admit(ActionClass::SetValue, start).unwrap();
        windows.admit(ActionClass::Commit, start).unwrap();
        assert!(windows.admit(ActionClass::Commit, start).is_err());
        assert!(windows.admit(ActionClass::SetValue, start).is_err());
        assert!(windows.admit(ActionClass::Generic, start).is_ok());
    }

    #[test]
    fn test_exempt_class_never_rejected() {
        let mut windows = SessionWindows::new(limits(1, 1, 1));
        let start = Instant::now();

        windows.admit(ActionClass::Generic, start).unwrap();
        // General budget is gone, exempt still passes and is counted
        assert!(windows.admit(ActionClass::Exempt, start).is_ok());
        assert_eq!(windows.recent_calls(start), 2);
    }

    #[tokio::test]
    async fn test_caller_limiter_scopes_by_caller() {
        let limiter = CallerLimiter::new(Duration::from_secs(60), 2);
        let now = Instant::now();
        let alice = uuid::Uuid::new_v4();
        let bob = uuid::Uuid::new_v4();

        limiter.admit(alice, now).await.unwrap();
        limiter.admit(alice, now).await.unwrap();
        assert!(limiter.admit(alice, now).await.is_err());

        // Bob has his own budget
        assert!(limiter.admit(bob, now).await.is_ok());

        // Alice recovers after the window rolls
        let later = now + Duration::from_secs(61);
        assert!(limiter.admit(alice, later).await.is_ok());
    }
}

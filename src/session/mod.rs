// ============================================================================
// Runtime Session
// ============================================================================
//
// In-process state of one content-object launch. Lifecycle:
//
// ```text
// Uninitialized ──initialize──> Initialized ──terminate──> Terminated
// ```
//
// Uninitialized means "no record in the registry"; Terminated sessions are
// removed from the registry and reject everything.
// ============================================================================

pub mod registry;

pub use registry::{SessionHandle, SessionRegistry};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::core::{
    DataModel, DialectKind, EntryMode, LaunchContext, Result, RuntimeError, SessionKey,
};
use crate::dialect::{DialectStrategy, sanitize_value, strategy_for};
use crate::limiter::{ActionClass, SessionLimits, SessionWindows};
use crate::persist::CommitSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Accepting reads, writes and commits.
    Initialized,
    /// Terminal; the session is gone from the registry.
    Terminated,
}

impl SessionPhase {
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized)
    }
}

pub struct RuntimeSession {
    key: SessionKey,
    dialect: DialectKind,
    phase: SessionPhase,
    entry_mode: EntryMode,
    context: LaunchContext,
    data: DataModel,
    windows: SessionWindows,
    started_at_wall: DateTime<Utc>,
    started_at: Instant,
    last_activity: Instant,
    accepted_calls: u64,
}

/// Diagnostic view of a live session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub phase: SessionPhase,
    pub dialect: DialectKind,
    pub entry_mode: EntryMode,
    pub accepted_calls: u64,
    pub uptime_secs: u64,
    pub idle_secs: u64,
    pub element_count: usize,
}

impl RuntimeSession {
    /// Start a session, seeding the data model from a prior commit on resume.
    ///
    /// The entry indicator is written into the data model under the
    /// dialect's read-only entry element; content can read it back but
    /// never overwrite it.
    pub fn start(
        key: SessionKey,
        dialect: DialectKind,
        context: LaunchContext,
        entry_mode: EntryMode,
        seed: Option<DataModel>,
        limits: SessionLimits,
        now: Instant,
    ) -> Self {
        let strategy = strategy_for(dialect);
        let mut data = seed.unwrap_or_default();
        data.insert(
            strategy.entry_element().to_string(),
            entry_mode.as_str().to_string(),
        );

        Self {
            key,
            dialect,
            phase: SessionPhase::Initialized,
            entry_mode,
            context,
            data,
            windows: SessionWindows::new(limits),
            started_at_wall: Utc::now(),
            started_at: now,
            last_activity: now,
            accepted_calls: 0,
        }
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn entry_mode(&self) -> EntryMode {
        self.entry_mode
    }

    pub fn context(&self) -> &LaunchContext {
        &self.context
    }

    pub fn data_model(&self) -> &DataModel {
        &self.data
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.phase.is_initialized() {
            return Err(RuntimeError::SessionState(format!(
                "session {} is terminated",
                self.key
            )));
        }
        Ok(())
    }

    /// Count the action against the per-session windows.
    ///
    /// A breach leaves counters, activity timestamps and the data model
    /// untouched.
    pub fn admit(&mut self, class: ActionClass, now: Instant) -> Result<()> {
        self.windows.admit(class, now)?;
        self.last_activity = now;
        self.accepted_calls += 1;
        Ok(())
    }

    /// Resolve an element: synthesized values first, then the data model,
    /// defaulting to the empty string for recognized-but-unset elements.
    pub fn get_value(&self, element: &str) -> Result<String> {
        let strategy = strategy_for(self.dialect);
        if let Some(value) = strategy.synthetic_read(element, &self.context) {
            return Ok(value);
        }
        if !strategy.recognizes(element) {
            return Err(RuntimeError::validation(element, "unknown element"));
        }
        Ok(self.data.get(element).cloned().unwrap_or_default())
    }

    /// Sanitize, validate and store a value. Returns the stored form.
    pub fn set_value(&mut self, element: &str, raw: &str) -> Result<String> {
        let strategy = strategy_for(self.dialect);
        let value = sanitize_value(raw);
        strategy.validate(element, &value)?;
        self.data.insert(element.to_string(), value.clone());
        Ok(value)
    }

    pub fn terminate(&mut self) {
        self.phase = SessionPhase::Terminated;
    }

    pub fn duration_secs(&self, now: Instant) -> u64 {
        now.duration_since(self.started_at).as_secs()
    }

    /// Full snapshot for the persister. Terminal snapshots carry the
    /// termination timestamp so the store can stamp it atomically.
    pub fn snapshot(&self, now: Instant, terminal: bool) -> CommitSnapshot {
        let committed_at = Utc::now();
        CommitSnapshot {
            key: self.key,
            dialect: self.dialect,
            entry_mode: self.entry_mode,
            data_model: self.data.clone(),
            committed_at,
            terminated_at: terminal.then_some(committed_at),
            call_count: self.accepted_calls,
            duration_secs: self.duration_secs(now),
        }
    }

    pub fn metrics(&self, now: Instant) -> SessionMetrics {
        SessionMetrics {
            phase: self.phase,
            dialect: self.dialect,
            entry_mode: self.entry_mode,
            accepted_calls: self.accepted_calls,
            uptime_secs: self.duration_secs(now),
            idle_secs: now.duration_since(self.last_activity).as_secs(),
            element_count: self.data.len(),
        }
    }

    pub fn started_at_wall(&self) -> DateTime<Utc> {
        self.started_at_wall
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CreditMode, LaunchMode};
    use uuid::Uuid;

    fn session(dialect: DialectKind, entry_mode: EntryMode, seed: Option<DataModel>) -> RuntimeSession {
        RuntimeSession::start(
            SessionKey::new(Uuid::new_v4(), Uuid::new_v4()),
            dialect,
            LaunchContext {
                learner_id: Uuid::new_v4(),
                learner_name: "Test Learner".to_string(),
                credit: CreditMode::Credit,
                mode: LaunchMode::Normal,
            },
            entry_mode,
            seed,
            SessionLimits::default(),
            Instant::now(),
        )
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let mut s = session(DialectKind::Scorm12, EntryMode::AbInitio, None);
        s.set_value("cmi.core.lesson_status", "completed").unwrap();
        assert_eq!(s.get_value("cmi.core.lesson_status").unwrap(), "completed");
    }

    #[test]
    fn test_rejected_write_leaves_data_untouched() {
        let mut s = session(DialectKind::Scorm12, EntryMode::AbInitio, None);
        s.set_value("cmi.core.lesson_status", "completed").unwrap();
        assert!(s.set_value("cmi.core.lesson_status", "done").is_err());
        assert_eq!(s.get_value("cmi.core.lesson_status").unwrap(), "completed");
    }

    #[test]
    fn test_unset_recognized_element_reads_empty() {
        let s = session(DialectKind::Scorm2004, EntryMode::AbInitio, None);
        assert_eq!(s.get_value("cmi.suspend_data").unwrap(), "");
    }

    #[test]
    fn test_unknown_element_read_rejected() {
        let s = session(DialectKind::Scorm2004, EntryMode::AbInitio, None);
        assert!(s.get_value("cmi.nonsense").is_err());
    }

    #[test]
    fn test_entry_element_reflects_mode_and_is_read_only() {
        let mut s = session(DialectKind::Scorm12, EntryMode::Resume, None);
        assert_eq!(s.get_value("cmi.core.entry").unwrap(), "resume");
        assert!(s.set_value("cmi.core.entry", "ab-initio").is_err());
        assert_eq!(s.get_value("cmi.core.entry").unwrap(), "resume");
    }

    #[test]
    fn test_synthetic_read_wins_over_stored_value() {
        let mut seed = DataModel::new();
        // A hostile prior snapshot cannot shadow synthesized elements
        seed.insert("cmi.core.student_name".to_string(), "Mallory".to_string());
        let s = session(DialectKind::Scorm12, EntryMode::Resume, Some(seed));
        assert_eq!(s.get_value("cmi.core.student_name").unwrap(), "Test Learner");
    }

    #[test]
    fn test_values_are_sanitized_before_storage() {
        let mut s = session(DialectKind::Scorm2004, EntryMode::AbInitio, None);
        let stored = s
            .set_value("cmi.suspend_data", "state<script>alert(1)</script>=a")
            .unwrap();
        assert_eq!(stored, "state=a");
        assert_eq!(s.get_value("cmi.suspend_data").unwrap(), "state=a");
    }

    #[test]
    fn test_terminated_session_fails_phase_guard() {
        let mut s = session(DialectKind::Scorm12, EntryMode::AbInitio, None);
        assert!(s.ensure_initialized().is_ok());
        s.terminate();
        assert!(matches!(
            s.ensure_initialized().unwrap_err(),
            RuntimeError::SessionState(_)
        ));
    }

    #[test]
    fn test_snapshot_carries_whole_data_model() {
        let mut s = session(DialectKind::Scorm12, EntryMode::AbInitio, None);
        let now = Instant::now();
        s.admit(ActionClass::SetValue, now).unwrap();
        s.set_value("cmi.core.lesson_status", "completed").unwrap();
        s.set_value("cmi.core.score.raw", "88").unwrap();

        let snapshot = s.snapshot(now, false);
        assert_eq!(snapshot.data_model.len(), 3); // entry + two writes
        assert!(snapshot.terminated_at.is_none());
        assert_eq!(snapshot.call_count, 1);

        let terminal = s.snapshot(now, true);
        assert!(terminal.terminated_at.is_some());
    }
}

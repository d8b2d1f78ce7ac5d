// ============================================================================
// Runtime API Dispatcher
// ============================================================================
//
// One action per call: initialize, getvalue, setvalue, commit, terminate,
// state. Per action the order is fixed: caller identity → per-caller
// limiter → gate (initialize) / owner check (later actions) → registry →
// per-session limiter → validator → mutate/read → optional persister.
//
// The per-session mutex is held across the whole action, so interleaved
// requests against one session serialize: a setvalue racing a terminate
// either lands before the final snapshot or finds the session gone and
// fails with a session-state error.
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CourseCatalog, EntitlementGate};
use crate::config::RuntimeConfig;
use crate::core::{
    DataModel, DialectKind, EntryMode, LearnerId, Result, RuntimeError, SessionKey,
};
use crate::limiter::{ActionClass, CallerLimiter};
use crate::persist::{CommitRecord, CommitStore};
use crate::session::{RuntimeSession, SessionHandle, SessionMetrics, SessionRegistry};

/// One runtime call as carried by the action-dispatch endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeRequest {
    pub action: RuntimeAction,
    pub enrollment_id: uuid::Uuid,
    pub content_object_id: uuid::Uuid,
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeAction {
    Initialize,
    GetValue,
    SetValue,
    Commit,
    Terminate,
    State,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeOutcome {
    pub initialized: bool,
    pub dialect: DialectKind,
    pub entry_mode: EntryMode,
    pub data_model: DataModel,
}

/// Diagnostic report: durable snapshot plus live metrics if present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateReport {
    pub runtime: Option<CommitRecord>,
    pub session: Option<SessionMetrics>,
    pub can_resume: bool,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RuntimeReply {
    Initialized(InitializeOutcome),
    Value { value: String },
    SetResult { success: bool },
    Committed { committed: bool },
    Terminated { terminated: bool },
    State(StateReport),
}

pub struct RuntimeService {
    gate: EntitlementGate<dyn CourseCatalog>,
    store: Arc<dyn CommitStore>,
    registry: SessionRegistry,
    caller_limiter: CallerLimiter,
    config: RuntimeConfig,
}

impl RuntimeService {
    pub fn new(
        catalog: Arc<dyn CourseCatalog>,
        store: Arc<dyn CommitStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            gate: EntitlementGate::new(catalog),
            store,
            registry: SessionRegistry::new(),
            caller_limiter: CallerLimiter::new(config.caller_window, config.max_caller_calls),
            config,
        }
    }

    /// Route one action to its operation.
    pub async fn dispatch(&self, caller: LearnerId, request: RuntimeRequest) -> Result<RuntimeReply> {
        let key = SessionKey::new(request.enrollment_id, request.content_object_id);
        match request.action {
            RuntimeAction::Initialize => self
                .initialize(caller, key)
                .await
                .map(RuntimeReply::Initialized),
            RuntimeAction::GetValue => {
                let element = require(request.element.as_deref(), "element")?;
                self.get_value(caller, key, element)
                    .await
                    .map(|value| RuntimeReply::Value { value })
            }
            RuntimeAction::SetValue => {
                let element = require(request.element.as_deref(), "element")?;
                let value = require(request.value.as_deref(), "value")?;
                self.set_value(caller, key, element, value)
                    .await
                    .map(|_| RuntimeReply::SetResult { success: true })
            }
            RuntimeAction::Commit => self
                .commit(caller, key)
                .await
                .map(|_| RuntimeReply::Committed { committed: true }),
            RuntimeAction::Terminate => self
                .terminate(caller, key)
                .await
                .map(|_| RuntimeReply::Terminated { terminated: true }),
            RuntimeAction::State => self.state(caller, key).await.map(RuntimeReply::State),
        }
    }

    /// Create or re-enter the session for `key`.
    ///
    /// A first-ever launch starts ab-initio; a launch with a prior commit
    /// record seeds the data model from it and reports resume. Re-initialize
    /// of a live session returns the in-memory state untouched so unsaved
    /// writes survive duplicate launch calls.
    pub async fn initialize(&self, caller: LearnerId, key: SessionKey) -> Result<InitializeOutcome> {
        let now = Instant::now();
        self.caller_limiter.admit(caller, now).await?;

        if let Some(handle) = self.registry.get(&key).await {
            let mut session = handle.lock().await;
            session.ensure_initialized()?;
            ensure_owner(&session, caller)?;
            session.admit(ActionClass::Generic, now)?;
            debug!(session = %key, "re-initialize of live session");
            return Ok(outcome(&session));
        }

        let auth = self
            .gate
            .authorize(caller, key.enrollment_id, key.content_object_id)
            .await?;

        let prior = self.store.latest(&key).await?;
        let (entry_mode, seed) = match prior {
            Some(record) => (EntryMode::Resume, Some(record.data_model)),
            None => (EntryMode::AbInitio, None),
        };

        let session = RuntimeSession::start(
            key,
            auth.dialect(),
            auth.launch_context(),
            entry_mode,
            seed,
            self.config.session_limits.clone(),
            now,
        );
        let (handle, created) = self.registry.insert_if_absent(key, session).await;
        let mut session = handle.lock().await;
        if created {
            info!(session = %key, dialect = %session.dialect(), entry = %session.entry_mode(), "session initialized");
        }
        session.admit(ActionClass::Generic, now)?;
        Ok(outcome(&session))
    }

    pub async fn get_value(
        &self,
        caller: LearnerId,
        key: SessionKey,
        element: &str,
    ) -> Result<String> {
        let now = Instant::now();
        self.caller_limiter.admit(caller, now).await?;

        let handle = self.live_session(&key).await?;
        let mut session = handle.lock().await;
        session.ensure_initialized()?;
        ensure_owner(&session, caller)?;
        session.admit(ActionClass::Generic, now)?;
        session.get_value(element)
    }

    pub async fn set_value(
        &self,
        caller: LearnerId,
        key: SessionKey,
        element: &str,
        value: &str,
    ) -> Result<()> {
        let now = Instant::now();
        self.caller_limiter.admit(caller, now).await?;

        let handle = self.live_session(&key).await?;
        let mut session = handle.lock().await;
        session.ensure_initialized()?;
        ensure_owner(&session, caller)?;
        session.admit(ActionClass::SetValue, now)?;
        let stored = session.set_value(element, value)?;
        debug!(session = %key, element, value = %stored, "element written");
        Ok(())
    }

    /// Persist the full data-model snapshot. Lifecycle state is unchanged;
    /// a persistence failure leaves the session initialized for retry.
    pub async fn commit(&self, caller: LearnerId, key: SessionKey) -> Result<CommitRecord> {
        let now = Instant::now();
        self.caller_limiter.admit(caller, now).await?;

        let handle = self.live_session(&key).await?;
        let mut session = handle.lock().await;
        session.ensure_initialized()?;
        ensure_owner(&session, caller)?;
        session.admit(ActionClass::Commit, now)?;

        let snapshot = session.snapshot(now, false);
        let record = self.store.save(snapshot).await?;
        debug!(session = %key, calls = record.call_count, "snapshot committed");
        Ok(record)
    }

    /// Final blocking commit, then destroy the session.
    ///
    /// The registry entry is removed only after the durable write
    /// succeeded; on persistence failure the session stays initialized and
    /// registered so terminate can be retried.
    pub async fn terminate(&self, caller: LearnerId, key: SessionKey) -> Result<CommitRecord> {
        let now = Instant::now();
        self.caller_limiter.admit(caller, now).await?;

        let handle = self.live_session(&key).await?;
        let mut session = handle.lock().await;
        session.ensure_initialized()?;
        ensure_owner(&session, caller)?;
        session.admit(ActionClass::Exempt, now)?;

        let snapshot = session.snapshot(now, true);
        let record = self.store.save(snapshot).await?;

        session.terminate();
        self.registry.remove(&key).await;
        info!(session = %key, calls = record.call_count, "session terminated");
        Ok(record)
    }

    /// Diagnostic: durable snapshot plus live metrics. Requires no
    /// initialized session and is not rate limited.
    pub async fn state(&self, _caller: LearnerId, key: SessionKey) -> Result<StateReport> {
        let record = self.store.latest(&key).await?;
        let session = match self.registry.get(&key).await {
            Some(handle) => Some(handle.lock().await.metrics(Instant::now())),
            None => None,
        };

        Ok(StateReport {
            can_resume: record.is_some(),
            runtime: record,
            session,
            active_sessions: self.registry.active_count().await,
        })
    }

    async fn live_session(&self, key: &SessionKey) -> Result<SessionHandle> {
        self.registry.get(key).await.ok_or_else(|| {
            RuntimeError::SessionState(format!("no initialized session for {}", key))
        })
    }
}

fn ensure_owner(session: &RuntimeSession, caller: LearnerId) -> Result<()> {
    if session.context().learner_id != caller {
        return Err(RuntimeError::Entitlement(
            "session does not belong to caller".to_string(),
        ));
    }
    Ok(())
}

fn require<'a>(field: Option<&'a str>, name: &str) -> Result<&'a str> {
    field.ok_or_else(|| RuntimeError::validation(name, "missing required field"))
}

fn outcome(session: &RuntimeSession) -> InitializeOutcome {
    InitializeOutcome {
        initialized: true,
        dialect: session.dialect(),
        entry_mode: session.entry_mode(),
        data_model: session.data_model().clone(),
    }
}

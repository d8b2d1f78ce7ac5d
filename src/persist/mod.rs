// ============================================================================
// Commit Persister
// ============================================================================
//
// Durable side of the runtime: full data-model snapshots upserted by
// session key, plus an analytics event per commit. Both writes happen
// inside one atomic store operation so a crash can never leave the
// snapshot and the analytics trail inconsistent.
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::{DataModel, DialectKind, EntryMode, Result, SessionKey};

/// Complete snapshot handed to the persister. Always the whole data model,
/// never a diff.
#[derive(Debug, Clone)]
pub struct CommitSnapshot {
    pub key: SessionKey,
    pub dialect: DialectKind,
    pub entry_mode: EntryMode,
    pub data_model: DataModel,
    pub committed_at: DateTime<Utc>,
    /// Set only by terminate; stamped within the same atomic save.
    pub terminated_at: Option<DateTime<Utc>>,
    pub call_count: u64,
    pub duration_secs: u64,
}

/// Durable snapshot of a session, upserted on every commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub content_object_id: Uuid,
    pub dialect: DialectKind,
    pub entry_mode: EntryMode,
    pub data_model: DataModel,
    pub first_committed_at: DateTime<Utc>,
    pub committed_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub call_count: u64,
    pub duration_secs: u64,
}

impl CommitRecord {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.enrollment_id, self.content_object_id)
    }
}

/// One event per commit; duplicates across retries are expected and
/// acceptable, the record upsert itself is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAnalytics {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub content_object_id: Uuid,
    pub dialect: DialectKind,
    pub recorded_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub call_count: u64,
}

#[async_trait]
pub trait CommitStore: Send + Sync {
    /// Most recent durable record for the key, if any.
    async fn latest(&self, key: &SessionKey) -> Result<Option<CommitRecord>>;

    /// Atomically upsert the snapshot and append its analytics event.
    async fn save(&self, snapshot: CommitSnapshot) -> Result<CommitRecord>;

    /// Analytics trail for a key, oldest first.
    async fn analytics(&self, key: &SessionKey) -> Result<Vec<CommitAnalytics>>;
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<SessionKey, CommitRecord>,
    analytics: Vec<CommitAnalytics>,
}

/// Commit store backed by process memory. A deployment would put a
/// transactional database behind the same trait.
#[derive(Default)]
pub struct InMemoryCommitStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryCommitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommitStore for InMemoryCommitStore {
    async fn latest(&self, key: &SessionKey) -> Result<Option<CommitRecord>> {
        Ok(self.inner.read().await.records.get(key).cloned())
    }

    async fn save(&self, snapshot: CommitSnapshot) -> Result<CommitRecord> {
        // One write lock covers the upsert and the analytics append.
        let mut inner = self.inner.write().await;

        let record = match inner.records.get(&snapshot.key) {
            Some(existing) => CommitRecord {
                id: existing.id,
                first_committed_at: existing.first_committed_at,
                enrollment_id: snapshot.key.enrollment_id,
                content_object_id: snapshot.key.content_object_id,
                dialect: snapshot.dialect,
                entry_mode: snapshot.entry_mode,
                data_model: snapshot.data_model.clone(),
                committed_at: snapshot.committed_at,
                terminated_at: snapshot.terminated_at.or(existing.terminated_at),
                call_count: snapshot.call_count,
                duration_secs: snapshot.duration_secs,
            },
            None => CommitRecord {
                id: Uuid::new_v4(),
                enrollment_id: snapshot.key.enrollment_id,
                content_object_id: snapshot.key.content_object_id,
                dialect: snapshot.dialect,
                entry_mode: snapshot.entry_mode,
                data_model: snapshot.data_model.clone(),
                first_committed_at: snapshot.committed_at,
                committed_at: snapshot.committed_at,
                terminated_at: snapshot.terminated_at,
                call_count: snapshot.call_count,
                duration_secs: snapshot.duration_secs,
            },
        };

        inner.records.insert(snapshot.key, record.clone());
        inner.analytics.push(CommitAnalytics {
            id: Uuid::new_v4(),
            enrollment_id: snapshot.key.enrollment_id,
            content_object_id: snapshot.key.content_object_id,
            dialect: snapshot.dialect,
            recorded_at: snapshot.committed_at,
            duration_secs: snapshot.duration_secs,
            call_count: snapshot.call_count,
        });

        Ok(record)
    }

    async fn analytics(&self, key: &SessionKey) -> Result<Vec<CommitAnalytics>> {
        Ok(self
            .inner
            .read()
            .await
            .analytics
            .iter()
            .filter(|event| {
                event.enrollment_id == key.enrollment_id
                    && event.content_object_id == key.content_object_id
            })
            .cloned()
            .collect())
    }
}

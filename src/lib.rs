// ============================================================================
// SCORM Runtime Library
// ============================================================================

pub mod catalog;
pub mod config;
pub mod core;
pub mod dialect;
pub mod limiter;
pub mod persist;
pub mod service;
pub mod session;
pub mod web;

// Re-export main types for convenience
pub use config::{AppConfig, RuntimeConfig};
pub use core::{DialectKind, EntryMode, Result, RuntimeError, SessionKey};
pub use service::{RuntimeAction, RuntimeReply, RuntimeRequest, RuntimeService};

use std::sync::Arc;

use catalog::InMemoryCatalog;
use persist::InMemoryCommitStore;

// ============================================================================
// High-level embedded runtime
// ============================================================================

/// Runtime service wired to in-memory catalog and commit stores.
///
/// This is the recommended entry point for embedding the runtime in tests
/// or a single-process deployment. A production deployment implements
/// `CourseCatalog` and `CommitStore` against the platform's database and
/// constructs `RuntimeService` directly.
///
/// # Examples
///
/// ```
/// use scorm_runtime::{DialectKind, Runtime, SessionKey};
///
/// # tokio_test::block_on(async {
/// let runtime = Runtime::in_memory();
/// let learner = uuid::Uuid::new_v4();
/// let (enrollment_id, object_id) = runtime
///     .catalog()
///     .seed_launchable(learner, "Ada Lovelace", DialectKind::Scorm12)
///     .await;
///
/// let key = SessionKey::new(enrollment_id, object_id);
/// let service = runtime.service();
///
/// let outcome = service.initialize(learner, key).await.unwrap();
/// assert_eq!(outcome.entry_mode.as_str(), "ab-initio");
///
/// service
///     .set_value(learner, key, "cmi.core.lesson_status", "completed")
///     .await
///     .unwrap();
/// let status = service
///     .get_value(learner, key, "cmi.core.lesson_status")
///     .await
///     .unwrap();
/// assert_eq!(status, "completed");
///
/// service.terminate(learner, key).await.unwrap();
/// # });
/// ```
pub struct Runtime {
    catalog: Arc<InMemoryCatalog>,
    store: Arc<InMemoryCommitStore>,
    service: Arc<RuntimeService>,
}

impl Runtime {
    /// Build a runtime with default limits and empty in-memory stores.
    pub fn in_memory() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Build a runtime with custom limits.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use scorm_runtime::{Runtime, RuntimeConfig};
    ///
    /// let runtime = Runtime::with_config(
    ///     RuntimeConfig::new()
    ///         .window(Duration::from_secs(60))
    ///         .max_session_calls(240),
    /// );
    /// # let _ = runtime;
    /// ```
    pub fn with_config(config: RuntimeConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let store = Arc::new(InMemoryCommitStore::new());
        let service = Arc::new(RuntimeService::new(catalog.clone(), store.clone(), config));
        Self {
            catalog,
            store,
            service,
        }
    }

    /// Seedable catalog backing this runtime.
    pub fn catalog(&self) -> &Arc<InMemoryCatalog> {
        &self.catalog
    }

    /// Commit store backing this runtime.
    pub fn store(&self) -> &Arc<InMemoryCommitStore> {
        &self.store
    }

    /// Shared handle to the dispatcher.
    pub fn service(&self) -> Arc<RuntimeService> {
        self.service.clone()
    }
}

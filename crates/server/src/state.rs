//! Application state shared across handlers.

use armature_cache::{RigCache, TempAvatarStore};
use armature_core::SessionId;
use armature_core::config::AppConfig;
use armature_inference::RigEngine;
use armature_metadata::MetadataStore;
use armature_storage::ObjectStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-session rig serialization.
///
/// At most one rig attempt per session may run at a time. A second request
/// for the same session waits for the first to finish and then runs its own
/// attempt, superseding the cached entry (last write wins). Lock objects are
/// created on demand; the background sweeper prunes ones nobody holds.
pub struct SessionLocks {
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the lock for a session, creating it on first use.
    pub async fn for_session(&self, session_id: SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop lock objects no attempt currently holds or waits on.
    pub async fn prune(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub rig_cache: Arc<RigCache>,
    pub temp_avatars: Arc<TempAvatarStore>,
    pub engine: Arc<dyn RigEngine>,
    pub session_locks: Arc<SessionLocks>,
}

impl AppState {
    /// Create application state from configuration and initialized backends.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        rig_cache: Arc<RigCache>,
        engine: Arc<dyn RigEngine>,
    ) -> Self {
        if let Err(error) = config.validate() {
            panic!("invalid configuration: {error}");
        }

        Self {
            config: Arc::new(config),
            storage,
            metadata,
            rig_cache,
            temp_avatars: Arc::new(TempAvatarStore::new()),
            engine,
            session_locks: Arc::new(SessionLocks::new()),
        }
    }
}

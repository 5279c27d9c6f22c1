//! In-memory registry of uploads awaiting rigging.

use std::collections::HashMap;

use armature_core::TempAvatarRecord;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Uploads that have been analyzed but not yet rigged or saved.
///
/// Purely in-memory: a restart forgets every record, and clients re-upload.
/// Records are removed only by explicit deletion; the spool files they
/// point at belong to the host's cleanup job, not this store.
#[derive(Debug, Default)]
pub struct TempAvatarStore {
    records: RwLock<HashMap<Uuid, TempAvatarRecord>>,
}

impl TempAvatarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for an upload.
    pub async fn store(&self, record: TempAvatarRecord) {
        self.records.write().await.insert(record.id, record);
    }

    pub async fn get(&self, id: Uuid) -> Option<TempAvatarRecord> {
        self.records.read().await.get(&id).cloned()
    }

    /// Remove a record. Removing an unknown id is a no-op.
    pub async fn delete(&self, id: Uuid) {
        self.records.write().await.remove(&id);
    }

    /// Number of tracked uploads.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

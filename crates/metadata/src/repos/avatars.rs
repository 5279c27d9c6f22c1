//! Avatar repository.

use crate::error::MetadataResult;
use crate::models::AvatarRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for durable avatar records.
#[async_trait]
pub trait AvatarRepo: Send + Sync {
    /// Insert a new avatar record.
    ///
    /// Returns `AlreadyExists` for a duplicate id.
    async fn create_avatar(&self, avatar: &AvatarRow) -> MetadataResult<()>;

    /// Get an avatar by id.
    async fn get_avatar(&self, id: Uuid) -> MetadataResult<Option<AvatarRow>>;

    /// List an owner's avatars, newest first.
    async fn list_avatars_for_owner(&self, owner_id: Uuid) -> MetadataResult<Vec<AvatarRow>>;

    /// Delete an avatar record. Returns `NotFound` if no row matched.
    async fn delete_avatar(&self, id: Uuid) -> MetadataResult<()>;
}

//! Avatar records: the ephemeral upload form and the durable saved form.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use uuid::Uuid;

/// An uploaded-but-not-yet-persisted model.
///
/// Lives only in memory (plus its spool file on disk) until the avatar is
/// finalized; abandoned uploads are reaped by the external cleanup job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TempAvatarRecord {
    /// Time-ordered id, doubling as the rig session key for first rigs.
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Where the raw upload was spooled.
    pub source_file_path: PathBuf,
    /// Size the client declared; the spool file is the authority.
    pub declared_file_size: u64,
    pub original_file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TempAvatarRecord {
    /// Create a record for an upload about to be spooled under `upload_dir`.
    /// The spool file is named after the generated id.
    pub fn new(
        owner_id: Uuid,
        upload_dir: &Path,
        declared_file_size: u64,
        original_file_name: impl Into<String>,
    ) -> Self {
        let id = Uuid::now_v7();
        Self {
            id,
            owner_id,
            source_file_path: upload_dir.join(format!("{id}.glb")),
            declared_file_size,
            original_file_name: original_file_name.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// A finalized avatar as recorded durably and returned by the API.
///
/// Created only by the save flow; an in-progress rig has no durable record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAvatar {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Permanent object storage reference for the model binary.
    pub model_url: String,
    /// Thumbnail reference; the placeholder when no image could be derived.
    pub thumbnail_url: String,
    pub is_rigged: bool,
    pub bone_count: u32,
    pub morph_target_names: Vec<String>,
    pub file_size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

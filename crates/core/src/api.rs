//! Request and response bodies for the HTTP surface.
//!
//! Every endpoint speaks a typed body; success and failure shapes are
//! distinct structs so clients can rely on field presence instead of
//! probing dynamic maps.

use crate::session::SessionId;
use crate::tier::{TierConfig, TrackingPrecision};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Response from `POST /api/v1/avatars/upload`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadModelResponse {
    pub temp_avatar_id: Uuid,
    /// Actual spooled size in bytes (not the multipart declaration).
    pub file_size: u64,
    /// Vertex total from the structural analysis run at upload time.
    pub vertex_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub declared_at: OffsetDateTime,
}

/// Body of `POST /api/v1/avatars/{id}/rig`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigRequest {
    pub plan_id: String,
}

/// Success response from the rig endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigResponse {
    pub session_id: SessionId,
    pub bone_count: u32,
    pub morph_target_count: usize,
    pub has_face_rig: bool,
    pub has_body_rig: bool,
    pub has_hand_rig: bool,
}

/// Response from `GET /api/v1/rigs/{session_id}/metadata`: everything about
/// a cached rig except the binary payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigMetadataResponse {
    pub session_id: SessionId,
    pub owner_id: Uuid,
    pub bone_count: u32,
    pub morph_target_count: usize,
    pub morph_target_names: Vec<String>,
    pub has_face_rig: bool,
    pub has_body_rig: bool,
    pub has_hand_rig: bool,
    /// Plan slug the rig was produced under.
    pub tier_used: String,
    pub original_byte_size: u64,
    pub rigged_byte_size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Body of `POST /api/v1/avatars/save`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAvatarRequest {
    pub session_id: SessionId,
    pub owner_id: Uuid,
    pub name: String,
}

/// Response from `DELETE /api/v1/rig-cache/expired`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvictExpiredResponse {
    pub evicted: usize,
}

/// Body of `PUT /api/v1/plans/{id}`: plan limits without the slug, which
/// comes from the path.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    pub max_bones: u32,
    pub max_morph_targets: u32,
    pub max_file_size_bytes: u64,
    pub tracking_precision: TrackingPrecision,
    pub face_tracking: bool,
    pub body_tracking: bool,
    pub hand_tracking: bool,
    pub finger_tracking: bool,
    pub eye_tracking: bool,
}

impl UpdatePlanRequest {
    /// Attach the path slug to form a full tier snapshot.
    pub fn into_tier(self, plan_id: impl Into<String>) -> TierConfig {
        TierConfig {
            plan_id: plan_id.into(),
            max_bones: self.max_bones,
            max_morph_targets: self.max_morph_targets,
            max_file_size_bytes: self.max_file_size_bytes,
            tracking_precision: self.tracking_precision,
            face_tracking: self.face_tracking,
            body_tracking: self.body_tracking,
            hand_tracking: self.hand_tracking,
            finger_tracking: self.finger_tracking,
            eye_tracking: self.eye_tracking,
        }
    }
}

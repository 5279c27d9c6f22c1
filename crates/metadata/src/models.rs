//! Database models mapping to the metadata schema.

use crate::error::{MetadataError, MetadataResult};
use armature_core::{PersistedAvatar, TierConfig, TrackingPrecision};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Durable avatar record.
///
/// `morph_target_names` is stored as a JSON array in a TEXT column so the
/// ordered list survives both backends without a join table.
#[derive(Debug, Clone, FromRow)]
pub struct AvatarRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub model_url: String,
    pub thumbnail_url: String,
    pub is_rigged: bool,
    pub bone_count: i64,
    pub morph_target_names: String,
    pub file_size: i64,
    pub created_at: OffsetDateTime,
}

impl AvatarRow {
    /// Build a row from the domain form.
    pub fn from_avatar(avatar: &PersistedAvatar) -> MetadataResult<Self> {
        let morph_target_names = serde_json::to_string(&avatar.morph_target_names)
            .map_err(|e| MetadataError::Internal(format!("encoding morph target names: {e}")))?;
        Ok(Self {
            id: avatar.id,
            owner_id: avatar.owner_id,
            name: avatar.name.clone(),
            model_url: avatar.model_url.clone(),
            thumbnail_url: avatar.thumbnail_url.clone(),
            is_rigged: avatar.is_rigged,
            bone_count: avatar.bone_count as i64,
            morph_target_names,
            file_size: avatar.file_size as i64,
            created_at: avatar.created_at,
        })
    }

    /// Convert back to the domain form.
    pub fn into_avatar(self) -> MetadataResult<PersistedAvatar> {
        let morph_target_names: Vec<String> = serde_json::from_str(&self.morph_target_names)
            .map_err(|e| {
                MetadataError::Internal(format!(
                    "avatar {} has unreadable morph target names: {e}",
                    self.id
                ))
            })?;
        Ok(PersistedAvatar {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            model_url: self.model_url,
            thumbnail_url: self.thumbnail_url,
            is_rigged: self.is_rigged,
            bone_count: self.bone_count.max(0) as u32,
            morph_target_names,
            file_size: self.file_size.max(0) as u64,
            created_at: self.created_at,
        })
    }
}

/// Durable plan configuration record.
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: String,
    pub max_bones: i64,
    pub max_morph_targets: i64,
    pub max_file_size_bytes: i64,
    pub tracking_precision: String,
    pub face_tracking: bool,
    pub body_tracking: bool,
    pub hand_tracking: bool,
    pub finger_tracking: bool,
    pub eye_tracking: bool,
    pub updated_at: OffsetDateTime,
}

impl PlanRow {
    /// Build a row from a tier snapshot.
    pub fn from_tier(tier: &TierConfig, updated_at: OffsetDateTime) -> Self {
        Self {
            id: tier.plan_id.clone(),
            max_bones: tier.max_bones as i64,
            max_morph_targets: tier.max_morph_targets as i64,
            max_file_size_bytes: tier.max_file_size_bytes as i64,
            tracking_precision: tier.tracking_precision.as_str().to_string(),
            face_tracking: tier.face_tracking,
            body_tracking: tier.body_tracking,
            hand_tracking: tier.hand_tracking,
            finger_tracking: tier.finger_tracking,
            eye_tracking: tier.eye_tracking,
            updated_at,
        }
    }

    /// Convert to the tier snapshot used by the rig pipeline.
    ///
    /// An unrecognized precision string degrades to `standard` rather than
    /// failing the rig.
    pub fn tier_config(&self) -> TierConfig {
        let tracking_precision = TrackingPrecision::parse(&self.tracking_precision)
            .unwrap_or_else(|| {
                tracing::warn!(
                    plan_id = %self.id,
                    value = %self.tracking_precision,
                    "unknown tracking precision in plan row, using standard"
                );
                TrackingPrecision::Standard
            });
        TierConfig {
            plan_id: self.id.clone(),
            max_bones: self.max_bones.max(0) as u32,
            max_morph_targets: self.max_morph_targets.max(0) as u32,
            max_file_size_bytes: self.max_file_size_bytes.max(0) as u64,
            tracking_precision,
            face_tracking: self.face_tracking,
            body_tracking: self.body_tracking,
            hand_tracking: self.hand_tracking,
            finger_tracking: self.finger_tracking,
            eye_tracking: self.eye_tracking,
        }
    }
}

//! Subscription tier policy snapshots.
//!
//! A `TierConfig` is resolved fresh for every rig request from the durable
//! plan table, so operator edits to plan limits take effect on the next
//! request without a restart. The compiled-in `free()` floor is what an
//! unresolvable plan falls back to; resolution failure never grants
//! elevated limits.

use serde::{Deserialize, Serialize};

/// Tracking precision grade offered by a plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingPrecision {
    #[default]
    Standard,
    High,
    Ultra,
}

impl TrackingPrecision {
    /// Stable string form, used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "high" => Some(Self::High),
            "ultra" => Some(Self::Ultra),
            _ => None,
        }
    }
}

/// Rigging limits for one subscription plan.
///
/// Immutable snapshot: taken once per rig request and carried through the
/// pipeline, so a plan edit mid-request cannot produce a mixed policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    /// Plan slug this snapshot was resolved from.
    pub plan_id: String,
    /// Bone ceiling the inference collaborator must honor.
    pub max_bones: u32,
    /// Morph target ceiling the inference collaborator must honor.
    pub max_morph_targets: u32,
    /// Largest source model this plan may rig.
    pub max_file_size_bytes: u64,
    pub tracking_precision: TrackingPrecision,
    pub face_tracking: bool,
    pub body_tracking: bool,
    pub hand_tracking: bool,
    pub finger_tracking: bool,
    pub eye_tracking: bool,
}

impl TierConfig {
    /// The free tier: the floor every unresolvable plan falls back to.
    pub fn free() -> Self {
        Self {
            plan_id: "free".to_string(),
            max_bones: 60,
            max_morph_targets: 20,
            max_file_size_bytes: 20 * 1024 * 1024,
            tracking_precision: TrackingPrecision::Standard,
            face_tracking: true,
            body_tracking: false,
            hand_tracking: false,
            finger_tracking: false,
            eye_tracking: false,
        }
    }

    fn plus() -> Self {
        Self {
            plan_id: "plus".to_string(),
            max_bones: 120,
            // The full ARKit blendshape set.
            max_morph_targets: 52,
            max_file_size_bytes: 50 * 1024 * 1024,
            tracking_precision: TrackingPrecision::High,
            face_tracking: true,
            body_tracking: true,
            hand_tracking: true,
            finger_tracking: false,
            eye_tracking: false,
        }
    }

    fn studio() -> Self {
        Self {
            plan_id: "studio".to_string(),
            max_bones: 256,
            max_morph_targets: 100,
            max_file_size_bytes: crate::MAX_UPLOAD_SIZE,
            tracking_precision: TrackingPrecision::Ultra,
            face_tracking: true,
            body_tracking: true,
            hand_tracking: true,
            finger_tracking: true,
            eye_tracking: true,
        }
    }

    /// The plans seeded into a fresh metadata store.
    pub fn builtin_plans() -> Vec<TierConfig> {
        vec![Self::free(), Self::plus(), Self::studio()]
    }
}

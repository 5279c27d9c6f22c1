//! Cache entry types and their persisted sidecar form.

use armature_core::{GlbAnalysis, RigOutcome, SessionId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A live rigged artifact.
///
/// The cache owns the buffer while the entry is live; readers get cheap
/// refcounted clones. Destroyed by explicit discard, TTL expiry, or a
/// successful save, whichever comes first.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedRig {
    pub session_id: SessionId,
    pub owner_id: Uuid,
    /// The rigged binary payload.
    pub buffer: Bytes,
    /// Structural analysis of the source model the rig was built from.
    pub analysis: GlbAnalysis,
    /// What the inference collaborator produced.
    pub outcome: RigOutcome,
    /// Plan slug the rig was produced under.
    pub tier_used: String,
    pub original_byte_size: u64,
    pub rigged_byte_size: u64,
    pub created_at: OffsetDateTime,
}

/// The index record written next to each cache binary.
///
/// Restores full entry metadata after a restart; without it only the
/// binary would survive and reloads would come back with zeroed outcome
/// data and no owner.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigSidecar {
    pub session_id: SessionId,
    pub owner_id: Uuid,
    pub outcome: RigOutcome,
    pub tier_used: String,
    pub original_byte_size: u64,
    pub rigged_byte_size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub analysis: GlbAnalysis,
}

impl RigSidecar {
    /// Capture everything about an entry except the buffer itself.
    pub fn of(entry: &CachedRig) -> Self {
        Self {
            session_id: entry.session_id,
            owner_id: entry.owner_id,
            outcome: entry.outcome.clone(),
            tier_used: entry.tier_used.clone(),
            original_byte_size: entry.original_byte_size,
            rigged_byte_size: entry.rigged_byte_size,
            created_at: entry.created_at,
            analysis: entry.analysis.clone(),
        }
    }

    /// Rebuild a full entry around a reloaded buffer. The file on disk is
    /// the authority for the rigged size, not the recorded number.
    pub fn into_entry(self, buffer: Bytes) -> CachedRig {
        CachedRig {
            session_id: self.session_id,
            owner_id: self.owner_id,
            rigged_byte_size: buffer.len() as u64,
            buffer,
            analysis: self.analysis,
            outcome: self.outcome,
            tier_used: self.tier_used,
            original_byte_size: self.original_byte_size,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> CachedRig {
        CachedRig {
            session_id: SessionId::new(),
            owner_id: Uuid::new_v4(),
            buffer: Bytes::from_static(b"rigged-bytes"),
            analysis: GlbAnalysis {
                vertex_count: 321,
                actual_byte_length: 12,
                ..GlbAnalysis::default()
            },
            outcome: RigOutcome {
                bone_count: 55,
                morph_target_names: vec!["jawOpen".into()],
                has_face_rig: true,
                has_body_rig: false,
                has_hand_rig: false,
            },
            tier_used: "plus".into(),
            original_byte_size: 40,
            rigged_byte_size: 12,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn test_sidecar_roundtrip_preserves_metadata() {
        let entry = sample_entry();
        let json = serde_json::to_vec(&RigSidecar::of(&entry)).unwrap();
        let sidecar: RigSidecar = serde_json::from_slice(&json).unwrap();
        let rebuilt = sidecar.into_entry(entry.buffer.clone());
        assert_eq!(rebuilt, entry);
    }

    #[test]
    fn test_reload_trusts_the_file_size() {
        let entry = sample_entry();
        let sidecar = RigSidecar::of(&entry);
        let shorter = Bytes::from_static(b"rig");
        let rebuilt = sidecar.into_entry(shorter);
        assert_eq!(rebuilt.rigged_byte_size, 3);
    }
}

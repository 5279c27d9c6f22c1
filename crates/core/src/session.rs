//! Rig session identifiers, pipeline state, and rig outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque key for one preview-before-commit rig attempt.
///
/// Independent of any durable avatar id: rigging a fresh upload adopts the
/// temp avatar id as its session key, while re-rigging a persisted avatar
/// gets a brand new key so the preview never shadows the saved model.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random session key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Adopt an existing id (first-rig flows reuse the temp avatar id so
    /// repeated rigs of one upload overwrite a single cache entry).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidSessionId(format!("{s:?}: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline state for one rig attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RigState {
    /// Source buffer is available, nothing examined yet.
    Uploaded,
    /// Structural analysis passed.
    Analyzed,
    /// Inference collaborator call in flight.
    Rigging,
    /// Artifact produced and handed to the cache.
    Cached,
    /// Attempt ended without producing an artifact.
    Failed,
}

impl RigState {
    /// Check if the attempt reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cached | Self::Failed)
    }

    /// Check whether `next` is a legal successor of this state.
    pub fn can_advance_to(&self, next: RigState) -> bool {
        matches!(
            (self, next),
            (Self::Uploaded, Self::Analyzed)
                | (Self::Analyzed, Self::Rigging)
                | (Self::Rigging, Self::Cached)
                | (Self::Uploaded | Self::Analyzed | Self::Rigging, Self::Failed)
        )
    }
}

/// What the inference collaborator produced for one rig.
///
/// The collaborator owns the tier ceilings; these are the actual counts it
/// came back with, recorded as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigOutcome {
    pub bone_count: u32,
    /// Ordered morph target names, e.g. "eyeBlinkLeft".
    pub morph_target_names: Vec<String>,
    pub has_face_rig: bool,
    pub has_body_rig: bool,
    pub has_hand_rig: bool,
}

impl RigOutcome {
    pub fn morph_target_count(&self) -> usize {
        self.morph_target_names.len()
    }
}

//! The rig engine abstraction.

use crate::error::InferenceResult;
use armature_core::{GlbAnalysis, RigOutcome, TierConfig};
use async_trait::async_trait;
use bytes::Bytes;

/// One rigging request: the model plus everything the collaborator needs
/// to decide how to rig it.
#[derive(Clone, Debug)]
pub struct RigJob {
    /// Source GLB container.
    pub buffer: Bytes,
    /// Structural analysis of `buffer`.
    pub analysis: GlbAnalysis,
    /// Limits the collaborator must honor.
    pub tier: TierConfig,
}

/// A rigged artifact and what the collaborator reported about it.
#[derive(Clone, Debug)]
pub struct RiggedModel {
    /// The rigged GLB container.
    pub buffer: Bytes,
    /// Skeleton and morph metadata, recorded as reported.
    pub outcome: RigOutcome,
}

/// Produces rigged models.
///
/// The HTTP client is the production implementation; tests substitute
/// scriptable engines. Implementations enforce the tier ceilings
/// themselves; callers bound the overall wait with their own timeout.
#[async_trait]
pub trait RigEngine: Send + Sync + 'static {
    /// Rig one model.
    async fn rig(&self, job: RigJob) -> InferenceResult<RiggedModel>;
}

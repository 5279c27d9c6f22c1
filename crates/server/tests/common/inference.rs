//! Scriptable rig engine for exercising the pipeline without a network.

use armature_core::RigOutcome;
use armature_inference::{InferenceError, InferenceResult, RigEngine, RigJob, RiggedModel};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Suffix the mock appends to the source buffer, so tests can tell the
/// rigged artifact from the original.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub const RIGGED_SUFFIX: &[u8] = b"+rigged";

/// What the mock does with each job.
#[allow(dead_code)]
#[derive(Clone)]
pub enum MockBehavior {
    /// Return the source buffer with [`RIGGED_SUFFIX`] appended. The
    /// outcome mirrors the tier that reached the engine: bone count is the
    /// tier ceiling and the rig flags follow the tier's tracking flags.
    Succeed,
    /// Reject every job with the given detail.
    Fail(String),
    /// Sleep longer than any test deadline before answering.
    Hang(Duration),
}

/// In-process [`RigEngine`] with a programmable behavior and an
/// invocation counter.
#[allow(dead_code)]
pub struct MockRigEngine {
    behavior: MockBehavior,
    invocations: AtomicUsize,
}

#[allow(dead_code)]
impl MockRigEngine {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            invocations: AtomicUsize::new(0),
        })
    }

    /// How many jobs reached the engine.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RigEngine for MockRigEngine {
    async fn rig(&self, job: RigJob) -> InferenceResult<RiggedModel> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Succeed => {
                let mut buffer = job.buffer.to_vec();
                buffer.extend_from_slice(RIGGED_SUFFIX);
                Ok(RiggedModel {
                    buffer: Bytes::from(buffer),
                    outcome: RigOutcome {
                        bone_count: job.tier.max_bones,
                        morph_target_names: vec![
                            "jawOpen".to_string(),
                            "eyeBlinkLeft".to_string(),
                        ],
                        has_face_rig: job.tier.face_tracking,
                        has_body_rig: job.tier.body_tracking,
                        has_hand_rig: job.tier.hand_tracking,
                    },
                })
            }
            MockBehavior::Fail(detail) => Err(InferenceError::Rejected {
                status: 500,
                detail: detail.clone(),
            }),
            MockBehavior::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Err(InferenceError::Timeout)
            }
        }
    }
}

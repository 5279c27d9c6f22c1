//! Rig pipeline orchestration.
//!
//! Drives one buffer through analysis, tier resolution, the rig engine,
//! and into the preview cache. Attempts for the same session are
//! serialized through [`crate::state::SessionLocks`]; a later attempt
//! replaces the earlier cache entry.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use armature_cache::CachedRig;
use armature_core::{RigState, SessionId, glb};
use armature_inference::RigJob;
use armature_metadata::resolve_tier;
use bytes::Bytes;
use std::time::Instant;
use time::OffsetDateTime;
use uuid::Uuid;

/// One rig attempt: a source buffer plus the identity it runs under.
#[derive(Debug)]
pub struct RigAttempt {
    /// Cache key for the produced artifact. First rigs reuse the temp
    /// upload id; re-rigs of persisted avatars get a fresh session.
    pub session_id: SessionId,
    pub owner_id: Uuid,
    /// Plan named by the client; unknown plans fall back to the free tier.
    pub plan_id: String,
    pub buffer: Bytes,
}

/// Run a rig attempt end to end and cache the artifact.
///
/// Holds the session lock for the whole attempt. Duration and outcome
/// counters are recorded for every attempt, including failed ones.
pub async fn run_rig(state: &AppState, attempt: RigAttempt) -> ApiResult<CachedRig> {
    let lock = state.session_locks.for_session(attempt.session_id).await;
    let _guard = lock.lock().await;

    metrics::RIGS_STARTED.inc();
    let started = Instant::now();
    let result = rig_locked(state, &attempt).await;
    metrics::RIG_DURATION.observe(started.elapsed().as_secs_f64());

    match &result {
        Ok(entry) => {
            metrics::RIGS_COMPLETED.inc();
            tracing::info!(
                session_id = %attempt.session_id,
                plan = %attempt.plan_id,
                bone_count = entry.outcome.bone_count,
                rigged_bytes = entry.rigged_byte_size,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "rig attempt cached"
            );
        }
        Err(error) => {
            metrics::RIGS_FAILED.inc();
            tracing::warn!(
                session_id = %attempt.session_id,
                plan = %attempt.plan_id,
                kind = error.kind(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "rig attempt failed"
            );
        }
    }

    result
}

async fn rig_locked(state: &AppState, attempt: &RigAttempt) -> ApiResult<CachedRig> {
    let mut rig_state = RigState::Uploaded;

    let analysis = glb::analyze(&attempt.buffer);
    if let Some(reason) = &analysis.parse_error {
        advance(&mut rig_state, RigState::Failed, attempt.session_id);
        return Err(ApiError::InvalidContainer(reason.clone()));
    }
    advance(&mut rig_state, RigState::Analyzed, attempt.session_id);

    let tier = resolve_tier(state.metadata.as_ref(), &attempt.plan_id).await;
    let tier_used = tier.plan_id.clone();

    advance(&mut rig_state, RigState::Rigging, attempt.session_id);
    let job = RigJob {
        buffer: attempt.buffer.clone(),
        analysis: analysis.clone(),
        tier,
    };
    let deadline = state.config.inference.timeout();
    let rigged = match tokio::time::timeout(deadline, state.engine.rig(job)).await {
        Ok(Ok(rigged)) => rigged,
        Ok(Err(error)) => {
            advance(&mut rig_state, RigState::Failed, attempt.session_id);
            return Err(error.into());
        }
        Err(_elapsed) => {
            advance(&mut rig_state, RigState::Failed, attempt.session_id);
            return Err(ApiError::InferenceTimeout);
        }
    };

    let entry = CachedRig {
        session_id: attempt.session_id,
        owner_id: attempt.owner_id,
        original_byte_size: attempt.buffer.len() as u64,
        rigged_byte_size: rigged.buffer.len() as u64,
        buffer: rigged.buffer,
        analysis,
        outcome: rigged.outcome,
        tier_used,
        created_at: OffsetDateTime::now_utc(),
    };
    state.rig_cache.put(entry.clone()).await;
    advance(&mut rig_state, RigState::Cached, attempt.session_id);

    Ok(entry)
}

/// Record a state transition. Transitions are fixed by construction here;
/// the assert guards against edits that break the lifecycle.
fn advance(current: &mut RigState, next: RigState, session_id: SessionId) {
    debug_assert!(
        current.can_advance_to(next),
        "illegal rig state transition {current:?} -> {next:?}"
    );
    tracing::debug!(session_id = %session_id, from = ?current, to = ?next, "rig state transition");
    *current = next;
}

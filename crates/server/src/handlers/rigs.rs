//! Cached rig read handlers.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use armature_core::api::RigMetadataResponse;
use armature_core::{GLB_CONTENT_TYPE, SessionId};
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

fn parse_session_id(raw: &str) -> ApiResult<SessionId> {
    SessionId::parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid session id: {e}")))
}

/// GET /api/v1/rigs/{session_id}/preview - The rigged model binary.
pub async fn get_rig_preview(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Response> {
    let session_id = parse_session_id(&session_id)?;
    let Some(entry) = state.rig_cache.get(session_id).await else {
        metrics::CACHE_MISSES.inc();
        return Err(ApiError::CacheMiss(session_id));
    };
    metrics::CACHE_HITS.inc();

    let byte_length = entry.buffer.len().to_string();
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, GLB_CONTENT_TYPE),
            (CONTENT_LENGTH, byte_length.as_str()),
        ],
        Body::from(entry.buffer.clone()),
    )
        .into_response())
}

/// GET /api/v1/rigs/{session_id}/metadata - Everything about a cached rig
/// except its binary payload.
pub async fn get_rig_metadata(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<RigMetadataResponse>> {
    let session_id = parse_session_id(&session_id)?;
    let Some(entry) = state.rig_cache.get(session_id).await else {
        metrics::CACHE_MISSES.inc();
        return Err(ApiError::CacheMiss(session_id));
    };
    metrics::CACHE_HITS.inc();

    Ok(Json(RigMetadataResponse {
        session_id: entry.session_id,
        owner_id: entry.owner_id,
        bone_count: entry.outcome.bone_count,
        morph_target_count: entry.outcome.morph_target_count(),
        morph_target_names: entry.outcome.morph_target_names.clone(),
        has_face_rig: entry.outcome.has_face_rig,
        has_body_rig: entry.outcome.has_body_rig,
        has_hand_rig: entry.outcome.has_hand_rig,
        tier_used: entry.tier_used.clone(),
        original_byte_size: entry.original_byte_size,
        rigged_byte_size: entry.rigged_byte_size,
        created_at: entry.created_at,
    }))
}

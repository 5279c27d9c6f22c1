//! Operator endpoints: cache administration and plan management.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use armature_core::api::{EvictExpiredResponse, UpdatePlanRequest};
use armature_core::{SessionId, TierConfig};
use armature_metadata::PlanRow;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

/// DELETE /api/v1/rig-cache/{session_id} - Discard a cached rig.
///
/// Idempotent: discarding an unknown or already-gone session succeeds.
pub async fn discard_rig(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    let session_id = SessionId::parse(&session_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid session id: {e}")))?;
    state.rig_cache.delete(session_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for the on-demand cache sweep.
#[derive(Debug, Deserialize)]
pub struct SweepParams {
    /// Age threshold in seconds; defaults to the configured TTL.
    pub max_age_secs: Option<u64>,
}

/// DELETE /api/v1/rig-cache/expired - Evict aged cache entries now.
///
/// Runs the same eviction as the background sweeper; a threshold of zero
/// clears every entry.
pub async fn sweep_expired(
    State(state): State<AppState>,
    Query(params): Query<SweepParams>,
) -> ApiResult<Json<EvictExpiredResponse>> {
    let max_age = params
        .max_age_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.config.cache.ttl());

    let evicted = state.rig_cache.evict_expired(max_age).await;
    if evicted > 0 {
        metrics::CACHE_EVICTIONS.inc_by(evicted as u64);
        tracing::info!(evicted, max_age_secs = max_age.as_secs(), "on-demand cache sweep");
    }

    Ok(Json(EvictExpiredResponse { evicted }))
}

/// GET /api/v1/plans - All plan tier snapshots, ordered by slug.
pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<TierConfig>>> {
    let rows = state.metadata.list_plans().await?;
    Ok(Json(rows.iter().map(PlanRow::tier_config).collect()))
}

/// GET /api/v1/plans/{id} - One plan's tier snapshot.
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> ApiResult<Json<TierConfig>> {
    let row = state
        .metadata
        .get_plan(&plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("plan {plan_id}")))?;
    Ok(Json(row.tier_config()))
}

/// PUT /api/v1/plans/{id} - Create or replace a plan's limits.
///
/// Takes effect on the next rig; tiers are re-resolved per request.
pub async fn put_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    Json(body): Json<UpdatePlanRequest>,
) -> ApiResult<Json<TierConfig>> {
    if plan_id.trim().is_empty() {
        return Err(ApiError::BadRequest("plan id must not be empty".to_string()));
    }

    let tier = body.into_tier(plan_id);
    let row = PlanRow::from_tier(&tier, OffsetDateTime::now_utc());
    state.metadata.upsert_plan(&row).await?;

    tracing::info!(plan_id = %tier.plan_id, max_bones = tier.max_bones, "plan upserted");
    Ok(Json(tier))
}

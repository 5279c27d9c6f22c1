//! Route definitions for the armature API.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

/// Extra room on top of the model size limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Create the application router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/avatars", get(handlers::list_avatars))
        .route("/avatars/upload", post(handlers::upload_model))
        .route("/avatars/save", post(handlers::save_avatar))
        .route(
            "/avatars/{id}",
            get(handlers::get_avatar).delete(handlers::delete_avatar),
        )
        .route("/avatars/{id}/model", get(handlers::get_avatar_model))
        .route("/avatars/{id}/rig", post(handlers::rig_avatar))
        .route("/rigs/{session_id}/preview", get(handlers::get_rig_preview))
        .route("/rigs/{session_id}/metadata", get(handlers::get_rig_metadata))
        // The static segment wins over the capture, so "expired" is never
        // parsed as a session id.
        .route("/rig-cache/expired", delete(handlers::sweep_expired))
        .route("/rig-cache/{session_id}", delete(handlers::discard_rig))
        .route("/plans", get(handlers::list_plans))
        .route(
            "/plans/{id}",
            get(handlers::get_plan).put(handlers::put_plan),
        );

    let mut router = Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::health_check));

    if state.config.metrics.enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    let body_limit = state
        .config
        .server
        .max_upload_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    router
        .layer(DefaultBodyLimit::max(
            usize::try_from(body_limit).unwrap_or(usize::MAX),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

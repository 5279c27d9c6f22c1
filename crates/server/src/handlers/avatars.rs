//! Avatar lifecycle handlers: upload, rig, save, read back, delete.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::owner_id_header;
use crate::metrics;
use crate::pipeline::{self, RigAttempt};
use crate::state::AppState;
use armature_cache::CachedRig;
use armature_core::api::{RigRequest, RigResponse, SaveAvatarRequest, UploadModelResponse};
use armature_core::{
    GLB_CONTENT_TYPE, PLACEHOLDER_THUMBNAIL, PersistedAvatar, SessionId, TempAvatarRecord,
    extract_embedded_image,
};
use armature_metadata::AvatarRow;
use armature_storage::StorageError;
use axum::Json;
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Content types accepted for the model part of an upload.
const ACCEPTED_MODEL_TYPES: [&str; 2] = [GLB_CONTENT_TYPE, "application/octet-stream"];

fn multipart_error(error: MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("request body exceeds the upload limit".to_string())
    } else {
        ApiError::BadRequest(format!("malformed multipart body: {error}"))
    }
}

/// POST /api/v1/avatars/upload - Accept a model file for later rigging.
///
/// The upload is spooled to disk and analyzed; nothing durable is written
/// until the client saves a rigged result.
#[tracing::instrument(skip(state, multipart), fields(owner_id))]
pub async fn upload_model(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadModelResponse>)> {
    let owner_id = owner_id_header(&headers)?;
    tracing::Span::current().record("owner_id", tracing::field::display(owner_id));

    let mut model: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("model") {
            continue;
        }
        if let Some(content_type) = field.content_type()
            && !ACCEPTED_MODEL_TYPES.contains(&content_type)
        {
            return Err(ApiError::BadRequest(format!(
                "unsupported content type {content_type:?} for model part, expected {GLB_CONTENT_TYPE}"
            )));
        }
        let file_name = field.file_name().unwrap_or("model.glb").to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        model = Some((file_name, data));
        break;
    }

    let Some((file_name, data)) = model else {
        return Err(ApiError::BadRequest(
            "multipart body has no 'model' part".to_string(),
        ));
    };
    if data.is_empty() {
        return Err(ApiError::BadRequest("model part is empty".to_string()));
    }
    if data.len() as u64 > state.config.server.max_upload_size_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "model is {} bytes, the limit is {}",
            data.len(),
            state.config.server.max_upload_size_bytes
        )));
    }

    let upload_dir = &state.config.server.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("creating upload directory: {e}")))?;

    let record = TempAvatarRecord::new(owner_id, upload_dir, data.len() as u64, file_name);
    tokio::fs::write(&record.source_file_path, &data)
        .await
        .map_err(|e| ApiError::Internal(format!("spooling upload: {e}")))?;

    // Analysis is total; a malformed container is reported at rig time.
    let analysis = armature_core::analyze(&data);

    let response = UploadModelResponse {
        temp_avatar_id: record.id,
        file_size: data.len() as u64,
        vertex_count: analysis.vertex_count,
        declared_at: record.created_at,
    };
    state.temp_avatars.store(record).await;

    metrics::UPLOADS_TOTAL.inc();
    metrics::UPLOAD_BYTES.observe(data.len() as f64);
    tracing::info!(
        temp_avatar_id = %response.temp_avatar_id,
        file_size = response.file_size,
        vertex_count = response.vertex_count,
        "model upload spooled"
    );

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/avatars/{id}/rig - Rig an uploaded model or re-rig a
/// persisted avatar.
///
/// A temp upload rigs under its own id as the session key, so retries
/// supersede each other. Re-rigs of persisted avatars get a fresh session
/// and leave the stored avatar untouched until the client saves.
#[tracing::instrument(skip(state, headers, body), fields(avatar_id = %avatar_id, plan = %body.plan_id))]
pub async fn rig_avatar(
    State(state): State<AppState>,
    Path(avatar_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RigRequest>,
) -> ApiResult<Json<RigResponse>> {
    let owner_id = owner_id_header(&headers)?;
    let avatar_id = Uuid::parse_str(&avatar_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid avatar id: {e}")))?;

    let attempt = if let Some(record) = state.temp_avatars.get(avatar_id).await {
        if record.owner_id != owner_id {
            return Err(ApiError::OwnershipMismatch(format!("temp avatar {avatar_id}")));
        }
        let buffer = match tokio::fs::read(&record.source_file_path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(ApiError::NotFound(format!(
                    "upload {avatar_id} is no longer available"
                )));
            }
            Err(error) => {
                return Err(ApiError::Internal(format!("reading spooled upload: {error}")));
            }
        };
        RigAttempt {
            session_id: SessionId::from_uuid(record.id),
            owner_id,
            plan_id: body.plan_id,
            buffer,
        }
    } else if let Some(row) = state.metadata.get_avatar(avatar_id).await? {
        let avatar = row.into_avatar()?;
        if avatar.owner_id != owner_id {
            return Err(ApiError::OwnershipMismatch(format!("avatar {avatar_id}")));
        }
        let buffer = state.storage.get(&avatar.model_url).await?;
        RigAttempt {
            session_id: SessionId::new(),
            owner_id,
            plan_id: body.plan_id,
            buffer,
        }
    } else {
        return Err(ApiError::NotFound(format!("avatar {avatar_id}")));
    };

    let session_id = attempt.session_id;
    let entry = pipeline::run_rig(&state, attempt).await?;

    Ok(Json(RigResponse {
        session_id,
        bone_count: entry.outcome.bone_count,
        morph_target_count: entry.outcome.morph_target_count(),
        has_face_rig: entry.outcome.has_face_rig,
        has_body_rig: entry.outcome.has_body_rig,
        has_hand_rig: entry.outcome.has_hand_rig,
    }))
}

/// POST /api/v1/avatars/save - Persist a cached rig as a durable avatar.
///
/// The cache entry is deleted only after both durable writes succeed, so a
/// failed save can be retried without re-rigging.
#[tracing::instrument(skip(state, body), fields(session_id = %body.session_id, owner_id = %body.owner_id))]
pub async fn save_avatar(
    State(state): State<AppState>,
    Json(body): Json<SaveAvatarRequest>,
) -> ApiResult<(StatusCode, Json<PersistedAvatar>)> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("avatar name must not be empty".to_string()));
    }

    let Some(entry) = state.rig_cache.get(body.session_id).await else {
        metrics::CACHE_MISSES.inc();
        metrics::SAVE_FAILURES.inc();
        return Err(ApiError::CacheMiss(body.session_id));
    };
    metrics::CACHE_HITS.inc();

    if entry.owner_id != body.owner_id {
        metrics::SAVE_FAILURES.inc();
        return Err(ApiError::OwnershipMismatch(format!("session {}", body.session_id)));
    }

    let avatar_id = Uuid::new_v4();
    let model_key = format!("avatars/{}/{}.glb", body.owner_id, avatar_id);

    if let Err(error) = state.storage.put(&model_key, entry.buffer.clone()).await {
        metrics::SAVE_FAILURES.inc();
        return Err(ApiError::PersistenceFailure(format!("storing model object: {error}")));
    }

    let thumbnail_url = spawn_thumbnail_upload(&state, &entry, body.owner_id, avatar_id);

    let avatar = PersistedAvatar {
        id: avatar_id,
        owner_id: body.owner_id,
        name: body.name,
        model_url: model_key,
        thumbnail_url,
        is_rigged: true,
        bone_count: entry.outcome.bone_count,
        morph_target_names: entry.outcome.morph_target_names.clone(),
        file_size: entry.rigged_byte_size,
        created_at: OffsetDateTime::now_utc(),
    };

    let row = AvatarRow::from_avatar(&avatar)?;
    if let Err(error) = state.metadata.create_avatar(&row).await {
        metrics::SAVE_FAILURES.inc();
        return Err(ApiError::PersistenceFailure(format!("recording avatar: {error}")));
    }

    // Both durable writes landed; the cache entry has served its purpose.
    state.rig_cache.delete(body.session_id).await;
    if let Some(record) = state.temp_avatars.get(*body.session_id.as_uuid()).await {
        state.temp_avatars.delete(record.id).await;
        if let Err(error) = tokio::fs::remove_file(&record.source_file_path).await
            && error.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(
                path = %record.source_file_path.display(),
                error = %error,
                "failed to remove upload spool file"
            );
        }
    }

    metrics::SAVES_TOTAL.inc();
    tracing::info!(
        avatar_id = %avatar.id,
        model_url = %avatar.model_url,
        "avatar persisted"
    );

    Ok((StatusCode::CREATED, Json(avatar)))
}

/// Derive a thumbnail from the rigged model and upload it in the
/// background. The reference is recorded immediately; a failed upload
/// leaves it dangling, which clients treat like the placeholder.
fn spawn_thumbnail_upload(
    state: &AppState,
    entry: &CachedRig,
    owner_id: Uuid,
    avatar_id: Uuid,
) -> String {
    let Some((image, mime)) = extract_embedded_image(&entry.buffer) else {
        return PLACEHOLDER_THUMBNAIL.to_string();
    };
    let extension = if mime == "image/png" { "png" } else { "jpg" };
    let key = format!("thumbnails/{owner_id}/{avatar_id}.{extension}");

    let storage = state.storage.clone();
    let upload_key = key.clone();
    tokio::spawn(async move {
        match storage.put(&upload_key, image).await {
            Ok(()) => tracing::debug!(key = %upload_key, "thumbnail stored"),
            Err(error) => {
                tracing::warn!(key = %upload_key, error = %error, "thumbnail upload failed");
            }
        }
    });

    key
}

/// GET /api/v1/avatars - List the caller's avatars, newest first.
pub async fn list_avatars(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<PersistedAvatar>>> {
    let owner_id = owner_id_header(&headers)?;
    let rows = state.metadata.list_avatars_for_owner(owner_id).await?;
    let avatars = rows
        .into_iter()
        .map(|row| row.into_avatar())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(avatars))
}

/// GET /api/v1/avatars/{id} - Read back a persisted avatar record.
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(avatar_id): Path<String>,
) -> ApiResult<Json<PersistedAvatar>> {
    let avatar_id = Uuid::parse_str(&avatar_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid avatar id: {e}")))?;
    let row = state
        .metadata
        .get_avatar(avatar_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("avatar {avatar_id}")))?;
    Ok(Json(row.into_avatar()?))
}

/// GET /api/v1/avatars/{id}/model - Stream the stored model binary.
pub async fn get_avatar_model(
    State(state): State<AppState>,
    Path(avatar_id): Path<String>,
) -> ApiResult<Response> {
    let avatar_id = Uuid::parse_str(&avatar_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid avatar id: {e}")))?;
    let row = state
        .metadata
        .get_avatar(avatar_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("avatar {avatar_id}")))?;
    let avatar = row.into_avatar()?;

    let meta = state.storage.head(&avatar.model_url).await?;
    let stream = state.storage.get_stream(&avatar.model_url).await?;
    let body = Body::from_stream(
        stream.map(|chunk| chunk.map_err(|e| std::io::Error::other(e.to_string()))),
    );

    let byte_length = meta.size.to_string();
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, GLB_CONTENT_TYPE),
            (CONTENT_LENGTH, byte_length.as_str()),
        ],
        body,
    )
        .into_response())
}

/// DELETE /api/v1/avatars/{id} - Remove a persisted avatar.
///
/// Deletes the durable record first so a partial failure leaves an orphan
/// object rather than a dangling record. The thumbnail is removed
/// best-effort.
pub async fn delete_avatar(
    State(state): State<AppState>,
    Path(avatar_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let owner_id = owner_id_header(&headers)?;
    let avatar_id = Uuid::parse_str(&avatar_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid avatar id: {e}")))?;

    let row = state
        .metadata
        .get_avatar(avatar_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("avatar {avatar_id}")))?;
    let avatar = row.into_avatar()?;
    if avatar.owner_id != owner_id {
        return Err(ApiError::OwnershipMismatch(format!("avatar {avatar_id}")));
    }

    state.metadata.delete_avatar(avatar_id).await?;

    match state.storage.delete(&avatar.model_url).await {
        Ok(()) | Err(StorageError::NotFound(_)) => {}
        Err(error) => {
            return Err(ApiError::PersistenceFailure(format!(
                "deleting model object: {error}"
            )));
        }
    }
    if avatar.thumbnail_url != PLACEHOLDER_THUMBNAIL
        && let Err(error) = state.storage.delete(&avatar.thumbnail_url).await
        && !matches!(error, StorageError::NotFound(_))
    {
        tracing::warn!(
            key = %avatar.thumbnail_url,
            error = %error,
            "failed to delete thumbnail object"
        );
    }

    tracing::info!(avatar_id = %avatar_id, "avatar deleted");
    Ok(StatusCode::NO_CONTENT)
}

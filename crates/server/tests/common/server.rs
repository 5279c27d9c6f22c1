//! Server test utilities.

use super::inference::{MockBehavior, MockRigEngine};
use super::storage::FlakyStore;
use armature_cache::RigCache;
use armature_core::config::{AppConfig, MetadataConfig, StorageConfig};
use armature_inference::RigEngine;
use armature_metadata::{MetadataStore, SqliteStore};
use armature_server::{AppState, create_router};
use armature_storage::{FilesystemBackend, ObjectStore};
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub engine: Arc<MockRigEngine>,
    pub storage: Arc<FlakyStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server with a succeeding mock engine.
    pub async fn new() -> Self {
        Self::build(MockRigEngine::new(MockBehavior::Succeed), |_| {}).await
    }

    /// Create a test server around a specific mock engine.
    pub async fn with_engine(engine: Arc<MockRigEngine>) -> Self {
        Self::build(engine, |_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build(MockRigEngine::new(MockBehavior::Succeed), modifier).await
    }

    async fn build<F>(engine: Arc<MockRigEngine>, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        armature_server::metrics::register_metrics();

        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let storage_path = temp_dir.path().join("storage");
        std::fs::create_dir_all(&storage_path).expect("Failed to create storage directory");
        let backend: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );
        let storage = FlakyStore::new(backend);

        let db_path = temp_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let cache_dir = temp_dir.path().join("rig-cache");
        let rig_cache = Arc::new(
            RigCache::open(&cache_dir)
                .await
                .expect("Failed to open rig cache"),
        );

        let mut config = AppConfig::for_testing();
        config.server.upload_dir = temp_dir.path().join("uploads");
        config.storage = StorageConfig::Filesystem {
            path: storage_path,
        };
        config.metadata = MetadataConfig::Sqlite { path: db_path };
        config.cache.dir = cache_dir;
        // Short deadline so hang tests finish quickly; the mock engine
        // answers instantly otherwise.
        config.inference.timeout_secs = 1;
        modifier(&mut config);

        let state = AppState::new(
            config,
            storage.clone() as Arc<dyn ObjectStore>,
            metadata,
            rig_cache,
            engine.clone() as Arc<dyn RigEngine>,
        );
        let router = create_router(state.clone());

        Self {
            router,
            state,
            engine,
            storage,
            _temp_dir: temp_dir,
        }
    }

    /// Fire one request at the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router call failed")
    }

    /// Upload a model and return its temp avatar id.
    pub async fn upload(&self, owner_id: Uuid, file: &[u8]) -> Uuid {
        let request = multipart_upload_request(owner_id, file, "model/gltf-binary");
        let (status, body) = response_json(self.send(request).await).await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {body}");
        body["tempAvatarId"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .expect("tempAvatarId in upload response")
    }

    /// Rig an avatar under a plan.
    pub async fn rig(&self, owner_id: Uuid, avatar_id: Uuid, plan_id: &str) -> (StatusCode, Value) {
        let body = serde_json::json!({ "planId": plan_id });
        let request = json_request(
            "POST",
            &format!("/api/v1/avatars/{avatar_id}/rig"),
            Some(owner_id),
            Some(&body),
        );
        response_json(self.send(request).await).await
    }

    /// Save a cached rig as a durable avatar.
    pub async fn save(&self, owner_id: Uuid, session_id: &str, name: &str) -> (StatusCode, Value) {
        let body = serde_json::json!({
            "sessionId": session_id,
            "ownerId": owner_id,
            "name": name,
        });
        let request = json_request("POST", "/api/v1/avatars/save", None, Some(&body));
        response_json(self.send(request).await).await
    }
}

/// Build a JSON request, optionally authenticated via the owner header.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    owner_id: Option<Uuid>,
    body: Option<&Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner_id) = owner_id {
        builder = builder.header("x-owner-id", owner_id.to_string());
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(value).expect("serialize body")))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    }
}

/// Build a multipart upload request with a single "model" part.
#[allow(dead_code)]
pub fn multipart_upload_request(
    owner_id: Uuid,
    file: &[u8],
    content_type: &str,
) -> Request<Body> {
    let boundary = "armature-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"model\"; filename=\"hero.glb\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/v1/avatars/upload")
        .header("x-owner-id", owner_id.to_string())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("build request")
}

/// Read a response body as JSON. An empty body maps to `Value::Null`.
#[allow(dead_code)]
pub async fn response_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!(
                "response body is not JSON ({e}): {:?}",
                String::from_utf8_lossy(&bytes)
            )
        })
    };
    (status, json)
}

/// Split a response into status, headers, and raw body bytes.
#[allow(dead_code)]
pub async fn split_response(response: Response) -> (StatusCode, HeaderMap, Bytes) {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    (status, headers, bytes)
}

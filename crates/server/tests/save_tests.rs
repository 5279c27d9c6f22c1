//! Save flow tests: durable persistence, cache consumption, thumbnail
//! derivation, retry after storage failure, and ownership enforcement.

mod common;

use armature_storage::ObjectStore;
use axum::http::{StatusCode, header};
use common::fixtures::{model_glb_with_png, valid_model_glb};
use common::inference::RIGGED_SUFFIX;
use common::server::{TestServer, json_request, response_json, split_response};
use std::time::Duration;
use uuid::Uuid;

const PLACEHOLDER_THUMBNAIL: &str = "placeholder://avatar-thumbnail";

/// Upload, rig on the free plan, and return the session id.
async fn rigged_session(server: &TestServer, owner_id: Uuid, file: &[u8]) -> Uuid {
    let temp_id = server.upload(owner_id, file).await;
    let (status, body) = server.rig(owner_id, temp_id, "free").await;
    assert_eq!(status, StatusCode::OK, "rig failed: {body}");
    temp_id
}

#[tokio::test]
async fn test_save_persists_model_and_consumes_cache_entry() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let glb = valid_model_glb();
    let session_id = rigged_session(&server, owner_id, &glb).await;

    let (status, body) = server
        .save(owner_id, &session_id.to_string(), "Scout")
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["name"], "Scout");
    assert_eq!(body["ownerId"], owner_id.to_string());
    assert_eq!(body["isRigged"], true);
    assert_eq!(body["boneCount"], 60);
    assert_eq!(body["fileSize"], (glb.len() + RIGGED_SUFFIX.len()) as u64);
    // No embedded image in this model, so the placeholder stands in.
    assert_eq!(body["thumbnailUrl"], PLACEHOLDER_THUMBNAIL);

    let avatar_id = body["id"].as_str().unwrap();
    let model_key = format!("avatars/{owner_id}/{avatar_id}.glb");
    assert_eq!(body["modelUrl"], model_key);
    let stored = server.storage.get(&model_key).await.unwrap();
    let expected = [glb.as_slice(), RIGGED_SUFFIX].concat();
    assert_eq!(stored.as_ref(), expected.as_slice());

    // The cache entry, the temp record, and the spooled upload are all
    // consumed by a successful save.
    let response = server
        .send(json_request(
            "GET",
            &format!("/api/v1/rigs/{session_id}/preview"),
            Some(owner_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(server.state.temp_avatars.get(session_id).await.is_none());
    let spool_path = server
        .state
        .config
        .server
        .upload_dir
        .join(format!("{session_id}.glb"));
    assert!(!spool_path.exists());

    let (status, fetched) = response_json(
        server
            .send(json_request(
                "GET",
                &format!("/api/v1/avatars/{avatar_id}"),
                Some(owner_id),
                None,
            ))
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Scout");
    assert_eq!(fetched["modelUrl"], model_key);

    let (status, listing) = response_json(
        server
            .send(json_request("GET", "/api/v1/avatars", Some(owner_id), None))
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_avatar_model_streams_persisted_bytes() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let glb = valid_model_glb();
    let session_id = rigged_session(&server, owner_id, &glb).await;
    let (_, saved) = server
        .save(owner_id, &session_id.to_string(), "Scout")
        .await;
    let avatar_id = saved["id"].as_str().unwrap();

    let (status, headers, bytes) = split_response(
        server
            .send(json_request(
                "GET",
                &format!("/api/v1/avatars/{avatar_id}/model"),
                Some(owner_id),
                None,
            ))
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "model/gltf-binary");
    let expected = [glb.as_slice(), RIGGED_SUFFIX].concat();
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        expected.len().to_string().as_str()
    );
    assert_eq!(bytes.as_ref(), expected.as_slice());
}

#[tokio::test]
async fn test_save_unknown_session_is_cache_miss() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let (status, body) = server
        .save(owner_id, &Uuid::new_v4().to_string(), "Ghost")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "cache_miss");

    let (_, listing) = response_json(
        server
            .send(json_request("GET", "/api/v1/avatars", Some(owner_id), None))
            .await,
    )
    .await;
    assert!(listing.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_save_after_eviction_is_cache_miss() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let session_id = rigged_session(&server, owner_id, &valid_model_glb()).await;

    let evicted = server.state.rig_cache.evict_expired(Duration::ZERO).await;
    assert_eq!(evicted, 1);

    let (status, body) = server
        .save(owner_id, &session_id.to_string(), "Late")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "cache_miss");
}

#[tokio::test]
async fn test_save_foreign_session_is_forbidden_and_preserves_entry() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let intruder_id = Uuid::new_v4();
    let session_id = rigged_session(&server, owner_id, &valid_model_glb()).await;

    let (status, body) = server
        .save(intruder_id, &session_id.to_string(), "Stolen")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "ownership_mismatch");

    // The rightful owner can still preview and save.
    let response = server
        .send(json_request(
            "GET",
            &format!("/api/v1/rigs/{session_id}/preview"),
            Some(owner_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_save_rejects_blank_name() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let session_id = rigged_session(&server, owner_id, &valid_model_glb()).await;

    let (status, body) = server.save(owner_id, &session_id.to_string(), "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_failed_persist_keeps_entry_for_retry() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let session_id = rigged_session(&server, owner_id, &valid_model_glb()).await;

    server.storage.fail_puts(true);
    let (status, body) = server
        .save(owner_id, &session_id.to_string(), "Flaky")
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "persistence_failure");

    // The cached rig survived the failed save, so the retry needs no new
    // inference round.
    let response = server
        .send(json_request(
            "GET",
            &format!("/api/v1/rigs/{session_id}/preview"),
            Some(owner_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    server.storage.fail_puts(false);
    let (status, body) = server
        .save(owner_id, &session_id.to_string(), "Flaky")
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(server.engine.invocations(), 1);

    let response = server
        .send(json_request(
            "GET",
            &format!("/api/v1/rigs/{session_id}/preview"),
            Some(owner_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_derives_thumbnail_from_embedded_image() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let session_id = rigged_session(&server, owner_id, &model_glb_with_png()).await;

    let (status, body) = server
        .save(owner_id, &session_id.to_string(), "Textured")
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let avatar_id = body["id"].as_str().unwrap();
    let thumbnail_key = format!("thumbnails/{owner_id}/{avatar_id}.png");
    assert_eq!(body["thumbnailUrl"], thumbnail_key);

    // The thumbnail upload is detached from the request; give it a moment.
    let mut uploaded = false;
    for _ in 0..20 {
        if server.storage.exists(&thumbnail_key).await.unwrap() {
            uploaded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(uploaded, "thumbnail object never appeared");
    let bytes = server.storage.get(&thumbnail_key).await.unwrap();
    assert_eq!(
        bytes.as_ref(),
        &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n']
    );
}

#[tokio::test]
async fn test_delete_avatar_removes_record_and_object() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let session_id = rigged_session(&server, owner_id, &valid_model_glb()).await;
    let (_, saved) = server
        .save(owner_id, &session_id.to_string(), "Doomed")
        .await;
    let avatar_id = saved["id"].as_str().unwrap().to_string();
    let model_key = saved["modelUrl"].as_str().unwrap().to_string();
    assert!(server.storage.exists(&model_key).await.unwrap());

    let response = server
        .send(json_request(
            "DELETE",
            &format!("/api/v1/avatars/{avatar_id}"),
            Some(owner_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .send(json_request(
            "GET",
            &format!("/api/v1/avatars/{avatar_id}"),
            Some(owner_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!server.storage.exists(&model_key).await.unwrap());

    let response = server
        .send(json_request(
            "DELETE",
            &format!("/api/v1/avatars/{avatar_id}"),
            Some(owner_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_foreign_avatar_is_forbidden() {
    let server = TestServer::new().await;
    let owner_id = Uuid::new_v4();
    let intruder_id = Uuid::new_v4();
    let session_id = rigged_session(&server, owner_id, &valid_model_glb()).await;
    let (_, saved) = server
        .save(owner_id, &session_id.to_string(), "Guarded")
        .await;
    let avatar_id = saved["id"].as_str().unwrap();

    let response = server
        .send(json_request(
            "DELETE",
            &format!("/api/v1/avatars/{avatar_id}"),
            Some(intruder_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .send(json_request(
            "GET",
            &format!("/api/v1/avatars/{avatar_id}"),
            Some(owner_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_listing_is_scoped_to_the_requesting_owner() {
    let server = TestServer::new().await;
    let first_owner = Uuid::new_v4();
    let second_owner = Uuid::new_v4();

    for (owner_id, name) in [
        (first_owner, "Alpha"),
        (first_owner, "Beta"),
        (second_owner, "Gamma"),
    ] {
        let session_id = rigged_session(&server, owner_id, &valid_model_glb()).await;
        let (status, body) = server.save(owner_id, &session_id.to_string(), name).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (_, listing) = response_json(
        server
            .send(json_request("GET", "/api/v1/avatars", Some(first_owner), None))
            .await,
    )
    .await;
    let names: Vec<&str> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|avatar| avatar["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Alpha"));
    assert!(names.contains(&"Beta"));

    let (_, listing) = response_json(
        server
            .send(json_request("GET", "/api/v1/avatars", Some(second_owner), None))
            .await,
    )
    .await;
    let names: Vec<&str> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|avatar| avatar["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Gamma"]);
}

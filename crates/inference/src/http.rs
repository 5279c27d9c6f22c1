//! HTTP client for the rigging inference collaborator.

use crate::error::{InferenceError, InferenceResult};
use crate::traits::{RigEngine, RigJob, RiggedModel};
use armature_core::config::InferenceConfig;
use armature_core::{GLB_CONTENT_TYPE, GlbAnalysis, RigOutcome, TierConfig};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use reqwest::multipart;
use serde::{Deserialize, Serialize};

/// HTTP client for a remote rigging service.
///
/// Speaks `multipart/form-data`: the raw GLB in a `model` part and the
/// analysis plus tier limits as a JSON `parameters` part. The reply
/// carries the rigged GLB standard-base64 inside JSON.
pub struct HttpRigEngine {
    http: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

/// The `parameters` part body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RigParameters<'a> {
    analysis: &'a GlbAnalysis,
    tier: &'a TierConfig,
}

/// Success reply from the collaborator.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RigResponse {
    bone_count: u32,
    #[serde(default)]
    morph_target_names: Vec<String>,
    #[serde(default)]
    has_face_rig: bool,
    #[serde(default)]
    has_body_rig: bool,
    #[serde(default)]
    has_hand_rig: bool,
    /// Rigged GLB container, standard base64.
    model: String,
}

/// Error reply shape; the collaborator is not guaranteed to send it.
#[derive(Debug, Deserialize)]
struct RigErrorBody {
    error: String,
}

impl HttpRigEngine {
    /// Build a client from configuration.
    ///
    /// The request timeout matches the orchestrator's job ceiling, so
    /// whichever fires first reports the timeout.
    pub fn from_config(config: &InferenceConfig) -> InferenceResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| InferenceError::Config(format!("building http client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn build_form(job: &RigJob) -> InferenceResult<multipart::Form> {
        let parameters = serde_json::to_string(&RigParameters {
            analysis: &job.analysis,
            tier: &job.tier,
        })
        .map_err(|e| InferenceError::Config(format!("encoding rig parameters: {e}")))?;

        let model_part = multipart::Part::stream(job.buffer.clone())
            .file_name("model.glb")
            .mime_str(GLB_CONTENT_TYPE)
            .map_err(|e| InferenceError::Config(format!("building model part: {e}")))?;
        let parameters_part = multipart::Part::text(parameters)
            .mime_str("application/json")
            .map_err(|e| InferenceError::Config(format!("building parameters part: {e}")))?;

        Ok(multipart::Form::new()
            .part("model", model_part)
            .part("parameters", parameters_part))
    }
}

#[async_trait]
impl RigEngine for HttpRigEngine {
    #[tracing::instrument(
        skip(self, job),
        fields(source_bytes = job.buffer.len(), plan = %job.tier.plan_id)
    )]
    async fn rig(&self, job: RigJob) -> InferenceResult<RiggedModel> {
        let url = format!("{}/v1/rig", self.endpoint);
        let mut request = self.http.post(&url).multipart(Self::build_form(&job)?);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(InferenceError::Rejected {
                status: status.as_u16(),
                detail: rejection_detail(&body),
            });
        }

        let rigged = decode_rigged(&body)?;
        tracing::debug!(
            rigged_bytes = rigged.buffer.len(),
            bone_count = rigged.outcome.bone_count,
            "rig job completed"
        );
        Ok(rigged)
    }
}

fn map_transport_error(error: reqwest::Error) -> InferenceError {
    if error.is_connect() {
        InferenceError::Unreachable(error.to_string())
    } else if error.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Unreachable(error.to_string())
    }
}

/// Prefer the structured `{"error": ...}` detail, fall back to raw text.
fn rejection_detail(body: &[u8]) -> String {
    match serde_json::from_slice::<RigErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

fn decode_rigged(body: &[u8]) -> InferenceResult<RiggedModel> {
    let response: RigResponse = serde_json::from_slice(body)
        .map_err(|e| InferenceError::Decode(format!("response body: {e}")))?;
    let buffer = BASE64
        .decode(&response.model)
        .map_err(|e| InferenceError::Decode(format!("model payload: {e}")))?;

    Ok(RiggedModel {
        buffer: Bytes::from(buffer),
        outcome: RigOutcome {
            bone_count: response.bone_count,
            morph_target_names: response.morph_target_names,
            has_face_rig: response.has_face_rig,
            has_body_rig: response.has_body_rig,
            has_hand_rig: response.has_hand_rig,
        },
    })
}

//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use uuid::Uuid;

/// Header carrying the caller's owner identity, injected by the platform
/// gateway in front of this service.
pub const OWNER_ID_HEADER: &str = "x-owner-id";

/// Extract and parse the owner id header.
pub fn owner_id_header(headers: &HeaderMap) -> ApiResult<Uuid> {
    let raw = headers
        .get(OWNER_ID_HEADER)
        .ok_or_else(|| ApiError::BadRequest(format!("missing {OWNER_ID_HEADER} header")))?
        .to_str()
        .map_err(|_| {
            ApiError::BadRequest(format!("{OWNER_ID_HEADER} header is not valid UTF-8"))
        })?;
    Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("invalid {OWNER_ID_HEADER} header: {e}")))
}

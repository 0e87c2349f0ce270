//! Face detection endpoint

use axum::{body::Bytes, extract::State, Json};
use facetag_common::detection::DetectionOutcome;

use super::ApiError;
use crate::AppState;

/// POST /api/detect
///
/// Body: raw PNG or JPEG bytes. Returns fresh, unclaimed face records in
/// normalized coordinates; nothing is persisted. When no face survives, the
/// response is 422 with a message pointing the user to manual tagging.
pub async fn detect_faces(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DetectionOutcome>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Request body must contain an image"));
    }
    let outcome = state.detection.detect_bytes(body.to_vec()).await?;
    Ok(Json(outcome))
}

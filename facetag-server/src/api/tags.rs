//! Self-serve tag list endpoints
//!
//! Unlike the event endpoint, a POST here replaces the whole list: the list
//! is fed by one shared tagging surface, not by independent editors.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use facetag_common::api::{SaveTagsResponse, SuccessResponse, TagListResponse};
use facetag_common::FaceRecord;
use serde_json::Value;
use tracing::info;

use super::event::validate_records;
use super::ApiError;
use crate::AppState;

/// GET /api/tags
pub async fn get_tags(State(state): State<AppState>) -> Result<Json<TagListResponse>, ApiError> {
    let tags = state.tags.get().await?;
    Ok(Json(TagListResponse { tags }))
}

/// POST /api/tags
///
/// Body: `{tags: [...]}`.
pub async fn save_tags(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SaveTagsResponse>, ApiError> {
    let Json(mut body) = body?;
    let tags = match body.get_mut("tags").map(Value::take) {
        Some(value @ Value::Array(_)) => serde_json::from_value::<Vec<FaceRecord>>(value)
            .map_err(|e| ApiError::bad_request(format!("Invalid tag: {}", e)))?,
        _ => return Err(ApiError::bad_request("Tags must be an array")),
    };
    validate_records(&tags)?;

    let count = state.tags.replace(tags).await?;
    info!(count, "Tag list replaced");
    Ok(Json(SaveTagsResponse {
        success: true,
        count,
    }))
}

/// DELETE /api/tags
pub async fn clear_tags(State(state): State<AppState>) -> Result<Json<SuccessResponse>, ApiError> {
    state.tags.clear().await?;
    info!("Tag list cleared");
    Ok(Json(SuccessResponse { success: true }))
}

//! Event state endpoints
//!
//! Saves are reconciled with the persisted state: records are replaced by id
//! or appended, never dropped for being absent. Deleting a record takes an
//! explicit DELETE.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use facetag_common::api::{DeleteFaceResponse, SaveEventRequest, SaveEventResponse};
use facetag_common::{EventState, FaceRecord};
use tracing::debug;

use super::ApiError;
use crate::AppState;

/// GET /api/event
pub async fn get_event(State(state): State<AppState>) -> Result<Json<EventState>, ApiError> {
    Ok(Json(state.events.load().await?))
}

/// POST /api/event
///
/// Body: `{imageUrl?, faces[]}`. Returns the merged state now persisted.
pub async fn save_event(
    State(state): State<AppState>,
    body: Result<Json<SaveEventRequest>, JsonRejection>,
) -> Result<Json<SaveEventResponse>, ApiError> {
    let Json(request) = body?;
    validate_records(&request.faces)?;
    debug!(faces = request.faces.len(), "Saving event data");

    let data = state
        .events
        .save(request.image_url.as_deref(), &request.faces)
        .await?;
    Ok(Json(SaveEventResponse {
        success: true,
        data,
    }))
}

/// DELETE /api/event/faces/:id
pub async fn delete_face(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteFaceResponse>, ApiError> {
    let (removed, data) = state.events.remove(&[id]).await?;
    Ok(Json(DeleteFaceResponse {
        success: true,
        removed,
        data,
    }))
}

/// Reject records that are not valid normalized overlays
pub(crate) fn validate_records(records: &[FaceRecord]) -> Result<(), ApiError> {
    for record in records {
        record.validate()?;
    }
    Ok(())
}

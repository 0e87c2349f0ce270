//! Request/response bodies for the event and tag list endpoints

use serde::{Deserialize, Serialize};

use crate::model::{EventState, FaceRecord};

/// POST /api/event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEventRequest {
    /// Absent or blank keeps the current photo reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub faces: Vec<FaceRecord>,
}

/// Response to POST /api/event: the merged state now persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEventResponse {
    pub success: bool,
    pub data: EventState,
}

/// Response to DELETE /api/event/faces/:id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteFaceResponse {
    pub success: bool,
    pub removed: usize,
    pub data: EventState,
}

/// GET /api/tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagListResponse {
    pub tags: Vec<FaceRecord>,
}

/// POST /api/tags: replaces the whole list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveTagsRequest {
    pub tags: Vec<FaceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveTagsResponse {
    pub success: bool,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

//! HTTP wire types shared by the server and its clients
//!
//! Pure data, no HTTP framework dependency.

pub mod types;

pub use types::{
    DeleteFaceResponse, ErrorResponse, SaveEventRequest, SaveEventResponse, SaveTagsRequest,
    SaveTagsResponse, SuccessResponse, TagListResponse,
};

//! Error → HTTP response mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use facetag_common::api::ErrorResponse;
use facetag_common::{DetectionError, Error};
use tracing::error;

/// Handler error carrying a status and a human-readable reason
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Detection(d) => detection_status(d),
            Error::Io(_) | Error::Json(_) | Error::Config(_) | Error::Remote(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<DetectionError> for ApiError {
    fn from(err: DetectionError) -> Self {
        Error::Detection(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

fn detection_status(err: &DetectionError) -> StatusCode {
    match err {
        DetectionError::NoFacesFound => StatusCode::UNPROCESSABLE_ENTITY,
        DetectionError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        DetectionError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DetectionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        DetectionError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

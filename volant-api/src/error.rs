//! `ApiError`: a newtype wrapping `volant_core::Error` with a hand-written
//! `IntoResponse` mapping each error kind to an HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use volant_core::Error as CoreError;

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError(CoreError::Internal(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::AlreadyExists(_) => StatusCode::CONFLICT,
            CoreError::ResourceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::PreconditionFailed(_) => StatusCode::CONFLICT,
            CoreError::Integrity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::HostOs(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Hypervisor(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

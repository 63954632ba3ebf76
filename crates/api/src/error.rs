use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use stockcast_core::error::StockcastError;

/// A `StockcastError` on its way out as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub StockcastError);

impl From<StockcastError> for ApiError {
    fn from(err: StockcastError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            StockcastError::ArtifactNotFound(_) => (StatusCode::NOT_FOUND, "artifact_not_found"),
            StockcastError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            StockcastError::InsufficientHistory { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_history")
            }
            StockcastError::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "upstream_unavailable"),
            StockcastError::DataError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "data_error"),
            StockcastError::ModelError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "model_error"),
            StockcastError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            error!("{} ({}): {}", status, kind, self.0);
        } else {
            warn!("{} ({}): {}", status, kind, self.0);
        }
        (status, Json(json!({ "error": kind, "message": self.0.to_string() }))).into_response()
    }
}

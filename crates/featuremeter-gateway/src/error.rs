//! HTTP mapping for errors returned by feature handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use featuremeter_core::error::{ClientCode, FeatureMeterError};

/// Error body: `{"error": {"code": ..., "message": ...}}`.
pub struct ApiError(pub FeatureMeterError);

impl From<FeatureMeterError> for ApiError {
    fn from(e: FeatureMeterError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status = match code {
            ClientCode::BadRequest => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = json!({
            "error": { "code": code.as_str(), "message": self.0.to_string() }
        });
        (status, Json(body)).into_response()
    }
}

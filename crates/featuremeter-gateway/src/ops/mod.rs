//! Operational HTTP endpoints.
//!
//! - `/health` : liveness, with a naive-UTC ISO-8601 timestamp

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    let timestamp = Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string();
    (StatusCode::OK, Json(json!({ "status": "ok", "timestamp": timestamp })))
}

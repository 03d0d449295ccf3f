//! Axum router wiring for the primary service.
//!
//! - `GET /health`
//! - `POST /upload?filename=...` (raw body)
//! - `POST <route>` (JSON object) for each configured feature
//!
//! Feature bodies that are not a JSON object are rejected by the extractor
//! (422) before dispatch, so they never count as feature invocations.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::{app_state::AppState, ops};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(ops::health))
        .route("/upload", post(upload));

    for f in &state.cfg().features {
        let feature = f.name.clone();
        router = router.route(
            &f.route,
            post(move |State(state): State<AppState>, Json(payload): Json<Map<String, Value>>| {
                let feature = feature.clone();
                async move {
                    state
                        .features()
                        .dispatch(&feature, Value::Object(payload))
                        .await
                        .map(Json)
                        .map_err(ApiError::from)
                }
            }),
        );
    }

    router.with_state(state)
}

async fn upload(
    State(state): State<AppState>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Json<Value> {
    Json(state.upload().store(q.filename.as_deref(), body).await)
}

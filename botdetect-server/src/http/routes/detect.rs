//! Plugin detection uploads

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use botdetect_core::{BatchRejection, Detection, DetectionBatch};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidPath};
use crate::http::server::AppState;

/// POST /{version}/plugin/detect/{manual_detect}
///
/// Shapes the batch, queues it and answers before any database work.
async fn detect(
    State(state): State<Arc<AppState>>,
    ValidPath((version, manual_detect)): ValidPath<(String, i64)>,
    ValidJson(detections): ValidJson<Vec<Detection>>,
) -> Result<Json<Value>, ApiError> {
    let submitted = detections.len();

    let batch = match DetectionBatch::new(detections, manual_detect) {
        Ok(batch) => batch,
        Err(BatchRejection::Empty) => {
            debug!(version = %version, "Empty detection batch");
            return Ok(Json(json!({ "ok": "ok" })));
        }
        Err(rejection) => return Err(rejection.into()),
    };

    let reporter = batch.reporter().to_owned();
    let (queued, manual) = (batch.len(), batch.manual_detect());

    let id = state.detections.submit(batch)?;
    info!(
        batch = %id,
        version = %version,
        reporter = %reporter,
        submitted,
        queued,
        manual,
        "Detections queued"
    );

    Ok(Json(json!({ "ok": "ok" })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/{version}/plugin/detect/{manual_detect}", post(detect))
}

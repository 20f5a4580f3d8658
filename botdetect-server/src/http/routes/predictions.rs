//! Ban-likelihood predictions for the website and plugin

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use botdetect_core::PredictionResponse;
use tracing::debug;

use crate::http::auth;
use crate::http::error::ApiError;
use crate::http::extractors::ValidPath;
use crate::http::server::AppState;

async fn predict(
    state: &AppState,
    player_name: &str,
    versioned: bool,
    token: Option<&str>,
) -> Result<PredictionResponse, ApiError> {
    let debug_mode = match token {
        Some(token) => auth::is_known(&state.pool, token).await,
        None => false,
    };
    debug!(player = %player_name, debug = debug_mode, versioned, "Prediction requested");

    if let Some(response) = PredictionResponse::canned(player_name) {
        return Ok(response);
    }

    let prediction = state.model.predict(player_name, debug_mode).await?;
    Ok(PredictionResponse::from_prediction(prediction, versioned))
}

/// GET /site/prediction/{player_name}
async fn unversioned(
    State(state): State<Arc<AppState>>,
    ValidPath(player_name): ValidPath<String>,
) -> Result<Json<PredictionResponse>, ApiError> {
    Ok(Json(predict(&state, &player_name, false, None).await?))
}

/// GET /{version}/site/prediction/{player_name}
async fn versioned(
    State(state): State<Arc<AppState>>,
    ValidPath((_version, player_name)): ValidPath<(String, String)>,
) -> Result<Json<PredictionResponse>, ApiError> {
    Ok(Json(predict(&state, &player_name, true, None).await?))
}

/// GET /{version}/site/prediction/{player_name}/{token}
async fn versioned_with_token(
    State(state): State<Arc<AppState>>,
    ValidPath((_version, player_name, token)): ValidPath<(String, String, String)>,
) -> Result<Json<PredictionResponse>, ApiError> {
    Ok(Json(predict(&state, &player_name, true, Some(&token)).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/site/prediction/{player_name}", get(unversioned).post(unversioned))
        .route("/{version}/site/prediction/{player_name}", get(versioned).post(versioned))
        .route(
            "/{version}/site/prediction/{player_name}/{token}",
            get(versioned_with_token).post(versioned_with_token),
        )
}

//! Prediction model seam
//!
//! The classifier lives outside this service. Handlers only see the
//! `PredictionModel` trait; the backend is picked from `[model]` settings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use botdetect_core::{to_jagex_name, Prediction};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;

use crate::config::{ModelBackend, ModelSettings};
use crate::db::{DbError, PredictionRepo};

/// Model error
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no prediction for player '{0}'")]
    UnknownPlayer(String),

    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model backend misconfigured: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Source of ban-likelihood predictions
#[async_trait]
pub trait PredictionModel: Send + Sync {
    /// Predict for a player. `debug_mode` asks the backend for a fresh,
    /// uncached run when it supports one.
    async fn predict(&self, player_name: &str, debug_mode: bool) -> Result<Prediction, ModelError>;
}

/// Build the configured backend.
pub fn from_settings(
    settings: &ModelSettings,
    pool: PgPool,
) -> Result<Arc<dyn PredictionModel>, ModelError> {
    match settings.backend {
        ModelBackend::Stored => Ok(Arc::new(StoredModel::new(pool))),
        ModelBackend::Remote => {
            let url = settings
                .url
                .clone()
                .ok_or_else(|| ModelError::Config("model.url is not set".into()))?;
            let model = RemoteModel::new(url, Duration::from_secs(settings.timeout_secs))?;
            Ok(Arc::new(model))
        }
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    player_name: &'a str,
    debug: bool,
}

/// Inference service reached over HTTP
pub struct RemoteModel {
    client: Client,
    url: String,
}

impl RemoteModel {
    pub fn new(url: String, timeout: Duration) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PredictionModel for RemoteModel {
    async fn predict(&self, player_name: &str, debug_mode: bool) -> Result<Prediction, ModelError> {
        debug!(player = %player_name, debug = debug_mode, "Requesting prediction");

        let response = self
            .client
            .post(&self.url)
            .json(&PredictRequest {
                player_name,
                debug: debug_mode,
            })
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ModelError::UnknownPlayer(player_name.to_owned()));
        }

        let prediction = response.error_for_status()?.json::<Prediction>().await?;
        Ok(prediction)
    }
}

/// Predictions precomputed into the `predictions` table
pub struct StoredModel {
    pool: PgPool,
}

impl StoredModel {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionModel for StoredModel {
    async fn predict(&self, player_name: &str, _debug: bool) -> Result<Prediction, ModelError> {
        PredictionRepo::new(&self.pool)
            .get(player_name)
            .await?
            .ok_or_else(|| ModelError::UnknownPlayer(player_name.to_owned()))
    }
}

/// Fixed answers keyed by normalised name, for tests and offline runs
#[derive(Default)]
pub struct FixedModel {
    predictions: HashMap<String, Prediction>,
}

impl FixedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prediction: Prediction) -> Self {
        self.predictions
            .insert(to_jagex_name(&prediction.player_name), prediction);
        self
    }
}

#[async_trait]
impl PredictionModel for FixedModel {
    async fn predict(&self, player_name: &str, _debug: bool) -> Result<Prediction, ModelError> {
        self.predictions
            .get(&to_jagex_name(player_name))
            .cloned()
            .ok_or_else(|| ModelError::UnknownPlayer(player_name.to_owned()))
    }
}

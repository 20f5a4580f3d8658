//! Axum server setup
//!
//! Server skeleton with:
//! - CORS, permissive unless `server.cors_permissive = false`
//! - Tracing and timeout middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C, then the detection queue drains

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::config::{ServerSettings, Settings};
use crate::db::LockRetry;
use crate::model::{self, ModelError, PredictionModel};
use crate::queue::{DbDetectionProcessor, DetectionQueue};
use crate::webhook::{self, FeedbackBroadcaster, WebhookError};

/// Request body cap; a full detection batch or scraper upload runs to
/// several megabytes
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    pub detections: DetectionQueue,
    pub model: Arc<dyn PredictionModel>,
    pub webhook: Arc<dyn FeedbackBroadcaster>,
    /// Retry policy for hiscore inserts
    pub retry: LockRetry,
    /// Rows per hiscore/player batch on the scraper upload
    pub scraper_batch_size: usize,
}

/// Build the router with every route and middleware layer.
pub fn build_router(state: Arc<AppState>, server: &ServerSettings) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::detect::router())
        .merge(routes::contributions::router())
        .merge(routes::scraper::router())
        .merge(routes::predictions::router())
        .merge(routes::feedback::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            server.request_timeout(),
        ))
        .layer(cors_layer(server.cors_permissive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    tracing::info!("CORS: restricted to localhost origins");
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            let origin = origin.as_bytes();
            origin.starts_with(b"http://localhost") || origin.starts_with(b"http://127.0.0.1")
        }))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// # Example
///
/// ```ignore
/// let settings = Settings::load()?;
/// let pool = create_pool(&settings.database).await?;
/// run_server(settings, pool).await?;
/// ```
pub async fn run_server(settings: Settings, pool: PgPool) -> Result<(), ServerError> {
    let model = model::from_settings(&settings.model, pool.clone())?;
    let webhook = webhook::from_settings(&settings.webhook)?;

    let processor = Arc::new(DbDetectionProcessor::new(pool.clone()));
    let (detections, workers) = DetectionQueue::start(
        processor,
        settings.detections.workers,
        settings.detections.queue_capacity,
    );

    let state = AppState {
        pool,
        detections,
        model,
        webhook,
        retry: LockRetry::from_settings(&settings.scraper),
        scraper_batch_size: settings.scraper.batch_size,
    };
    let app = build_router(Arc::new(state), &settings.server);

    let listener = TcpListener::bind(settings.server.bind_addr).await?;
    tracing::info!(
        model = ?settings.model.backend,
        "Server listening on {}",
        settings.server.bind_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it every queue handle) is gone; let workers finish
    workers.shutdown().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

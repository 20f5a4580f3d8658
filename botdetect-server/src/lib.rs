//! botdetect-server: HTTP API for the bot detector
//!
//! Plugin detections, scraper hiscore uploads, ban predictions, prediction
//! feedback and contributor statistics over PostgreSQL.

pub mod config;
pub mod db;
pub mod http;
pub mod model;
pub mod queue;
pub mod webhook;

pub use config::{ConfigError, Settings};
pub use http::{build_router, run_server, ApiError, AppState, ServerError};
pub use queue::{DetectionProcessor, DetectionQueue, WorkerPool};

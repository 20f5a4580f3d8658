//! HTTP server layer
//!
//! Axum server with:
//! - Permissive CORS by default (plugin and website call cross-origin)
//! - Request tracing and timeouts
//! - Graceful shutdown that drains the detection queue
//! - JSON error responses

pub mod auth;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerError};

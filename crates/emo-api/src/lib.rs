//! Axum HTTP API server for multimodal emotion checks.
//!
//! This crate provides:
//! - `POST /predict`, the upload → trim → extract → fuse → decide pipeline
//! - Liveness and readiness probes
//! - Per-IP rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use pipeline::{EmotionPipeline, PipelineLimits, PredictRequest};
pub use routes::create_router;
pub use state::AppState;

//! Request limits.
//!
//! # Responsibilities
//! - Enforce maximum request body size
//! - Enforce a request deadline
//!
//! # Design Decisions
//! - Oversized bodies are rejected with 413 before handlers read them
//! - Timed-out requests return 408
//! - Both rejections are bare; `http::error::json_rejections` gives them
//!   the JSON error shape

use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::config::ServerConfig;

pub fn apply(router: Router, config: &ServerConfig) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
}

//! Uniform error responses.
//!
//! # Responsibilities
//! - Turn handler failures and panics into a single fault marker
//! - Log every fault once, with full detail, server-side
//! - Render faults as `{error, message?}`, hiding detail in production
//! - Answer unmatched routes with `{error: "Route not found"}`
//! - Give bare 408/413 rejections from the limit layers the same JSON shape
//!
//! # Design Decisions
//! - Handlers never format fault bodies themselves; they return [`AppError`]
//!   and [`format_faults`] decides what the client sees
//! - Panics are caught by `CatchPanicLayer` and routed through the same path

use std::any::Any;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::config::Environment;
use crate::db::{ConfigurationError, PoolError};

pub const FAULT_MESSAGE: &str = "Something went wrong!";
pub const NOT_FOUND_MESSAGE: &str = "Route not found";
pub const TIMEOUT_MESSAGE: &str = "Request timed out";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Request body too large";

/// An unhandled failure inside a route handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    DatabaseUnavailable(#[from] ConfigurationError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }
}

/// Marker left in response extensions for [`format_faults`].
#[derive(Debug, Clone)]
pub struct HandlerFault {
    pub message: String,
}

fn fault_marker(message: String) -> Response {
    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response.extensions_mut().insert(HandlerFault { message });
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        fault_marker(self.to_string())
    }
}

/// `CatchPanicLayer` hook: convert a panic payload into a fault.
pub fn panic_to_fault(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    fault_marker(message)
}

#[derive(Debug, Serialize)]
struct FaultBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Render a fault for the client.
pub fn fault_response(fault: &HandlerFault, environment: Environment) -> Response {
    let body = FaultBody {
        error: FAULT_MESSAGE,
        message: (!environment.is_production()).then(|| fault.message.clone()),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// The single error-formatting stage.
pub async fn format_faults(State(environment): State<Environment>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let fault = response.extensions().get::<HandlerFault>().cloned();
    match fault {
        None => response,
        Some(fault) => {
            tracing::error!(
                method = %method,
                path = %path,
                error = %fault.message,
                "Unhandled handler fault"
            );
            fault_response(&fault, environment)
        }
    }
}

/// Rewrite non-JSON timeout and body-limit rejections as `{error}`.
pub async fn json_rejections(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    let message = match status {
        StatusCode::REQUEST_TIMEOUT => TIMEOUT_MESSAGE,
        StatusCode::PAYLOAD_TOO_LARGE => PAYLOAD_TOO_LARGE_MESSAGE,
        _ => return response,
    };

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        return response;
    }

    tracing::warn!(status = %status, "Request rejected by limits");
    (status, Json(json!({ "error": message }))).into_response()
}

/// Fallback for unmatched routes and methods.
pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": NOT_FOUND_MESSAGE })))
}

//! Request identification.
//!
//! # Responsibilities
//! - Assign every request a UUID v4 `x-request-id` unless the client sent one
//! - Echo the ID on the response
//! - Attach the ID to the request's trace span
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing

use axum::http::{HeaderName, Request};

pub use tower_http::request_id::MakeRequestUuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The request's ID, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span for `TraceLayer::make_span_with`.
pub fn make_span<B>(request: &Request<B>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tower_http::request_id::MakeRequestId;
    use uuid::Uuid;

    #[test]
    fn test_generated_ids_are_uuids() {
        let request = Request::new(Body::empty());
        let mut maker = MakeRequestUuid;
        let a = maker.make_request_id(&request).unwrap();
        let b = maker.make_request_id(&request).unwrap();
        let a = a.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(a).is_ok());
        assert_ne!(a, b.header_value().to_str().unwrap());
    }

    #[test]
    fn test_request_id_lookup() {
        let request = Request::builder()
            .header("x-request-id", "abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_id(&request), "abc");
        assert_eq!(request_id(&Request::new(Body::empty())), "unknown");
    }
}

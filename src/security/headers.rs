//! Security response headers.
//!
//! # Responsibilities
//! - Add a conservative set of hardening headers to every response
//!
//! # Design Decisions
//! - Headers are only set when the handler didn't set them already
//! - Values follow common defaults for JSON APIs served over HTTPS

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

/// Header name/value pairs applied by [`apply`].
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", "default-src 'self'; frame-ancestors 'self'; object-src 'none'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
];

/// Layer every entry of [`SECURITY_HEADERS`] onto `router`.
pub fn apply(router: Router) -> Router {
    let router = SECURITY_HEADERS.iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(*name),
            HeaderValue::from_static(*value),
        ))
    });
    // Don't advertise the stack.
    router.layer(SetResponseHeaderLayer::overriding(
        header::SERVER,
        HeaderValue::from_static("hospital-backend"),
    ))
}

//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → limits.rs (body size, request deadline)
//!     → handler
//!     → headers.rs (hardening response headers)
//! ```

pub mod headers;
pub mod limits;

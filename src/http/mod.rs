//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign request ID, open trace span)
//!     → health / domain handlers
//!     → error.rs (fault formatting, 404 fallback)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod server;

pub use error::AppError;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};

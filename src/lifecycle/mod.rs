//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build pool → Probe in background → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Close pool → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then pool, then listener
//! - Only a failed bind (or unparseable config) stops the process

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;

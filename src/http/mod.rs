//! HTTP demo service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing layer)
//!     → handlers.rs
//!         /api/call   → registry → breaker → simulated service
//!         /api/status → registry snapshot → breaker metrics
//!         /api/config → service table
//!     → JSON response
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, DemoServer};

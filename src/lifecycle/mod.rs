//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Ctrl+C or Shutdown::trigger → broadcast → server stops accepting → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;

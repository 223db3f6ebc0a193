//! Configuration management for the demo service.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DemoConfig (validated)
//!     → services + breaker registry built from it
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server applies new service profiles
//!     → breakers already registered keep their settings
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Breaker settings are fixed per breaker once it exists

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::BreakerSettings;
pub use schema::DemoConfig;
pub use schema::ServiceConfig;

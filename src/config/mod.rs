//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GracefulConfig (validated, immutable)
//!     → handed to the orchestrator, server and client tasks
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Every validation failure is reported, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ClientConfig, GracefulConfig, LogFormat, ObservabilityConfig, SecurityConfig, ServerConfig,
    ShutdownConfig,
};
pub use validation::ValidationError;

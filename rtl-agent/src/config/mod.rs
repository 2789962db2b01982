//! Public API for configuration

pub mod loader;
pub mod model;

// Re-export the main entrypoints:
pub use loader::{load, parse};
pub use model::{AgentConfig, Config, ConfigError, DatabaseConfig, LoggingConfig, SubprocessConfig};

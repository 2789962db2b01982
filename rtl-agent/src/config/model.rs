// src/config/model.rs

use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Top-level runtime config
#[derive(Debug, Clone)]
pub struct Config {
    pub agent:      AgentConfig,
    pub subprocess: SubprocessConfig,
    pub database:   DatabaseConfig,
    pub logging:    LoggingConfig,
}

/// Mirror of the whole TOML document before durations are parsed
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub agent:      RawAgentConfig,
    pub subprocess: SubprocessConfig,
    pub database:   DatabaseConfig,
    #[serde(default)]
    pub logging:    LoggingConfig,
}

/// Mirror of the `[agent]` table
#[derive(Debug, Deserialize)]
pub struct RawAgentConfig {
    pub pid_file: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
    #[serde(default)]
    pub debug: bool,
}
fn default_queue_capacity() -> usize { 1024 }
fn default_poll_interval() -> String { "100ms".into() }

/// Fully-typed `[agent]` section
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub pid_file:       PathBuf,
    pub queue_capacity: usize,
    pub poll_interval:  Duration,
    pub debug:          bool,
}

/// Mirror of the `[subprocess]` table: the capture tool we supervise
#[derive(Debug, Clone, Deserialize)]
pub struct SubprocessConfig {
    pub path:     PathBuf,
    #[serde(default = "default_args")]
    pub args:     Vec<String>,
    pub pid_file: PathBuf,
}
fn default_args() -> Vec<String> { vec!["-F".into(), "json".into()] }

/// Mirror of the `[database]` table
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_synchronous")]
    pub synchronous: String,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}
fn default_synchronous() -> String { "NORMAL".into() }
fn default_busy_timeout() -> u64 { 1_000 }

impl DatabaseConfig {
    /// Defaults for a store at `path`; handy when no TOML is involved.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            synchronous: default_synchronous(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// Mirror of the `[logging]` table
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]                      pub enable:   bool,
    #[serde(default = "default_log_file")] pub file:     PathBuf,
    #[serde(default = "default_level")]    pub level:    String,
    #[serde(default)]                      pub raw_file: Option<PathBuf>,
}
fn default_level() -> String { "INFO".into() }
fn default_log_file() -> PathBuf { PathBuf::from("rtl-agent.log") }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: default_log_file(), level: default_level(), raw_file: None }
    }
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),

    #[error("queue_capacity must be greater than zero")]
    InvalidCapacity,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use topicron_protocols::UpdatePolicy;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
}

/// Storage backend selection shared by the engine and the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Sqlite,
}

/// Backend job engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Database file for the sqlite engine.
    #[serde(default = "default_engine_path")]
    pub path: String,

    /// How often the runner polls the engine for due jobs.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    #[serde(default)]
    pub update_policy: UpdatePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            path: default_engine_path(),
            tick_interval_ms: default_tick_interval(),
            update_policy: UpdatePolicy::default(),
        }
    }
}

fn default_engine_path() -> String {
    "~/.topicron/engine.db".to_string()
}

fn default_tick_interval() -> u64 {
    1000
}

/// Schedule/resource store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "~/.topicron/store.db".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Write the log file as JSON lines.
    #[serde(default = "default_true")]
    pub json: bool,

    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: default_log_dir(),
            json: default_true(),
            max_files: default_max_files(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".topicron")
        .join("logs")
}

fn default_true() -> bool {
    true
}

fn default_max_files() -> usize {
    30
}

/// A logging topic handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub id: String,

    #[serde(default)]
    pub topics: Vec<String>,
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".topicron")
        .join("config.toml")
}

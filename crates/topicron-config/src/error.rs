//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Semantic validation failed. Each entry is `path: message`.
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

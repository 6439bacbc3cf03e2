//! Configuration validation.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::schema::{Backend, Config};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn errors into [`ConfigError::Invalid`], handing back the warnings otherwise.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        Err(ConfigError::Invalid(
            self.errors
                .iter()
                .map(|e| format!("{}: {}", e.path, e.message))
                .collect(),
        ))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_engine(config, &mut result);
        Self::validate_store(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_handlers(config, &mut result);

        result
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        let engine = &config.engine;
        if engine.tick_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "engine.tick_interval_ms",
                "tick_interval_ms must be greater than 0",
            ));
        }

        if engine.tick_interval_ms > 60_000 {
            result.add_warning(ValidationWarning::new(
                "engine.tick_interval_ms",
                "tick interval is over a minute, triggers may fire late",
            ));
        }

        if engine.backend == Backend::Sqlite && engine.path.trim().is_empty() {
            result.add_error(ValidationError::new(
                "engine.path",
                "sqlite engine requires a database path",
            ));
        }

        if engine.backend == Backend::Memory {
            result.add_warning(ValidationWarning::new(
                "engine.backend",
                "memory engine loses registered jobs on restart",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if config.store.backend == Backend::Sqlite && config.store.path.trim().is_empty() {
            result.add_error(ValidationError::new(
                "store.path",
                "sqlite store requires a database path",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!("Unknown log level: {}", config.logging.level),
            ));
        }

        if config.logging.max_files == 0 {
            result.add_error(ValidationError::new(
                "logging.max_files",
                "max_files must be greater than 0",
            ));
        }
    }

    fn validate_handlers(config: &Config, result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (i, handler) in config.handlers.iter().enumerate() {
            let path = format!("handlers[{}]", i);

            if handler.id.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.id", path),
                    "Handler id cannot be empty",
                ));
            } else if !seen.insert(handler.id.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.id", path),
                    format!("Duplicate handler id: {}", handler.id),
                ));
            }

            if handler.topics.is_empty() {
                result.add_warning(ValidationWarning::new(
                    format!("{}.topics", path),
                    "Handler has no topics and will never be invoked",
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::HandlerConfig;

    fn handler(id: &str, topics: &[&str]) -> HandlerConfig {
        HandlerConfig {
            id: id.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_validate_default_config() {
        let result = ConfigValidator::validate(&Config::default());
        assert!(result.is_valid());
        // memory engine warning
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_into_result() {
        let warnings = ConfigValidator::validate(&Config::default())
            .into_result()
            .unwrap();
        assert!(warnings.iter().any(|w| w.path == "engine.backend"));

        let mut config = Config::default();
        config.logging.max_files = 0;
        let err = ConfigValidator::validate(&config).into_result().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref found) if found.len() == 1));
    }

    #[test]
    fn test_validate_zero_tick_interval() {
        let mut config = Config::default();
        config.engine.tick_interval_ms = 0;
        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "engine.tick_interval_ms"));
    }

    #[test]
    fn test_validate_sqlite_requires_path() {
        let mut config = Config::default();
        config.store.backend = Backend::Sqlite;
        config.store.path = "  ".to_string();
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "store.path"));
    }

    #[test]
    fn test_validate_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "logging.level"));
    }

    #[test]
    fn test_validate_duplicate_handler_ids() {
        let mut config = Config::default();
        config.handlers = vec![handler("audit", &["orders"]), handler("audit", &["billing"])];
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.message.contains("Duplicate")));
    }

    #[test]
    fn test_validate_handler_without_topics_warns() {
        let mut config = Config::default();
        config.handlers = vec![handler("idle", &[])];
        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "handlers[0].topics"));
    }
}

//! Configuration for the quarry CLI
//!
//! Loads configuration from:
//! 1. quarry.yaml - compile defaults, logging, extra dialects
//! 2. .env file - loaded by `main` before this runs
//!
//! Environment variables always override quarry.yaml values.

use quarry_registry::DialectSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// What `quarry compile` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// SQL text
    #[default]
    Sql,
    /// SQL AST as JSON
    Ast,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sql" => Ok(OutputFormat::Sql),
            "ast" => Ok(OutputFormat::Ast),
            other => Err(ConfigError::InvalidValue {
                key: "output".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub default_dialect: String,
    pub output: OutputFormat,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            default_dialect: "postgres".to_string(),
            output: OutputFormat::Sql,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stderr, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            output: "stderr".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compile: CompileConfig,
    pub logging: LoggingConfig,

    /// Extra dialects registered next to the built-ins.
    pub dialects: Vec<DialectSpec>,

    /// YAML files holding further `dialects:` lists.
    pub dialect_files: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides.
    ///
    /// A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Config::default()
        };

        config.apply_env(env)?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dialect) = env("QUARRY_DIALECT") {
            self.compile.default_dialect = dialect;
        }
        if let Some(output) = env("QUARRY_OUTPUT") {
            self.compile.output = output.parse()?;
        }

        if let Some(level) = env("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = env("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(output) = env("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Some(dir) = env("LOG_DIR") {
            self.logging.directory = dir;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.compile.default_dialect, "postgres");
        assert_eq!(config.compile.output, OutputFormat::Sql);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.output, "stderr");
        assert!(config.dialects.is_empty());
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("quarry_missing_config.yaml");
        let config = Config::load_with(&path, no_env).unwrap();
        assert_eq!(config.compile.default_dialect, "postgres");
    }

    #[test]
    fn test_load_yaml() {
        let path = write_temp(
            "quarry_test_config.yaml",
            r#"
compile:
  default_dialect: risingwave
  output: ast
logging:
  level: debug
dialects:
  - name: warehouse
    unsupported: [Mode]
    aggregate_filter: false
"#,
        );

        let config = Config::load_with(&path, no_env).unwrap();
        assert_eq!(config.compile.default_dialect, "risingwave");
        assert_eq!(config.compile.output, OutputFormat::Ast);
        assert_eq!(config.logging.level, "debug");
        // Sections not given keep their defaults
        assert_eq!(config.logging.format, "compact");
        assert_eq!(config.dialects.len(), 1);
        assert!(!config.dialects[0].aggregate_filter);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_env_var_override() {
        let env: HashMap<&str, &str> = [
            ("QUARRY_DIALECT", "duckdb"),
            ("QUARRY_OUTPUT", "ast"),
            ("LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let path = write_temp(
            "quarry_env_config.yaml",
            "compile:\n  default_dialect: postgres\n",
        );
        let config =
            Config::load_with(&path, |key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.compile.default_dialect, "duckdb"); // Overridden
        assert_eq!(config.compile.output, OutputFormat::Ast); // Overridden
        assert_eq!(config.logging.format, "json");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_output_override() {
        let path = std::env::temp_dir().join("quarry_missing_config.yaml");
        let err = Config::load_with(&path, |key| {
            (key == "QUARRY_OUTPUT").then(|| "html".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { value, .. } if value == "html"));
    }
}

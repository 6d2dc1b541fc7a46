//! Configuration loaded with Figment.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. A TOML file (by default `datarefw.toml`, missing files are skipped)
//! 3. Environment variables prefixed with `DATAREFW_`, `__` separating
//!    nested keys
//!
//! # Example
//! ```no_run
//! use datarefw::config::DatarefwConfig;
//!
//! // DATAREFW_LOGGING__LEVEL=debug overrides [logging] level
//! let config = DatarefwConfig::load()?;
//! config.validate()?;
//! println!("log level: {}", config.logging.level);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "datarefw.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DATAREFW_";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatarefwConfig {
    /// Log output settings
    pub logging: LoggingConfig,
    /// Host access settings
    pub access: AccessConfig,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub level: String,
    /// Line format
    pub format: LogFormat,
    /// Where formatted lines go
    pub target: LogTarget,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            target: LogTarget::Host,
        }
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One line per event
    Compact,
    /// One JSON object per event
    Json,
}

/// Destination for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// The simulator's log file
    Host,
    /// Standard error of the host process
    Stderr,
}

/// Host access settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Trap when the data API is called from a thread other than the one
    /// that started the plugin
    pub single_thread_check: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            single_thread_check: true,
        }
    }
}

impl DatarefwConfig {
    /// Load from `datarefw.toml` and the environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file path and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// The layered provider, for callers that want to add their own sources.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let level = self.logging.level.to_lowercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LEVELS.join(", ")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DatarefwConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.target, LogTarget::Host);
        assert!(config.access.single_thread_check);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let config = DatarefwConfig::load_from("/nonexistent/datarefw.toml").unwrap();
        assert_eq!(config, DatarefwConfig::default());
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = \"json\"").unwrap();

        let config = DatarefwConfig::load_from(file.path()).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert!(config.access.single_thread_check);
    }

    #[test]
    fn test_invalid_level() {
        let mut config = DatarefwConfig::default();
        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("loud"));

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_bad_enum_value_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\ntarget = \"syslog\"").unwrap();
        assert!(DatarefwConfig::load_from(file.path()).is_err());
    }
}

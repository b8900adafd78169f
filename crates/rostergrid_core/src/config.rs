//! TOML configuration for the availability core.
//!
//! # Invariants
//! - Every section has defaults; an absent file yields a usable config.
//! - `validate()` runs on every successful parse.

use crate::logging::normalize_level;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "rostergrid.sqlite3";
const DEFAULT_PREFS_FILE_NAME: &str = "viewer-prefs.json";

#[derive(Debug)]
pub enum ConfigError {
    ReadFile(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFile(err) => write!(f, "failed to read config file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadFile(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; build-mode default when unset.
    pub level: Option<String>,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub path: PathBuf,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PREFS_FILE_NAME),
        }
    }
}

impl CoreConfig {
    /// Reads `path`, or returns defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(
                "event=config_load module=config status=default path={}",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path cannot be empty".to_string()));
        }
        if let Some(level) = self.logging.level.as_deref() {
            normalize_level(level).map_err(ConfigError::Invalid)?;
        }
        if let Some(dir) = self.logging.dir.as_deref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        if self.preferences.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "preferences.path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::parse("").expect("empty config should use defaults");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.database.path, PathBuf::from("rostergrid.sqlite3"));
    }

    #[test]
    fn sections_override_defaults() {
        let config = CoreConfig::parse(
            r#"
            [database]
            path = "/tmp/roster.db"

            [logging]
            level = "debug"
            dir = "/tmp/roster-logs"
            "#,
        )
        .expect("full config should parse");
        assert_eq!(config.database.path, PathBuf::from("/tmp/roster.db"));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.preferences.path, PathBuf::from("viewer-prefs.json"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = CoreConfig::parse("[logging]\nlevel = \"loud\"")
            .expect_err("unknown level should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CoreConfig::parse("[logging]\ndir = \"logs\"")
            .expect_err("relative log dir should be rejected");
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("absolute")));

        let err = CoreConfig::parse("[database]\npath = \"\"")
            .expect_err("empty db path should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = CoreConfig::load(dir.path().join("absent.toml"))
            .expect("missing file should fall back to defaults");
        assert_eq!(config, CoreConfig::default());
    }
}

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::core::{Error, Result};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path, or `":memory:"`.
    pub path: String,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
    /// Applied to file databases only.
    pub journal_mode: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: ":memory:".to_string(),
            busy_timeout_ms: 5000,
            foreign_keys: true,
            journal_mode: Some("WAL".to_string()),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            ansi: true,
        }
    }
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads configuration from a TOML file at the given path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// let config = qdb::Config::load("qdb.toml").expect("Failed to load config");
    /// println!("{:?}", config);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let content = fs::read_to_string(path)?;
        Config::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_CONFIG: &str = r#"
[database]
path = "/var/lib/app/data.db"
busy_timeout_ms = 250
foreign_keys = false
journal_mode = "DELETE"

[logging]
level = "debug"
ansi = false
"#;

    #[test]
    fn test_load_config_from_str() {
        let config = Config::from_toml(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(config.database.path, "/var/lib/app/data.db");
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert!(!config.database.foreign_keys);
        assert_eq!(config.database.journal_mode.as_deref(), Some("DELETE"));
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.ansi);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::from_toml("[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert!(config.database.foreign_keys);
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.ansi);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("[database\npath = 1").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CONFIG.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database.busy_timeout_ms, 250);

        let missing = Config::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}

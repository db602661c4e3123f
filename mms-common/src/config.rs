//! Configuration loading and resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal; defaults are used and a
//! warning is logged.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{Error, Result};

pub const ENV_CONFIG_FILE: &str = "MMS_CONFIG";
pub const ENV_DATABASE: &str = "MMS_DATABASE";
pub const ENV_MIRROR: &str = "MMS_MIRROR";
pub const ENV_COUCH_URL: &str = "MMS_COUCH_URL";
pub const ENV_COUCH_USER: &str = "MMS_COUCH_USER";
pub const ENV_COUCH_PASSWORD: &str = "MMS_COUCH_PASSWORD";
pub const ENV_COUCH_DB: &str = "MMS_COUCH_DB";

/// On-disk TOML configuration. All fields optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Relational store (SQLite file)
    pub database: Option<PathBuf>,
    /// Document mirror store (SQLite file)
    pub mirror: Option<PathBuf>,
    #[serde(default)]
    pub couch: CouchSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CouchSection {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        Self::from_toml_str(&content)
    }
}

/// Connection details for the external CouchDB
#[derive(Debug, Clone, PartialEq)]
pub struct CouchConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub mirror: Option<PathBuf>,
    pub couch_url: Option<String>,
    pub couch_database: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub mirror_path: PathBuf,
    pub couch: CouchConfig,
    pub log_level: String,
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_dir: PathBuf,
    pub couch: CouchConfig,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("mms"))
            .unwrap_or_else(|| PathBuf::from("./mms_data"));

        Self {
            data_dir,
            couch: CouchConfig {
                url: "http://localhost:5984".to_string(),
                user: "admin".to_string(),
                password: "password".to_string(),
                database: "csanz".to_string(),
            },
        }
    }
}

/// Default config file location (`~/.config/mms/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mms").join("config.toml"))
}

impl Settings {
    /// Resolve every setting from CLI, environment, TOML file and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let config_path = cli
            .config_file
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let toml_config = match config_path {
            Some(path) => match TomlConfig::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    TomlConfig::default()
                }
            },
            None => TomlConfig::default(),
        };

        Ok(Self::resolve_with(cli, &toml_config))
    }

    /// Resolve against an already-loaded TOML config
    pub fn resolve_with(cli: &CliOverrides, toml_config: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let database_path = pick(
            cli.database.clone(),
            ENV_DATABASE,
            toml_config.database.clone(),
            PathBuf::from,
        )
        .unwrap_or_else(|| defaults.data_dir.join("mms.db"));

        let mirror_path = pick(
            cli.mirror.clone(),
            ENV_MIRROR,
            toml_config.mirror.clone(),
            PathBuf::from,
        )
        .unwrap_or_else(|| defaults.data_dir.join("mirror.db"));

        let couch_section = &toml_config.couch;
        let couch = CouchConfig {
            url: pick(cli.couch_url.clone(), ENV_COUCH_URL, couch_section.url.clone(), String::from)
                .unwrap_or(defaults.couch.url),
            user: pick(None, ENV_COUCH_USER, couch_section.user.clone(), String::from)
                .unwrap_or(defaults.couch.user),
            password: pick(None, ENV_COUCH_PASSWORD, couch_section.password.clone(), String::from)
                .unwrap_or(defaults.couch.password),
            database: pick(
                cli.couch_database.clone(),
                ENV_COUCH_DB,
                couch_section.database.clone(),
                String::from,
            )
            .unwrap_or(defaults.couch.database),
        };

        Self {
            database_path,
            mirror_path,
            couch,
            log_level: toml_config.logging.level.clone(),
        }
    }
}

fn pick<T>(cli: Option<T>, env_name: &str, file: Option<T>, from_env: fn(String) -> T) -> Option<T> {
    if cli.is_some() {
        return cli;
    }
    if let Ok(value) = std::env::var(env_name) {
        if !value.trim().is_empty() {
            return Some(from_env(value));
        }
    }
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_toml() {
        let config = TomlConfig::from_toml_str(
            r#"
            database = "/var/lib/mms/mms.db"
            mirror = "/var/lib/mms/mirror.db"

            [couch]
            url = "http://couch.internal:5984"
            database = "members"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.database, Some(PathBuf::from("/var/lib/mms/mms.db")));
        assert_eq!(config.couch.url.as_deref(), Some("http://couch.internal:5984"));
        assert_eq!(config.couch.user, None);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("database = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let config = TomlConfig::load(Path::new("/nonexistent/mms/config.toml")).unwrap();
        assert_eq!(config, TomlConfig::default());
    }
}

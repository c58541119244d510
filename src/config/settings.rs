use crate::git::repository::DEFAULT_TIMESTAMP_FORMAT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub git: GitConfig,
    pub remote: RemoteConfig,
    pub display: DisplayConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    pub binary: String,
    pub timeout_seconds: u64,
}

/// The single upstream remote/branch pair the panel tracks
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RemoteConfig {
    pub name: String,
    pub branch: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DisplayConfig {
    pub recent_log_count: usize,
    /// chrono strftime pattern for the last-sync timestamp
    pub timestamp_format: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gitpanel"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        let contents = fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration, falling back to defaults when no file exists yet
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(ConfigError::ReadError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default_config())
            }
            Err(ConfigError::DirectoryNotFound) => Ok(Self::default_config()),
            Err(e) => Err(e),
        }
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self)?;

        fs::write(&path, contents)?;

        // Set permissions to 600 (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            git: GitConfig {
                binary: "git".to_string(),
                timeout_seconds: 120,
            },
            remote: RemoteConfig {
                name: "origin".to_string(),
                branch: "main".to_string(),
            },
            display: DisplayConfig {
                recent_log_count: 10,
                timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            },
            log: LogConfig {
                enabled: true,
                path: None,
            },
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.git.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "git.binary must not be empty".to_string(),
            ));
        }

        if self.git.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.remote.name.trim().is_empty() || self.remote.branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "remote.name and remote.branch must not be empty".to_string(),
            ));
        }

        if self.display.recent_log_count == 0 {
            return Err(ConfigError::InvalidValue(
                "recent_log_count must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.git.binary, "git");
        assert_eq!(config.git.timeout(), Duration::from_secs(120));
        assert_eq!(config.remote.name, "origin");
        assert_eq!(config.remote.branch, "main");
        assert_eq!(config.display.recent_log_count, 10);
        assert!(config.log.enabled);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default_config().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default_config();
        config.git.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_remote() {
        let mut config = Config::default_config();
        config.remote.branch = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_log_count() {
        let mut config = Config::default_config();
        config.display.recent_log_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
[git]
binary = "/usr/local/bin/git"
timeout_seconds = 30

[remote]
name = "upstream"
branch = "develop"

[display]
recent_log_count = 5
timestamp_format = "%Y-%m-%d"

[log]
enabled = false
"#;
        let config = Config::from_toml(text).unwrap();
        assert_eq!(config.git.binary, "/usr/local/bin/git");
        assert_eq!(config.remote.name, "upstream");
        assert_eq!(config.display.recent_log_count, 5);
        assert!(!config.log.enabled);
        assert!(config.log.path.is_none());
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        let text = toml::to_string(&Config {
            git: GitConfig {
                binary: "git".to_string(),
                timeout_seconds: 0,
            },
            ..Config::default_config()
        })
        .unwrap();

        assert!(matches!(
            Config::from_toml(&text),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::default_config();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(config, parsed);
    }
}

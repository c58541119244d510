pub mod settings;

pub use settings::{Config, ConfigError, DisplayConfig, GitConfig, LogConfig, RemoteConfig};

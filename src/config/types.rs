//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::defaults::{default_application_id, default_server_name};
use super::license::LicenseConfig;
use super::listen::{ListenConfig, TlsConfig};
use super::pipeline::{FramingSection, ParserSection, RouterConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {}", format_errors(.0))]
    Invalid(Vec<super::ValidationError>),
}

fn format_errors(errors: &[super::ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server identity and logging.
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote terminal listener.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Optional TLS listener.
    pub tls: Option<TlsConfig>,
    /// Optional HTTP boundary (`POST /terminal`, `/metrics`, `/health`).
    pub http: Option<HttpConfig>,
    /// Local console loop.
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Message framing parameters.
    #[serde(default)]
    pub framing: FramingSection,
    /// Command parser syntax.
    #[serde(default)]
    pub parser: ParserSection,
    /// Router timeout and worker pool.
    #[serde(default)]
    pub router: RouterConfig,
    /// License source.
    #[serde(default)]
    pub license: LicenseConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load and validate in one step.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        super::validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Daemon name, reported by `/health` and `help`.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Application id licenses must be issued for.
    #[serde(default = "default_application_id")]
    pub application_id: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            application_id: default_application_id(),
            log_format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// HTTP boundary configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "127.0.0.1:7380").
    pub address: SocketAddr,
}

/// Local console configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsoleConfig {
    /// Read requests from stdin.
    #[serde(default)]
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LicenseSource;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.name, "termrd");
        assert_eq!(config.server.application_id, termrd_proto::DEMO_APPLICATION_ID);
        assert_eq!(config.listen.max_remote_clients, 32);
        assert_eq!(config.router.timeout_ms, 25_000);
        assert_eq!(config.router.workers, 1);
        assert_eq!(config.framing.max_message_length, 1024);
        assert!(config.tls.is_none());
        assert!(config.http.is_none());
        assert!(!config.console.enabled);
    }

    #[test]
    fn test_full_config_parses() {
        let toml = r#"
[server]
name = "edge-1"
log_format = "json"

[listen]
address = "0.0.0.0:7300"
max_remote_clients = 4

[http]
address = "127.0.0.1:7380"

[console]
enabled = true

[parser]
option_prefix = "/"
alias_prefix = "-"

[router]
timeout_ms = -1
workers = 4

[license]
key = "e30="
revalidate_secs = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.listen.max_remote_clients, 4);
        assert_eq!(config.parser.option_prefix, "/");
        assert_eq!(config.router.timeout(), None);
        assert_eq!(config.license.source(), Some(LicenseSource::Key("e30=".into())));
        assert!(config.console.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("termrd.toml");
        std::fs::write(&path, "[router]\nworkers = 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.router.workers, 2);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/termrd.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_validated_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("termrd.toml");
        std::fs::write(&path, "[router]\nworkers = 0\n").unwrap();

        let err = Config::load_validated(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}

//! Configuration management for credential-session.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::error::SessionError;
use crate::server::ManagerConfig;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Session lifecycle configuration.
    pub session: SessionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
            graceful_shutdown: true,
        }
    }
}

/// Session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Base URL under which holders reach the protocol endpoint.
    pub url: String,
    /// Idle lifetime of a session, and grace period after it finishes.
    pub max_session_lifetime_secs: u64,
    /// Default deadline for the holder's first contact.
    pub client_timeout_secs: Option<u64>,
    /// Period of the expiry sweep.
    pub sweep_interval_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_session_lifetime_secs: 300,
            client_timeout_secs: None,
            sweep_interval_secs: 10,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("CREDENTIAL_SESSION_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("CREDENTIAL_SESSION_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(url) = std::env::var("CREDENTIAL_SESSION_URL") {
            self.session.url = url;
        }

        if let Ok(level) = std::env::var("CREDENTIAL_SESSION_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref url) = args.url {
            self.session.url = url.clone();
        }
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Check values that cannot be repaired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;
        if self.session.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval("sweep_interval_secs"));
        }
        if self.session.max_session_lifetime_secs == 0 {
            return Err(ConfigError::InvalidInterval("max_session_lifetime_secs"));
        }
        Ok(())
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port);
        server_config.graceful_shutdown = self.server.graceful_shutdown;
        Ok(server_config)
    }

    /// Convert to ManagerConfig for the session manager.
    ///
    /// The base URL gets a trailing `/` if it lacks one.
    pub fn to_manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            max_session_lifetime: Duration::from_secs(self.session.max_session_lifetime_secs),
            client_timeout: self.session.client_timeout_secs.map(Duration::from_secs),
            sweep_interval: Duration::from_secs(self.session.sweep_interval_secs),
            ..ManagerConfig::default()
        }
        .with_url(self.session.url.clone())
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// A duration that must be positive is zero.
    InvalidInterval(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::InvalidInterval(name) => write!(f, "{} must be greater than zero", name),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Io(e) => SessionError::Io(e),
            other => SessionError::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.session.max_session_lifetime_secs, 300);
        assert_eq!(config.session.sweep_interval_secs, 10);
        assert!(config.session.client_timeout_secs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "server": {
                "host": "0.0.0.0",
                "port": 8080
            },
            "session": {
                "url": "https://example.com/protocol",
                "client_timeout_secs": 30
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session.url, "https://example.com/protocol");
        assert_eq!(config.session.client_timeout_secs, Some(30));
        assert_eq!(config.session.max_session_lifetime_secs, 300);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "server": { "port": 9000 } }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1"); // Default
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.server.port = 7000;
        let args = Args {
            host: Some("192.168.1.1".parse().unwrap()),
            url: Some("https://example.com".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.session.url, "https://example.com");
    }

    #[test]
    fn test_to_server_config() {
        let mut config = Config::default();
        config.server.graceful_shutdown = false;
        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.host, "127.0.0.1");
        assert_eq!(server_config.port, 8088);
        assert!(!server_config.graceful_shutdown);
    }

    #[test]
    fn test_to_manager_config() {
        let mut config = Config::default();
        config.session.url = "https://example.com/protocol".to_string();
        config.session.client_timeout_secs = Some(20);

        let manager = config.to_manager_config();
        assert_eq!(manager.url, "https://example.com/protocol/");
        assert_eq!(manager.client_timeout, Some(Duration::from_secs(20)));
        assert_eq!(manager.max_session_lifetime, Duration::from_secs(300));
        assert_eq!(manager.sweep_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not-an-ip".to_string();

        assert!(config.to_server_config().is_err());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHost(_))));
    }

    #[test]
    fn test_zero_sweep_interval() {
        let mut config = Config::default();
        config.session.sweep_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sweep_interval_secs"));

        let err: SessionError = err.into();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"host\""));
        assert!(json.contains("\"max_session_lifetime_secs\""));
    }
}

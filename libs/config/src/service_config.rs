//! Service Configuration Module
//!
//! Loads [`IngestConfig`] from layered sources, lowest priority first:
//!
//! 1. Serde defaults (see [`crate::service`])
//! 2. Optional TOML file
//! 3. `TRACKER__SECTION__KEY` environment variables
//! 4. The deployment's `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_DATABASE`

use crate::service;
use config_crate::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use tracker_codec::{FramingMode, TELEMETRY_FRAME_LEN};

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config_crate::ConfigError),

    #[error("Invalid configuration value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main ingest service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub listener: ListenerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Which transports the listener accepts trackers on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Tcp,
    Udp,
    Both,
}

impl TransportKind {
    pub fn tcp_enabled(self) -> bool {
        matches!(self, Self::Tcp | Self::Both)
    }

    pub fn udp_enabled(self) -> bool {
        matches!(self, Self::Udp | Self::Both)
    }
}

/// Listener and per-connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub bind_address: String,
    pub port: u16,
    pub transport: TransportKind,
    pub framing: FramingMode,
    /// Bytes read from the socket per call
    pub read_buffer_size: usize,
    /// Upper bound on one reassembled frame
    pub max_frame_size: usize,
    /// 0 disables the idle timeout
    pub idle_timeout_secs: u64,
    /// 0 means unlimited
    pub max_connections: usize,
    /// Reject frames with coordinates outside the WGS84 range
    pub validate_coordinates: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: service::listener::BIND_ADDRESS.to_string(),
            port: service::listener::PORT,
            transport: TransportKind::default(),
            framing: FramingMode::default(),
            read_buffer_size: service::listener::READ_BUFFER_SIZE,
            max_frame_size: tracker_codec::DEFAULT_MAX_FRAME_LEN,
            idle_timeout_secs: service::listener::IDLE_TIMEOUT_SECS,
            max_connections: 0,
            validate_coordinates: true,
        }
    }
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self.bind_address.parse().map_err(|_| {
            ConfigError::invalid(
                "listener.bind_address",
                format!("'{}' is not an IP address", self.bind_address),
            )
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn connection_limit(&self) -> Option<usize> {
        (self.max_connections > 0).then_some(self.max_connections)
    }
}

/// PostgreSQL connection settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: usize,
    /// 0 disables the write timeout
    pub write_timeout_ms: u64,
    /// Create the telemetry and raw tables at startup when missing
    pub ensure_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: service::database::HOST.to_string(),
            port: service::database::PORT,
            user: service::database::USER.to_string(),
            password: String::new(),
            database: service::database::DATABASE.to_string(),
            max_pool_size: service::database::MAX_POOL_SIZE,
            write_timeout_ms: service::database::WRITE_TIMEOUT_MS,
            ensure_schema: true,
        }
    }
}

impl DatabaseConfig {
    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_pool_size", &self.max_pool_size)
            .field("write_timeout_ms", &self.write_timeout_ms)
            .field("ensure_schema", &self.ensure_schema)
            .finish()
    }
}

/// Logging settings; `RUST_LOG` takes precedence over `level`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 0 disables periodic reporting
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: service::metrics::REPORT_INTERVAL_SECS,
        }
    }
}

impl MetricsConfig {
    pub fn report_interval(&self) -> Option<Duration> {
        (self.report_interval_secs > 0).then(|| Duration::from_secs(self.report_interval_secs))
    }
}

/// Deployment database variables mapped onto config keys
const DATABASE_ENV_OVERRIDES: [(&str, &str); 5] = [
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_DATABASE", "database.database"),
];

impl IngestConfig {
    /// Load configuration from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let vars: Map<String, String> = std::env::vars().collect();
        Self::load_from(path, vars)
    }

    /// Load configuration from an optional file plus an explicit variable map
    pub fn load_from(path: Option<&Path>, vars: Map<String, String>) -> ConfigResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading configuration file: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(service::ENV_PREFIX)
                .prefix_separator(service::ENV_SEPARATOR)
                .separator(service::ENV_SEPARATOR)
                .try_parsing(true)
                .source(Some(vars.clone())),
        );

        for (var, key) in DATABASE_ENV_OVERRIDES {
            if let Some(value) = vars.get(var) {
                debug!(variable = var, "Applying database override");
                builder = builder.set_override(key, value.clone())?;
            }
        }

        let config: IngestConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        self.listener.socket_addr()?;

        if self.listener.read_buffer_size == 0 {
            return Err(ConfigError::invalid(
                "listener.read_buffer_size",
                "must be greater than zero",
            ));
        }

        if self.listener.max_frame_size < TELEMETRY_FRAME_LEN {
            return Err(ConfigError::invalid(
                "listener.max_frame_size",
                format!("must be at least {} bytes", TELEMETRY_FRAME_LEN),
            ));
        }

        if self.database.host.trim().is_empty() {
            return Err(ConfigError::invalid("database.host", "must not be empty"));
        }

        if self.database.database.trim().is_empty() {
            return Err(ConfigError::invalid("database.database", "must not be empty"));
        }

        if self.database.max_pool_size == 0 {
            return Err(ConfigError::invalid(
                "database.max_pool_size",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}

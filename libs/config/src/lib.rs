//! # Tracker Ingest Configuration
//!
//! Centralized configuration loading and defaults for the ingest service.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tracker_config::IngestConfig;
//!
//! let config = IngestConfig::load(None)?;
//! let addr = config.listener.socket_addr()?;
//! # Ok::<(), tracker_config::ConfigError>(())
//! ```

pub mod service;
pub mod service_config;

// Re-export commonly used types
pub use service_config::{
    ConfigError, ConfigResult, DatabaseConfig, IngestConfig, ListenerConfig, LoggingConfig,
    MetricsConfig, TransportKind,
};

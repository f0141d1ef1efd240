//! Service defaults
//!
//! Default values used when neither the config file nor the environment sets a key.

/// Listener defaults
pub mod listener {
    /// Address the ingest listener binds to
    pub const BIND_ADDRESS: &str = "0.0.0.0";

    /// Port trackers are provisioned with
    pub const PORT: u16 = 4500;

    /// Socket read buffer size
    pub const READ_BUFFER_SIZE: usize = 4096;

    /// Idle connection timeout (seconds); trackers report at least every few minutes
    pub const IDLE_TIMEOUT_SECS: u64 = 600;
}

/// Database defaults
pub mod database {
    pub const HOST: &str = "localhost";

    pub const PORT: u16 = 5432;

    pub const USER: &str = "postgres";

    pub const DATABASE: &str = "tracker";

    /// Pool size shared by every connection handler
    pub const MAX_POOL_SIZE: usize = 16;

    /// Per-write timeout (milliseconds)
    pub const WRITE_TIMEOUT_MS: u64 = 5_000;
}

/// Metrics defaults
pub mod metrics {
    /// Interval between metrics snapshots in the log (seconds)
    pub const REPORT_INTERVAL_SECS: u64 = 60;
}

/// Environment variable prefix for layered overrides (`TRACKER__LISTENER__PORT`)
pub const ENV_PREFIX: &str = "TRACKER";

/// Separator between prefix, section and key in override variables
pub const ENV_SEPARATOR: &str = "__";

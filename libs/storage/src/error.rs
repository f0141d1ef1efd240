use thiserror::Error;

/// Persistence failures. Every variant is terminal for the single write that produced it.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Write to {table} failed: {message}")]
    WriteFailed { table: &'static str, message: String },

    #[error("Write to {table} timed out after {timeout_ms}ms")]
    Timeout { table: &'static str, timeout_ms: u64 },

    #[error("Schema setup failed: {0}")]
    Schema(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StorageError {
    pub fn write_failed(table: &'static str, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            table,
            message: message.into(),
        }
    }

    /// Short label used for log fields and metric keys
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pool(_) => "pool",
            Self::WriteFailed { .. } => "write_failed",
            Self::Timeout { .. } => "timeout",
            Self::Schema(_) => "schema",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

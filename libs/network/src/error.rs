//! Network error types for the ingest listeners

use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tracker_config::ConfigError;

/// Result type for network operations
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Errors raised by listeners and connection handlers
///
/// Frame and persistence failures never appear here: they are handled per frame
/// and do not end a connection.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The listening socket could not be bound
    #[error("Failed to bind {address}: {source}")]
    BindFailed {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Read or write failure on an accepted connection
    #[error("Transport error with {peer} during {operation}: {source}")]
    Transport {
        peer: SocketAddr,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// Listener settings could not be turned into a socket
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Socket-level failure outside a connection
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl NetworkError {
    /// Create a bind error
    pub fn bind_failed(address: SocketAddr, source: io::Error) -> Self {
        Self::BindFailed { address, source }
    }

    /// Create a transport error for a peer
    pub fn transport(peer: SocketAddr, operation: &'static str, source: io::Error) -> Self {
        Self::Transport {
            peer,
            operation,
            source,
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BindFailed { .. } => "bind_failed",
            Self::Transport { .. } => "transport",
            Self::Configuration(_) => "configuration",
            Self::Io(_) => "io",
        }
    }

    /// True when the peer went away rather than the socket failing locally
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Transport { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

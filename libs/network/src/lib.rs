//! # Tracker Network - Ingest Listeners
//!
//! Socket-facing half of the ingest service.
//!
//! - [`TcpIngestListener`]: accepts tracker connections, one task per connection
//! - [`ConnectionHandler`]: read, frame, process, ack loop for one stream
//! - [`UdpIngestListener`]: one datagram is one frame, ack sent to the sender
//! - [`FrameProcessor`]: decode, persist both records, decide the ack
//! - [`IngestMetrics`]: process-wide counters with a periodic log reporter

pub mod connection;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod processor;
pub mod udp;

pub use connection::{
    CloseReason, ConnectionHandler, ConnectionState, ConnectionSummary, HandlerConfig,
};
pub use error::{NetworkError, NetworkResult};
pub use listener::TcpIngestListener;
pub use metrics::{IngestMetrics, MetricsSnapshot};
pub use processor::{FrameOutcome, FrameProcessor};
pub use udp::UdpIngestListener;

//! # Tracker Storage - Persistence Gateway
//!
//! ## Purpose
//!
//! Durable storage for the two record kinds the ingest pipeline produces:
//! decoded [`TelemetryRecord`]s and unconditional [`RawFrameRecord`] audit copies.
//!
//! ## Write Policy
//!
//! - Every call inserts a new row; there is no dedup and no update in place.
//! - A failed write is returned as a [`StorageError`] and never retried here.
//! - The two writes are independent: no transaction spans both tables, so the raw
//!   audit copy survives a telemetry failure and vice versa.
//!
//! ## Implementations
//!
//! - [`PostgresGateway`]: pooled PostgreSQL, safe for any number of concurrent handlers
//! - [`TimeoutGateway`]: bounds every write of an inner gateway
//! - [`test_utils::MemoryGateway`]: in-memory store with failure injection

pub mod error;
pub mod postgres;
pub mod test_utils;
pub mod timeout;

use async_trait::async_trait;
use std::fmt::Debug;

pub use error::{StorageError, StorageResult};
pub use postgres::PostgresGateway;
pub use timeout::TimeoutGateway;
pub use tracker_codec::{RawFrameRecord, TelemetryRecord};

/// Table receiving decoded telemetry
pub const TELEMETRY_TABLE: &str = "gps_data";

/// Table receiving raw audit frames
pub const RAW_TABLE: &str = "gps_raw_data";

/// A durable destination for ingest records
#[async_trait]
pub trait PersistenceGateway: Send + Sync + Debug {
    /// Store the raw audit copy of an inbound frame
    async fn write_raw(&self, record: &RawFrameRecord) -> StorageResult<()>;

    /// Store a decoded telemetry record
    async fn write_telemetry(&self, record: &TelemetryRecord) -> StorageResult<()>;

    /// Name used in logs
    fn name(&self) -> &str {
        "gateway"
    }
}

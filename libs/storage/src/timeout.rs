//! Write timeout decorator
//!
//! Wraps any [`PersistenceGateway`] so a stalled store cannot hold a connection
//! handler indefinitely. A timed-out write is reported like any other failure; the
//! underlying statement may still complete on the server.

use crate::{PersistenceGateway, StorageError, StorageResult, RAW_TABLE, TELEMETRY_TABLE};
use async_trait::async_trait;
use std::time::Duration;
use tracker_codec::{RawFrameRecord, TelemetryRecord};

#[derive(Debug)]
pub struct TimeoutGateway<G> {
    inner: G,
    timeout: Duration,
}

impl<G: PersistenceGateway> TimeoutGateway<G> {
    pub fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    fn timed_out(&self, table: &'static str) -> StorageError {
        StorageError::Timeout {
            table,
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

#[async_trait]
impl<G: PersistenceGateway> PersistenceGateway for TimeoutGateway<G> {
    async fn write_raw(&self, record: &RawFrameRecord) -> StorageResult<()> {
        tokio::time::timeout(self.timeout, self.inner.write_raw(record))
            .await
            .map_err(|_| self.timed_out(RAW_TABLE))?
    }

    async fn write_telemetry(&self, record: &TelemetryRecord) -> StorageResult<()> {
        tokio::time::timeout(self.timeout, self.inner.write_telemetry(record))
            .await
            .map_err(|_| self.timed_out(TELEMETRY_TABLE))?
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

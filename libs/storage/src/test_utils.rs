use crate::{PersistenceGateway, StorageError, StorageResult, RAW_TABLE, TELEMETRY_TABLE};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracker_codec::{RawFrameRecord, TelemetryRecord};

/// A gateway that keeps every record in memory, with failure injection for tests
#[derive(Debug, Default)]
pub struct MemoryGateway {
    raw: Mutex<Vec<RawFrameRecord>>,
    telemetry: Mutex<Vec<TelemetryRecord>>,
    fail_raw: AtomicBool,
    fail_telemetry: AtomicBool,
    fail_next_telemetry: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    writes_failed: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all stored raw records in write order
    pub fn raw_records(&self) -> Vec<RawFrameRecord> {
        self.raw.lock().clone()
    }

    /// Get all stored telemetry records in write order
    pub fn telemetry_records(&self) -> Vec<TelemetryRecord> {
        self.telemetry.lock().clone()
    }

    pub fn raw_count(&self) -> usize {
        self.raw.lock().len()
    }

    pub fn telemetry_count(&self) -> usize {
        self.telemetry.lock().len()
    }

    pub fn writes_failed(&self) -> u64 {
        self.writes_failed.load(Ordering::Relaxed)
    }

    /// Make every raw write fail until reset
    pub fn fail_raw_writes(&self, fail: bool) {
        self.fail_raw.store(fail, Ordering::Relaxed);
    }

    /// Make every telemetry write fail until reset
    pub fn fail_telemetry_writes(&self, fail: bool) {
        self.fail_telemetry.store(fail, Ordering::Relaxed);
    }

    /// Configure to fail on the next telemetry write only
    pub fn fail_next_telemetry(&self) {
        self.fail_next_telemetry.store(true, Ordering::Relaxed);
    }

    /// Delay every write, for timeout tests
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    /// Poll until at least `count` raw records are stored or `timeout` elapses
    pub async fn wait_for_raw(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.raw_count() < count {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    async fn delay(&self) {
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn simulated_failure(&self, table: &'static str) -> StorageError {
        self.writes_failed.fetch_add(1, Ordering::Relaxed);
        StorageError::write_failed(table, "Simulated failure")
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn write_raw(&self, record: &RawFrameRecord) -> StorageResult<()> {
        self.delay().await;

        if self.fail_raw.load(Ordering::Relaxed) {
            return Err(self.simulated_failure(RAW_TABLE));
        }

        self.raw.lock().push(record.clone());
        Ok(())
    }

    async fn write_telemetry(&self, record: &TelemetryRecord) -> StorageResult<()> {
        self.delay().await;

        if self.fail_telemetry.load(Ordering::Relaxed)
            || self.fail_next_telemetry.swap(false, Ordering::Relaxed)
        {
            return Err(self.simulated_failure(TELEMETRY_TABLE));
        }

        self.telemetry.lock().push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

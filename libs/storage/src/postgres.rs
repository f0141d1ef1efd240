//! PostgreSQL persistence gateway
//!
//! One deadpool pool is shared by every connection handler. Each write checks out a
//! client, runs a single cached `INSERT`, and returns the client; nothing spans both
//! tables.

use crate::{PersistenceGateway, StorageError, StorageResult, RAW_TABLE, TELEMETRY_TABLE};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::fmt;
use tokio_postgres::NoTls;
use tracing::{debug, info};
use tracker_codec::{RawFrameRecord, TelemetryRecord};
use tracker_config::DatabaseConfig;

// The timestamp parameter is typed explicitly so deployments whose `timestamp`
// column is `TIMESTAMP` rather than `TIMESTAMPTZ` take the assignment cast.
const INSERT_TELEMETRY: &str = "INSERT INTO gps_data \
     (packet_id, latitude, longitude, speed, course, altitude, timestamp) \
     VALUES ($1, $2, $3, $4, $5, $6, $7::timestamptz)";

const INSERT_RAW: &str = "INSERT INTO gps_raw_data \
     (packet_id, raw_text, raw_hex, timestamp) \
     VALUES ($1, $2, $3, $4::timestamptz)";

const SCHEMA: &str = include_str!("../migrations/0001_tracker_tables.sql");

/// Gateway writing to the `gps_data` and `gps_raw_data` tables
#[derive(Clone)]
pub struct PostgresGateway {
    pool: Pool,
}

impl PostgresGateway {
    /// Creates the gateway with its connection pool. Connections are opened lazily.
    pub fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.dbname = Some(config.database.clone());
        cfg.user = Some(config.user.clone());
        cfg.password = Some(config.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(config.max_pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Pings the database to verify connectivity
    pub async fn ping(&self) -> StorageResult<()> {
        let client = self.client().await?;
        client
            .execute("SELECT 1", &[])
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        debug!("postgreSQL connection successful");
        Ok(())
    }

    /// Creates both tables and their indexes when missing
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        let client = self.client().await?;
        client
            .batch_execute(SCHEMA)
            .await
            .map_err(|e| StorageError::Schema(e.to_string()))?;
        info!(
            telemetry_table = TELEMETRY_TABLE,
            raw_table = RAW_TABLE,
            "Database schema ready"
        );
        Ok(())
    }

    async fn client(&self) -> StorageResult<deadpool_postgres::Client> {
        self.pool
            .get()
            .await
            .map_err(|e| StorageError::Pool(e.to_string()))
    }
}

impl fmt::Debug for PostgresGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PostgresGateway")
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .field("pool_max", &status.max_size)
            .finish()
    }
}

fn write_error(table: &'static str, err: tokio_postgres::Error) -> StorageError {
    match err.as_db_error() {
        Some(db_err) => StorageError::write_failed(
            table,
            format!("{} (sqlstate {})", db_err.message(), db_err.code().code()),
        ),
        None => StorageError::write_failed(table, err.to_string()),
    }
}

#[async_trait]
impl PersistenceGateway for PostgresGateway {
    async fn write_raw(&self, record: &RawFrameRecord) -> StorageResult<()> {
        let client = self.client().await?;
        let statement = client
            .prepare_cached(INSERT_RAW)
            .await
            .map_err(|e| write_error(RAW_TABLE, e))?;

        client
            .execute(
                &statement,
                &[
                    &i32::from(record.packet_id),
                    &record.raw_text,
                    &record.raw_hex,
                    &record.captured_at,
                ],
            )
            .await
            .map_err(|e| write_error(RAW_TABLE, e))?;

        debug!(packet_id = record.packet_id, "Raw frame stored");
        Ok(())
    }

    async fn write_telemetry(&self, record: &TelemetryRecord) -> StorageResult<()> {
        let client = self.client().await?;
        let statement = client
            .prepare_cached(INSERT_TELEMETRY)
            .await
            .map_err(|e| write_error(TELEMETRY_TABLE, e))?;

        client
            .execute(
                &statement,
                &[
                    &i32::from(record.packet_id),
                    &record.latitude,
                    &record.longitude,
                    &i32::from(record.speed),
                    &i32::from(record.course),
                    &i32::from(record.altitude),
                    &record.captured_at,
                ],
            )
            .await
            .map_err(|e| write_error(TELEMETRY_TABLE, e))?;

        debug!(packet_id = record.packet_id, "Telemetry stored");
        Ok(())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

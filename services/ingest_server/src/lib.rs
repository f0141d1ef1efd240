//! # Tracker Ingest Server
//!
//! Wires configuration, the persistence gateway and the listeners into one
//! process. [`IngestServer::connect`] builds the PostgreSQL gateway;
//! [`IngestServer::with_gateway`] accepts any gateway, which is how the tests run
//! the full service without a database.
//!
//! Startup is split in two so callers learn the bound addresses before serving:
//!
//! ```text
//! IngestServer ──bind()──▶ BoundServer ──run_until(shutdown)──▶ ()
//! ```

pub mod logging;

use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracker_config::IngestConfig;
use tracker_network::{FrameProcessor, IngestMetrics, TcpIngestListener, UdpIngestListener};
use tracker_storage::{PersistenceGateway, PostgresGateway, TimeoutGateway};

pub struct IngestServer {
    config: IngestConfig,
    gateway: Arc<dyn PersistenceGateway>,
    metrics: Arc<IngestMetrics>,
}

impl IngestServer {
    /// Build the PostgreSQL gateway, verify connectivity and prepare the schema
    pub async fn connect(config: IngestConfig) -> Result<Self> {
        let postgres = PostgresGateway::new(&config.database)
            .context("Failed to create database pool")?;

        postgres.ping().await.with_context(|| {
            format!(
                "Database {}:{}/{} unreachable",
                config.database.host, config.database.port, config.database.database
            )
        })?;
        info!(
            host = %config.database.host,
            database = %config.database.database,
            "✅ Connected to PostgreSQL"
        );

        if config.database.ensure_schema {
            postgres
                .ensure_schema()
                .await
                .context("Failed to prepare database schema")?;
        }

        let gateway: Arc<dyn PersistenceGateway> = match config.database.write_timeout() {
            Some(timeout) => Arc::new(TimeoutGateway::new(postgres, timeout)),
            None => Arc::new(postgres),
        };

        Ok(Self::with_gateway(config, gateway))
    }

    pub fn with_gateway(config: IngestConfig, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            config,
            gateway,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Bind every configured transport
    pub async fn bind(self) -> Result<BoundServer> {
        let listener = &self.config.listener;
        let processor = FrameProcessor::new(Arc::clone(&self.gateway), Arc::clone(&self.metrics));

        let tcp = if listener.transport.tcp_enabled() {
            Some(TcpIngestListener::from_config(listener, processor.clone()).await?)
        } else {
            None
        };

        let udp = if listener.transport.udp_enabled() {
            Some(UdpIngestListener::from_config(listener, processor).await?)
        } else {
            None
        };

        let server = BoundServer {
            tcp_addr: tcp.as_ref().map(|l| l.local_addr()).transpose()?,
            udp_addr: udp.as_ref().map(|l| l.local_addr()).transpose()?,
            tcp,
            udp,
            metrics: self.metrics,
            report_interval: self.config.metrics.report_interval(),
        };

        info!(
            tcp = ?server.tcp_addr,
            udp = ?server.udp_addr,
            framing = ?listener.framing,
            gateway = self.gateway.name(),
            "🚀 Tracker ingest ready"
        );
        Ok(server)
    }
}

/// Listeners bound and ready to serve
pub struct BoundServer {
    tcp: Option<TcpIngestListener>,
    udp: Option<UdpIngestListener>,
    tcp_addr: Option<SocketAddr>,
    udp_addr: Option<SocketAddr>,
    metrics: Arc<IngestMetrics>,
    report_interval: Option<Duration>,
}

impl BoundServer {
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        self.tcp_addr
    }

    pub fn udp_addr(&self) -> Option<SocketAddr> {
        self.udp_addr
    }

    /// Serve until `shutdown` resolves, then stop accepting and return
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut listeners = Vec::new();

        if let Some(tcp) = self.tcp {
            listeners.push(("tcp", tokio::spawn(tcp.run_until(stopped(stop_rx.clone())))));
        }
        if let Some(udp) = self.udp {
            listeners.push(("udp", tokio::spawn(udp.run_until(stopped(stop_rx.clone())))));
        }

        let reporter = self
            .report_interval
            .map(|interval| self.metrics.spawn_reporter(interval));

        shutdown.await;
        info!("Shutdown requested, closing listeners");
        // Fails only when every listener has already exited
        if stop_tx.send(true).is_err() {
            debug!("Listeners already stopped");
        }

        let mut result = Ok(());
        for (transport, handle) in listeners {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(transport, error = %e, "Listener stopped with error");
                    result = Err(e).with_context(|| format!("{} listener failed", transport));
                }
                Err(e) => {
                    result = Err(e).with_context(|| format!("{} listener task panicked", transport));
                }
            }
        }

        if let Some(reporter) = reporter {
            reporter.abort();
        }

        let totals = self.metrics.snapshot();
        info!(
            frames_received = totals.frames_received,
            acks_sent = totals.acks_sent,
            decode_failures = totals.decode_failures,
            "Tracker ingest stopped"
        );
        result
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

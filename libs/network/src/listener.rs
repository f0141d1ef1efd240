//! TCP ingest listener
//!
//! Accepts connections and runs each one on its own task, so a slow or stalled peer
//! never delays another. The optional connection cap rejects new peers by closing
//! the socket immediately once the limit is reached.

use crate::connection::{ConnectionHandler, HandlerConfig};
use crate::error::{NetworkError, NetworkResult};
use crate::processor::FrameProcessor;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracker_config::ListenerConfig;

/// Pause after a failed accept so descriptor exhaustion does not spin the loop
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct TcpIngestListener {
    listener: TcpListener,
    processor: FrameProcessor,
    handler_config: HandlerConfig,
    connection_limit: Option<Arc<Semaphore>>,
}

impl TcpIngestListener {
    /// Bind the listening socket
    pub async fn bind(
        address: SocketAddr,
        processor: FrameProcessor,
        handler_config: HandlerConfig,
        max_connections: Option<usize>,
    ) -> NetworkResult<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| NetworkError::bind_failed(address, e))?;

        Ok(Self {
            listener,
            processor,
            handler_config,
            connection_limit: max_connections.map(|n| Arc::new(Semaphore::new(n))),
        })
    }

    /// Bind using the `[listener]` configuration section
    pub async fn from_config(
        config: &ListenerConfig,
        processor: FrameProcessor,
    ) -> NetworkResult<Self> {
        let address = config.socket_addr()?;
        let processor = processor.with_coordinate_validation(config.validate_coordinates);
        Self::bind(
            address,
            processor,
            HandlerConfig::from(config),
            config.connection_limit(),
        )
        .await
    }

    pub fn local_addr(&self) -> NetworkResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever
    pub async fn run(self) -> NetworkResult<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> NetworkResult<()>
    where
        F: Future<Output = ()>,
    {
        let local = self.local_addr()?;
        info!("TCP ingest listening on {}", local);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("TCP listener on {} shutting down", local);
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => {
                        self.processor.metrics().accept_error();
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let metrics = Arc::clone(self.processor.metrics());

        let permit = match &self.connection_limit {
            Some(limit) => match Arc::clone(limit).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    metrics.connection_rejected();
                    warn!(peer = %peer, "🚫 Connection limit reached, rejecting tracker");
                    return;
                }
            },
            None => None,
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer, "Failed to set TCP_NODELAY: {}", e);
        }

        metrics.connection_opened();
        info!(peer = %peer, "Accepted tracker connection");

        let handler = ConnectionHandler::new(
            stream,
            peer,
            self.processor.clone(),
            self.handler_config.clone(),
        );

        tokio::spawn(async move {
            let _permit = permit;
            match handler.run().await {
                Ok(summary) => info!(
                    peer = %peer,
                    reason = ?summary.reason,
                    frames = summary.frames,
                    acks_sent = summary.acks_sent,
                    "Tracker disconnected"
                ),
                Err(e) => debug!(peer = %peer, error = %e, "Connection ended with error"),
            }
            metrics.connection_closed();
        });
    }
}

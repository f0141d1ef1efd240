//! UDP ingest listener
//!
//! Each datagram is one frame. Datagrams already carry their boundaries, so the
//! framing mode does not apply here. Acks go back to the sending address.
//!
//! Every datagram is processed on its own task so a slow write for one tracker
//! never delays another. A semaphore bounds the number of datagrams in flight;
//! once it is exhausted the receive loop waits and the kernel buffer absorbs the
//! burst.

use crate::error::{NetworkError, NetworkResult};
use crate::processor::FrameProcessor;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use tracker_config::ListenerConfig;

/// Largest payload an IPv4 UDP datagram can carry
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Default bound on datagrams being processed at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 1024;

pub struct UdpIngestListener {
    socket: Arc<UdpSocket>,
    processor: FrameProcessor,
    in_flight: Arc<Semaphore>,
}

impl UdpIngestListener {
    pub async fn bind(address: SocketAddr, processor: FrameProcessor) -> NetworkResult<Self> {
        let socket = UdpSocket::bind(address)
            .await
            .map_err(|e| NetworkError::bind_failed(address, e))?;

        Ok(Self {
            socket: Arc::new(socket),
            processor,
            in_flight: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
        })
    }

    /// Bound the number of datagrams processed concurrently
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.in_flight = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    pub async fn from_config(
        config: &ListenerConfig,
        processor: FrameProcessor,
    ) -> NetworkResult<Self> {
        let processor = processor.with_coordinate_validation(config.validate_coordinates);
        let listener = Self::bind(config.socket_addr()?, processor).await?;
        Ok(match config.connection_limit() {
            Some(limit) => listener.with_max_in_flight(limit),
            None => listener,
        })
    }

    pub fn local_addr(&self) -> NetworkResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn run(self) -> NetworkResult<()> {
        self.run_until(std::future::pending()).await
    }

    /// Receive datagrams until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> NetworkResult<()>
    where
        F: Future<Output = ()>,
    {
        let local = self.local_addr()?;
        info!("UDP ingest listening on {}", local);
        tokio::pin!(shutdown);

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("UDP listener on {} shutting down", local);
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buffer) => match received {
                    Ok((0, peer)) => debug!(peer = %peer, "Ignoring empty datagram"),
                    Ok((len, peer)) => self.spawn_datagram(buffer[..len].to_vec(), peer).await,
                    Err(e) => {
                        // ICMP errors from earlier sends surface here on some platforms
                        self.processor.metrics().transport_error();
                        warn!("UDP receive failed: {}", e);
                    }
                }
            }
        }
    }

    async fn spawn_datagram(&self, datagram: Vec<u8>, peer: SocketAddr) {
        let permit = match Arc::clone(&self.in_flight).acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed
            Err(_) => return,
        };

        let socket = Arc::clone(&self.socket);
        let processor = self.processor.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let outcome = processor.process(&datagram, peer).await;

            if let Some(ack) = outcome.ack {
                match socket.send_to(&ack, peer).await {
                    Ok(_) => processor.metrics().ack_sent(),
                    Err(e) => {
                        processor.metrics().transport_error();
                        warn!(peer = %peer, packet_id = outcome.packet_id, "Failed to send ack: {}", e);
                    }
                }
            }
        });
    }
}

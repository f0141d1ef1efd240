//! # Connection Handler
//!
//! Serves one accepted stream connection until the peer closes it, the idle timeout
//! fires, or the transport fails.
//!
//! ## Lifecycle
//!
//! ```text
//! Open ──read──▶ Processing ──ack written──▶ Open
//!   │                 │
//!   │ EOF / idle      │ write failure
//!   ▼                 ▼
//! Closed           Errored
//! ```
//!
//! Frames are handled strictly in arrival order: the ack for a frame is written before
//! the next read is issued, so acks on one connection come back in frame order.
//! A frame that fails to decode or persist never ends the connection.
//!
//! A transport failure ends the connection, but every frame already received is
//! still run through the pipeline, including a partial tail, so each gets its raw
//! audit row. Only the acks are skipped once the connection is `Errored`.

use crate::error::{NetworkError, NetworkResult};
use crate::processor::FrameProcessor;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};
use tracker_codec::{FrameAssembler, FramingMode, DEFAULT_MAX_FRAME_LEN};
use tracker_config::ListenerConfig;

/// Where a connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for data
    Open,
    /// A frame is being decoded and persisted
    Processing,
    /// Ended normally
    Closed,
    /// Ended on a transport failure
    Errored,
}

/// Why a connection ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    IdleTimeout,
}

/// Per-connection settings derived from the listener configuration
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub read_buffer_size: usize,
    pub framing: FramingMode,
    pub max_frame_size: usize,
    pub idle_timeout: Option<Duration>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self::from(&ListenerConfig::default())
    }
}

impl From<&ListenerConfig> for HandlerConfig {
    fn from(config: &ListenerConfig) -> Self {
        Self {
            read_buffer_size: config.read_buffer_size.max(1),
            framing: config.framing,
            max_frame_size: if config.max_frame_size == 0 {
                DEFAULT_MAX_FRAME_LEN
            } else {
                config.max_frame_size
            },
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Totals reported when a connection ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub reason: CloseReason,
    pub frames: u64,
    pub acks_sent: u64,
    pub rejected: u64,
    pub bytes_received: u64,
}

/// Drives a single stream connection
pub struct ConnectionHandler<S> {
    stream: S,
    peer: SocketAddr,
    state: ConnectionState,
    assembler: FrameAssembler,
    processor: FrameProcessor,
    config: HandlerConfig,
    frames: u64,
    acks_sent: u64,
    rejected: u64,
    bytes_received: u64,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: SocketAddr, processor: FrameProcessor, config: HandlerConfig) -> Self {
        let assembler = FrameAssembler::new(config.framing, config.max_frame_size);
        Self {
            stream,
            peer,
            state: ConnectionState::Open,
            assembler,
            processor,
            config,
            frames: 0,
            acks_sent: 0,
            rejected: 0,
            bytes_received: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Serve the connection to completion
    #[instrument(name = "connection", skip(self), fields(peer = %self.peer))]
    pub async fn run(mut self) -> NetworkResult<ConnectionSummary> {
        debug!(framing = ?self.assembler.mode(), "Connection open");
        let mut buffer = vec![0u8; self.config.read_buffer_size];

        let reason = loop {
            let read = match self.config.idle_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.stream.read(&mut buffer)).await {
                        Ok(read) => read,
                        Err(_) => {
                            self.processor.metrics().idle_timeout();
                            info!(idle_secs = limit.as_secs(), "Idle timeout, closing connection");
                            break CloseReason::IdleTimeout;
                        }
                    }
                }
                None => self.stream.read(&mut buffer).await,
            };

            match read {
                Ok(0) => break CloseReason::PeerClosed,
                Ok(n) => {
                    self.bytes_received += n as u64;
                    let mut failure = None;
                    for frame in self.assembler.push(&buffer[..n]) {
                        if let Err(e) = self.handle_frame(&frame).await {
                            failure.get_or_insert(e);
                        }
                    }
                    if let Some(err) = failure {
                        self.flush_pending().await;
                        return Err(err);
                    }
                }
                Err(e) => {
                    let err = self.fail("read", e);
                    self.flush_pending().await;
                    return Err(err);
                }
            }
        };

        self.flush_pending().await;

        self.state = ConnectionState::Closed;
        let summary = self.summary(reason);
        debug!(
            frames = summary.frames,
            acks_sent = summary.acks_sent,
            rejected = summary.rejected,
            "Connection closed"
        );
        Ok(summary)
    }

    /// Bytes a length-prefixed peer left behind still get audited
    async fn flush_pending(&mut self) {
        if let Some(frame) = self.assembler.finish() {
            if let Err(e) = self.handle_frame(&frame).await {
                debug!(error = %e, "Ack for trailing frame not delivered");
            }
        }
    }

    /// Process one frame; once the connection is `Errored` the ack is skipped
    async fn handle_frame(&mut self, frame: &[u8]) -> NetworkResult<()> {
        let errored = self.state == ConnectionState::Errored;
        if !errored {
            self.state = ConnectionState::Processing;
        }
        self.frames += 1;

        let outcome = self.processor.process(frame, self.peer).await;

        match outcome.ack {
            Some(_) if errored => {}
            Some(ack) => {
                if let Err(e) = self.stream.write_all(&ack).await {
                    return Err(self.fail("write", e));
                }
                if let Err(e) = self.stream.flush().await {
                    return Err(self.fail("flush", e));
                }
                self.acks_sent += 1;
                self.processor.metrics().ack_sent();
            }
            None => self.rejected += 1,
        }

        if !errored {
            self.state = ConnectionState::Open;
        }
        Ok(())
    }

    fn fail(&mut self, operation: &'static str, source: std::io::Error) -> NetworkError {
        self.state = ConnectionState::Errored;
        self.processor.metrics().transport_error();
        let err = NetworkError::transport(self.peer, operation, source);
        if err.is_disconnect() {
            debug!(error = %err, "Peer disconnected");
        } else {
            warn!(error = %err, "Connection failed");
        }
        err
    }

    fn summary(&self, reason: CloseReason) -> ConnectionSummary {
        ConnectionSummary {
            reason,
            frames: self.frames,
            acks_sent: self.acks_sent,
            rejected: self.rejected,
            bytes_received: self.bytes_received,
        }
    }
}

//! Ingest Metrics
//!
//! Lock-free counters shared by every listener and connection handler. A snapshot
//! is logged periodically by [`IngestMetrics::spawn_reporter`]; nothing is exported
//! over the network.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Counters for the whole ingest process
#[derive(Debug, Default)]
pub struct IngestMetrics {
    connections_accepted: AtomicU64,
    connections_active: AtomicU64,
    connections_rejected: AtomicU64,
    accept_errors: AtomicU64,
    idle_timeouts: AtomicU64,
    transport_errors: AtomicU64,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
    acks_sent: AtomicU64,
    decode_failures: AtomicU64,
    raw_write_failures: AtomicU64,
    telemetry_write_failures: AtomicU64,
}

/// Point-in-time copy of [`IngestMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    pub connections_rejected: u64,
    pub accept_errors: u64,
    pub idle_timeouts: u64,
    pub transport_errors: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub acks_sent: u64,
    pub decode_failures: u64,
    pub raw_write_failures: u64,
    pub telemetry_write_failures: u64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        // Never wraps below zero even if a close is reported twice
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    #[inline]
    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn accept_error(&self) {
        self.accept_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn idle_timeout(&self) {
        self.idle_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn frame_received(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn ack_sent(&self) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn raw_write_failure(&self) {
        self.raw_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn telemetry_write_failure(&self) {
        self.telemetry_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            accept_errors: self.accept_errors.load(Ordering::Relaxed),
            idle_timeouts: self.idle_timeouts.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            raw_write_failures: self.raw_write_failures.load(Ordering::Relaxed),
            telemetry_write_failures: self.telemetry_write_failures.load(Ordering::Relaxed),
        }
    }

    /// Log a snapshot every `interval` until the returned task is aborted
    pub fn spawn_reporter(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let metrics = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let s = metrics.snapshot();
                info!(
                    connections_active = s.connections_active,
                    connections_accepted = s.connections_accepted,
                    connections_rejected = s.connections_rejected,
                    frames_received = s.frames_received,
                    bytes_received = s.bytes_received,
                    acks_sent = s.acks_sent,
                    decode_failures = s.decode_failures,
                    raw_write_failures = s.raw_write_failures,
                    telemetry_write_failures = s.telemetry_write_failures,
                    idle_timeouts = s.idle_timeouts,
                    transport_errors = s.transport_errors,
                    "📊 Ingest statistics"
                );
            }
        })
    }
}

//! # Frame Processor
//!
//! Runs one logical frame through the ingest pipeline:
//!
//! 1. Capture the raw audit copy. This happens for every frame, decodable or not.
//! 2. Decode the telemetry record, optionally rejecting out-of-range coordinates.
//! 3. Write both records concurrently. The two writes are independent and neither
//!    waits on the other's outcome.
//! 4. Decide the acknowledgement. A decoded frame is acknowledged even when its
//!    writes failed; an undecodable frame never is.
//!
//! The processor owns no socket. Stream and datagram listeners share it and only
//! differ in how they deliver the resulting ack.

use crate::metrics::IngestMetrics;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, warn};
use tracker_codec::{
    decode_at, encode_ack, validate_coordinates, AckFrame, FrameError, RawFrameRecord,
    TelemetryRecord,
};
use tracker_storage::{PersistenceGateway, StorageError};

/// What happened to a single frame
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// Packet id from the raw capture, 0 when the frame was too short to carry one
    pub packet_id: u16,
    /// Bytes to send back, present only for decoded frames
    pub ack: Option<AckFrame>,
    pub decode_error: Option<FrameError>,
    pub raw_error: Option<StorageError>,
    pub telemetry_error: Option<StorageError>,
}

impl FrameOutcome {
    pub fn is_acked(&self) -> bool {
        self.ack.is_some()
    }

    /// True when both records this frame produced reached the store
    pub fn fully_persisted(&self) -> bool {
        self.decode_error.is_none() && self.raw_error.is_none() && self.telemetry_error.is_none()
    }
}

/// Shared frame pipeline, cheap to clone into every connection task
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    gateway: Arc<dyn PersistenceGateway>,
    metrics: Arc<IngestMetrics>,
    validate_coordinates: bool,
}

impl FrameProcessor {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, metrics: Arc<IngestMetrics>) -> Self {
        Self {
            gateway,
            metrics,
            validate_coordinates: true,
        }
    }

    /// Reject frames whose coordinates fall outside WGS84 bounds
    pub fn with_coordinate_validation(mut self, enabled: bool) -> Self {
        self.validate_coordinates = enabled;
        self
    }

    pub fn metrics(&self) -> &Arc<IngestMetrics> {
        &self.metrics
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    pub async fn process(&self, frame: &[u8], peer: SocketAddr) -> FrameOutcome {
        self.metrics.frame_received(frame.len());

        let captured_at = Utc::now();
        let raw = RawFrameRecord::capture_at(frame, captured_at);
        let decoded = self.decode(frame, captured_at);

        let (raw_result, telemetry_result) = tokio::join!(
            self.gateway.write_raw(&raw),
            self.write_decoded(decoded.as_ref().ok())
        );

        let raw_error = raw_result.err();
        if let Some(err) = &raw_error {
            self.metrics.raw_write_failure();
            error!(
                peer = %peer,
                packet_id = raw.packet_id,
                gateway = self.gateway.name(),
                error = %err,
                "Raw frame write failed"
            );
        }

        let telemetry_error = telemetry_result.and_then(Result::err);
        if let Some(err) = &telemetry_error {
            self.metrics.telemetry_write_failure();
            error!(
                peer = %peer,
                packet_id = raw.packet_id,
                gateway = self.gateway.name(),
                error = %err,
                "Telemetry write failed"
            );
        }

        match decoded {
            Ok(record) => {
                debug!(
                    peer = %peer,
                    packet_id = record.packet_id,
                    latitude = record.latitude,
                    longitude = record.longitude,
                    "Frame decoded"
                );
                FrameOutcome {
                    packet_id: record.packet_id,
                    ack: Some(encode_ack(record.packet_id)),
                    decode_error: None,
                    raw_error,
                    telemetry_error,
                }
            }
            Err(err) => {
                self.metrics.decode_failure();
                warn!(
                    peer = %peer,
                    packet_id = raw.packet_id,
                    frame_len = frame.len(),
                    reason = err.kind(),
                    error = %err,
                    "Frame rejected, no ack sent"
                );
                FrameOutcome {
                    packet_id: raw.packet_id,
                    ack: None,
                    decode_error: Some(err),
                    raw_error,
                    telemetry_error,
                }
            }
        }
    }

    fn decode(
        &self,
        frame: &[u8],
        captured_at: chrono::DateTime<Utc>,
    ) -> Result<TelemetryRecord, FrameError> {
        let record = decode_at(frame, captured_at)?;
        if self.validate_coordinates {
            validate_coordinates(&record)?;
        }
        Ok(record)
    }

    async fn write_decoded(
        &self,
        record: Option<&TelemetryRecord>,
    ) -> Option<Result<(), StorageError>> {
        match record {
            Some(record) => Some(self.gateway.write_telemetry(record).await),
            None => None,
        }
    }
}

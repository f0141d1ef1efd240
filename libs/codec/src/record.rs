//! Decoded telemetry and raw audit records

use crate::constants::RAW_TEXT_PLACEHOLDER;
use crate::parser::extract_packet_id_lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decoded position report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Sender-assigned correlation identifier; not unique across reconnects
    pub packet_id: u16,
    /// Degrees, scaled from micro-degrees
    pub latitude: f64,
    /// Degrees, scaled from micro-degrees
    pub longitude: f64,
    /// Device units
    pub speed: u16,
    /// Degrees
    pub course: u16,
    /// Meters
    pub altitude: u16,
    /// Wall-clock time of decode
    pub captured_at: DateTime<Utc>,
}

impl TelemetryRecord {
    /// Whether the coordinates satisfy the WGS84 range invariant
    pub fn has_valid_coordinates(&self) -> bool {
        crate::parser::coordinates_in_range(self.latitude, self.longitude)
    }
}

/// Unconditional audit copy of an inbound frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrameRecord {
    /// Best-effort packet identifier, 0 when the frame is too short to carry one
    pub packet_id: u16,
    /// Lowercase hex of the full inbound buffer
    pub raw_hex: String,
    /// Placeholder column, always [`RAW_TEXT_PLACEHOLDER`]
    pub raw_text: String,
    pub captured_at: DateTime<Utc>,
}

impl RawFrameRecord {
    /// Capture a raw frame at the current time
    pub fn capture(frame: &[u8]) -> Self {
        Self::capture_at(frame, Utc::now())
    }

    /// Capture a raw frame with an explicit timestamp
    pub fn capture_at(frame: &[u8], captured_at: DateTime<Utc>) -> Self {
        Self {
            packet_id: extract_packet_id_lenient(frame),
            raw_hex: hex::encode(frame),
            raw_text: RAW_TEXT_PLACEHOLDER.to_string(),
            captured_at,
        }
    }

    /// Recover the original bytes from the hex payload
    pub fn raw_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.raw_hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_short_frame_defaults_packet_id() {
        let record = RawFrameRecord::capture(&[0x01, 0x00, 0x0A]);
        assert_eq!(record.packet_id, 0);
        assert_eq!(record.raw_hex, "01000a");
        assert_eq!(record.raw_text, RAW_TEXT_PLACEHOLDER);
    }

    #[test]
    fn test_capture_preserves_bytes() {
        let frame = [0x01, 0x00, 0x14, 0x00, 0x2A, 0x00, 0xFF];
        let record = RawFrameRecord::capture(&frame);
        assert_eq!(record.packet_id, 42);
        assert_eq!(record.raw_bytes().unwrap(), frame.to_vec());
    }
}

//! # Telemetry Frame Parser
//!
//! ## Purpose
//!
//! Fixed-offset decoding of tracker telemetry frames. All functions are pure: the only
//! input besides the buffer is the capture timestamp, which [`decode`] takes from the
//! wall clock and [`decode_at`] takes from the caller.
//!
//! ## Validation
//!
//! [`decode`] enforces only the minimum length. Coordinate range checking is a separate
//! step ([`validate_coordinates`]) so callers can choose to store out-of-range frames
//! as raw audit rows only; [`decode_validated`] combines both.

use crate::constants::*;
use crate::error::{FrameError, FrameResult};
use crate::record::TelemetryRecord;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};

/// Decode a telemetry frame, stamping it with the current time
pub fn decode(buffer: &[u8]) -> FrameResult<TelemetryRecord> {
    decode_at(buffer, Utc::now())
}

/// Decode a telemetry frame with an explicit capture timestamp
///
/// Bytes past offset 20 are ignored.
pub fn decode_at(buffer: &[u8], captured_at: DateTime<Utc>) -> FrameResult<TelemetryRecord> {
    if buffer.len() < TELEMETRY_FRAME_LEN {
        return Err(FrameError::too_short(
            TELEMETRY_FRAME_LEN,
            buffer.len(),
            "telemetry decode",
        ));
    }

    Ok(TelemetryRecord {
        packet_id: LittleEndian::read_u16(&buffer[PACKET_ID_OFFSET..]),
        latitude: scale_coordinate(LittleEndian::read_i32(&buffer[LATITUDE_OFFSET..])),
        longitude: scale_coordinate(LittleEndian::read_i32(&buffer[LONGITUDE_OFFSET..])),
        speed: LittleEndian::read_u16(&buffer[SPEED_OFFSET..]),
        course: LittleEndian::read_u16(&buffer[COURSE_OFFSET..]),
        altitude: LittleEndian::read_u16(&buffer[ALTITUDE_OFFSET..]),
        captured_at,
    })
}

/// Decode and reject frames whose coordinates violate the range invariant
pub fn decode_validated(buffer: &[u8]) -> FrameResult<TelemetryRecord> {
    let record = decode(buffer)?;
    validate_coordinates(&record)?;
    Ok(record)
}

/// Check a decoded record against `latitude ∈ [-90, 90]`, `longitude ∈ [-180, 180]`
pub fn validate_coordinates(record: &TelemetryRecord) -> FrameResult<()> {
    if coordinates_in_range(record.latitude, record.longitude) {
        Ok(())
    } else {
        Err(FrameError::out_of_range(
            record.packet_id,
            record.latitude,
            record.longitude,
        ))
    }
}

/// Range predicate shared by validation and [`TelemetryRecord::has_valid_coordinates`]
#[inline]
pub fn coordinates_in_range(latitude: f64, longitude: f64) -> bool {
    (-MAX_LATITUDE..=MAX_LATITUDE).contains(&latitude)
        && (-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
}

/// Read the packet identifier without failing
///
/// Returns the u16 at offset 4 when the buffer is long enough to hold it, otherwise 0.
#[inline]
pub fn extract_packet_id_lenient(buffer: &[u8]) -> u16 {
    if buffer.len() >= PACKET_ID_END {
        LittleEndian::read_u16(&buffer[PACKET_ID_OFFSET..PACKET_ID_END])
    } else {
        0
    }
}

#[inline]
fn scale_coordinate(raw: i32) -> f64 {
    f64::from(raw) / COORDINATE_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(packet_id: u16, lat: i32, lon: i32, speed: u16, course: u16, alt: u16) -> Vec<u8> {
        let mut buf = vec![0x01, 0x00, 0x14, 0x00];
        buf.extend_from_slice(&packet_id.to_le_bytes());
        buf.extend_from_slice(&lat.to_le_bytes());
        buf.extend_from_slice(&lon.to_le_bytes());
        buf.extend_from_slice(&speed.to_le_bytes());
        buf.extend_from_slice(&course.to_le_bytes());
        buf.extend_from_slice(&alt.to_le_bytes());
        buf
    }

    #[test]
    fn test_decode_reference_frame() {
        let mut buf = vec![0u8; 20];
        buf[4..6].copy_from_slice(&[0x2A, 0x00]);
        buf[6..10].copy_from_slice(&[0x40, 0x54, 0x87, 0x00]);

        let record = decode(&buf).unwrap();
        assert_eq!(record.packet_id, 42);
        assert!((record.latitude - 8.868928).abs() < 1e-9);
        assert_eq!(record.longitude, 0.0);
        assert_eq!(record.speed, 0);
    }

    #[test]
    fn test_decode_all_fields() {
        let buf = frame(7, 55_755_826, 37_617_300, 60, 270, 156);
        let record = decode(&buf).unwrap();

        assert_eq!(record.packet_id, 7);
        assert!((record.latitude - 55.755826).abs() < 1e-9);
        assert!((record.longitude - 37.6173).abs() < 1e-9);
        assert_eq!(record.speed, 60);
        assert_eq!(record.course, 270);
        assert_eq!(record.altitude, 156);
    }

    #[test]
    fn test_decode_negative_coordinates() {
        let buf = frame(1, -33_868_820, -151_209_290, 0, 0, 0);
        let record = decode(&buf).unwrap();
        assert!((record.latitude + 33.86882).abs() < 1e-9);
        assert!((record.longitude + 151.20929).abs() < 1e-9);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut buf = frame(9, 1_000_000, 2_000_000, 1, 2, 3);
        let expected = decode_at(&buf, DateTime::<Utc>::MIN_UTC).unwrap();
        buf.extend_from_slice(&[0xAA; 16]);
        assert_eq!(decode_at(&buf, DateTime::<Utc>::MIN_UTC).unwrap(), expected);
    }

    #[test]
    fn test_decode_too_short() {
        let err = decode(&[0u8; 19]).unwrap_err();
        assert_eq!(
            err,
            FrameError::too_short(20, 19, "telemetry decode")
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let buf = frame(3, 91_000_000, 0, 0, 0, 0);
        assert!(decode(&buf).is_ok());
        assert!(matches!(
            decode_validated(&buf),
            Err(FrameError::OutOfRange { packet_id: 3, .. })
        ));

        let buf = frame(4, 0, -180_000_001, 0, 0, 0);
        assert!(decode_validated(&buf).is_err());
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let buf = frame(5, 90_000_000, -180_000_000, 0, 0, 0);
        assert!(decode_validated(&buf).is_ok());
    }

    #[test]
    fn test_lenient_packet_id() {
        assert_eq!(extract_packet_id_lenient(&[]), 0);
        assert_eq!(extract_packet_id_lenient(&[1, 2, 3, 4, 5]), 0);
        assert_eq!(extract_packet_id_lenient(&[1, 2, 3, 4, 0x34, 0x12]), 0x1234);
    }
}

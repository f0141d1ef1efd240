//! # Frame Constants - Tracker Wire Layout
//!
//! ## Purpose
//!
//! Central registry of byte offsets and fixed values for the tracker frame format.
//! Offsets are absolute positions inside one inbound frame; every multi-byte field
//! is little-endian.
//!
//! ## Inbound Telemetry Frame
//!
//! ```text
//! 0        2        4        6                10               14      16      18      20
//! +--------+--------+--------+----------------+----------------+-------+-------+-------+
//! | header | length | pkt id |  latitude i32  | longitude i32  | speed | course|  alt  |
//! +--------+--------+--------+----------------+----------------+-------+-------+-------+
//! ```
//!
//! ## Outbound Acknowledgment
//!
//! ```text
//! 0     1     2        4        6      7      8      9        11
//! +-----+-----+--------+--------+------+------+------+--------+
//! | ver | key | length | pkt id | type | flags| code | chksum |
//! +-----+-----+--------+--------+------+------+------+--------+
//! ```

/// Size of the fixed header preceding the packet identifier (version, key, length)
pub const FRAME_HEADER_LEN: usize = 4;

/// Offset of the u16 total-length field inside the header
pub const FRAME_LENGTH_OFFSET: usize = 2;

/// Offset of the u16 packet identifier
pub const PACKET_ID_OFFSET: usize = 4;

/// Offset of the i32 latitude (micro-degrees)
pub const LATITUDE_OFFSET: usize = 6;

/// Offset of the i32 longitude (micro-degrees)
pub const LONGITUDE_OFFSET: usize = 10;

/// Offset of the u16 speed
pub const SPEED_OFFSET: usize = 14;

/// Offset of the u16 course (degrees)
pub const COURSE_OFFSET: usize = 16;

/// Offset of the u16 altitude (meters)
pub const ALTITUDE_OFFSET: usize = 18;

/// Minimum buffer length that contains a complete telemetry frame
pub const TELEMETRY_FRAME_LEN: usize = 20;

/// Minimum buffer length that contains a packet identifier
pub const PACKET_ID_END: usize = PACKET_ID_OFFSET + 2;

/// Fixed-point scale applied to raw coordinate integers
pub const COORDINATE_SCALE: f64 = 1_000_000.0;

/// Valid latitude bound in degrees (inclusive, symmetric)
pub const MAX_LATITUDE: f64 = 90.0;

/// Valid longitude bound in degrees (inclusive, symmetric)
pub const MAX_LONGITUDE: f64 = 180.0;

/// Total length of an acknowledgment frame
pub const ACK_FRAME_LEN: usize = 11;

/// Protocol version written into every acknowledgment
pub const ACK_PROTOCOL_VERSION: u8 = 0x01;

/// Security key identifier; transport security is not negotiated
pub const ACK_SECURITY_KEY_ID: u8 = 0x00;

/// Response type for a processed frame
pub const ACK_RESPONSE_TYPE_SUCCESS: u8 = 0x00;

/// Acknowledgment flags
pub const ACK_FLAGS: u8 = 0x00;

/// Result code for a processed frame
pub const ACK_RESULT_SUCCESS: u8 = 0x00;

/// Checksum slot of the acknowledgment. Not computed; trackers in the field accept zero.
pub const ACK_CHECKSUM_PLACEHOLDER: u16 = 0x0000;

/// Value stored in the `raw_text` audit column. Carries no meaning.
pub const RAW_TEXT_PLACEHOLDER: &str = "123";

/// Default upper bound on a single reassembled frame
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

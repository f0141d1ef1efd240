//! # Tracker Frame Codec
//!
//! ## Purpose
//!
//! The "rules" layer of the ingest pipeline: how a tracker frame is laid out on the
//! wire, how it decodes into a [`TelemetryRecord`], how the acknowledgment is built,
//! and how frame boundaries are recovered from a byte stream.
//!
//! ## Architecture Role
//!
//! ```text
//! network/ → [codec] → storage/
//!     ↑         ↓          ↓
//! Raw bytes  Decode/Ack  Records
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Socket management or connection handling (belongs in network/)
//! - Persistence (belongs in storage/)
//!
//! Everything except [`FrameAssembler`] is a pure function of its input.

pub mod ack;
pub mod assembler;
pub mod constants;
pub mod error;
pub mod parser;
pub mod record;

pub use ack::{acked_packet_id, encode_ack, AckFrame};
pub use assembler::{FrameAssembler, FramingMode};
pub use constants::*;
pub use error::{FrameError, FrameResult};
pub use parser::{
    coordinates_in_range, decode, decode_at, decode_validated, extract_packet_id_lenient,
    validate_coordinates,
};
pub use record::{RawFrameRecord, TelemetryRecord};

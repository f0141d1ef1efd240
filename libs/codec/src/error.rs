//! Frame-level errors for tracker telemetry decoding
//!
//! Each variant carries enough context (buffer sizes, offending values) to diagnose
//! a misbehaving tracker from a single log line.

use thiserror::Error;

/// Decoding and framing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    /// Buffer is too small to contain the expected structure
    #[error("Frame too short: need {need} bytes, got {got} (context: {context})")]
    TooShort {
        need: usize,
        got: usize,
        context: String,
    },

    /// Decoded coordinates fall outside the valid WGS84 range
    #[error("Frame coordinates out of range: latitude {latitude}, longitude {longitude} (packet {packet_id}, indicates: {diagnosis})")]
    OutOfRange {
        packet_id: u16,
        latitude: f64,
        longitude: f64,
        diagnosis: String,
    },

    /// Declared frame length cannot describe a valid frame
    #[error("Invalid declared frame length {declared} (allowed {min}..={max}, pending: {pending} bytes)")]
    InvalidLength {
        declared: usize,
        min: usize,
        max: usize,
        pending: usize,
    },
}

impl FrameError {
    /// Create TooShort error with diagnostic context
    pub fn too_short(need: usize, got: usize, context: impl Into<String>) -> Self {
        Self::TooShort {
            need,
            got,
            context: context.into(),
        }
    }

    /// Create OutOfRange error, guessing the likely cause from the values
    pub fn out_of_range(packet_id: u16, latitude: f64, longitude: f64) -> Self {
        let diagnosis = if latitude.abs() > 90.0 && longitude.abs() <= 90.0 {
            "latitude/longitude swapped or misaligned frame"
        } else if latitude.abs() > 1_000.0 || longitude.abs() > 1_000.0 {
            "misaligned frame or wrong byte order"
        } else {
            "corrupted coordinate field"
        };

        Self::OutOfRange {
            packet_id,
            latitude,
            longitude,
            diagnosis: diagnosis.to_string(),
        }
    }

    /// Create InvalidLength error
    pub fn invalid_length(declared: usize, min: usize, max: usize, pending: usize) -> Self {
        Self::InvalidLength {
            declared,
            min,
            max,
            pending,
        }
    }

    /// Short label used for log fields and metric keys
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "frame_too_short",
            Self::OutOfRange { .. } => "frame_out_of_range",
            Self::InvalidLength { .. } => "invalid_frame_length",
        }
    }
}

/// Result type for frame operations
pub type FrameResult<T> = std::result::Result<T, FrameError>;

//! # Frame Assembler - Stream Boundary Recovery
//!
//! ## Purpose
//!
//! Stream transports carry no message boundaries. The assembler turns the sequence of
//! transport deliveries on one connection into a sequence of logical frames.
//!
//! ## Modes
//!
//! - [`FramingMode::PerRead`]: every delivery is one frame. Matches trackers that send
//!   one frame per TCP segment and never coalesce.
//! - [`FramingMode::LengthPrefixed`]: the u16 at offset 2 of the header is the total
//!   frame length. Split frames wait for the remainder, coalesced frames are separated.
//!
//! A declared length that cannot be valid leaves no way to find the next boundary, so
//! everything pending is emitted as one frame and the buffer resets. That frame still
//! reaches the raw audit path.

use crate::constants::{FRAME_HEADER_LEN, FRAME_LENGTH_OFFSET};
use crate::error::FrameError;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How frame boundaries are found in the inbound byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// One transport delivery is one frame
    #[default]
    PerRead,
    /// Frames carry their total length in the header
    LengthPrefixed,
}

/// Per-connection frame reassembly buffer
#[derive(Debug)]
pub struct FrameAssembler {
    mode: FramingMode,
    max_frame_len: usize,
    buffer: BytesMut,
}

impl FrameAssembler {
    pub fn new(mode: FramingMode, max_frame_len: usize) -> Self {
        let capacity = match mode {
            FramingMode::PerRead => 0,
            FramingMode::LengthPrefixed => max_frame_len.min(4096),
        };

        Self {
            mode,
            max_frame_len,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Bytes received but not yet emitted as a frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one transport delivery, returning every frame it completes
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        if data.is_empty() {
            return Vec::new();
        }

        match self.mode {
            FramingMode::PerRead => vec![Bytes::copy_from_slice(data)],
            FramingMode::LengthPrefixed => {
                self.buffer.extend_from_slice(data);
                self.drain_complete()
            }
        }
    }

    /// Flush whatever is pending, used when the connection closes
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            None
        } else {
            debug!(pending = self.buffer.len(), "Flushing incomplete frame");
            Some(self.buffer.split().freeze())
        }
    }

    fn drain_complete(&mut self) -> Vec<Bytes> {
        let mut frames = Vec::new();

        while self.buffer.len() >= FRAME_HEADER_LEN {
            let declared = u16::from_le_bytes([
                self.buffer[FRAME_LENGTH_OFFSET],
                self.buffer[FRAME_LENGTH_OFFSET + 1],
            ]) as usize;

            if declared < FRAME_HEADER_LEN || declared > self.max_frame_len {
                let err = FrameError::invalid_length(
                    declared,
                    FRAME_HEADER_LEN,
                    self.max_frame_len,
                    self.buffer.len(),
                );
                warn!(error = %err, "Cannot resynchronise stream, emitting pending bytes");
                frames.push(self.buffer.split().freeze());
                break;
            }

            if self.buffer.len() < declared {
                break;
            }

            frames.push(self.buffer.split_to(declared).freeze());
        }

        frames
    }
}

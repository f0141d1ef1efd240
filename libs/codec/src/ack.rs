//! Acknowledgment frame encoding

use crate::constants::*;

/// Fixed-size acknowledgment frame
pub type AckFrame = [u8; ACK_FRAME_LEN];

/// Encode the acknowledgment for a processed telemetry frame
///
/// Infallible for every `u16`; the output depends on `packet_id` alone.
pub fn encode_ack(packet_id: u16) -> AckFrame {
    let mut ack = [0u8; ACK_FRAME_LEN];
    ack[0] = ACK_PROTOCOL_VERSION;
    ack[1] = ACK_SECURITY_KEY_ID;
    ack[2..4].copy_from_slice(&(ACK_FRAME_LEN as u16).to_le_bytes());
    ack[4..6].copy_from_slice(&packet_id.to_le_bytes());
    ack[6] = ACK_RESPONSE_TYPE_SUCCESS;
    ack[7] = ACK_FLAGS;
    ack[8] = ACK_RESULT_SUCCESS;
    ack[9..11].copy_from_slice(&ACK_CHECKSUM_PLACEHOLDER.to_le_bytes());
    ack
}

/// Packet identifier echoed by an acknowledgment
pub fn acked_packet_id(ack: &AckFrame) -> u16 {
    u16::from_le_bytes([ack[4], ack[5]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_ack() {
        assert_eq!(
            encode_ack(42),
            [0x01, 0x00, 0x0B, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_ack_extremes() {
        assert_eq!(acked_packet_id(&encode_ack(0)), 0);
        assert_eq!(acked_packet_id(&encode_ack(u16::MAX)), u16::MAX);
        assert_eq!(&encode_ack(u16::MAX)[4..6], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_ack_is_idempotent() {
        assert_eq!(encode_ack(0x1234), encode_ack(0x1234));
    }
}

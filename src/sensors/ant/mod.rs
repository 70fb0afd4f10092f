//! ANT+ message framing
//!
//! FE-C data pages travel inside 13-byte ANT acknowledged-data messages,
//! tunnelled over BLE by FE-C-over-BLE trainers:
//!
//! ```text
//! [0xA4][0x09][0x4F][channel][page][payload × 7][xor of bytes 0..=11]
//! ```

pub mod fec;

use thiserror::Error;

/// ANT sync byte
pub const SYNC_BYTE: u8 = 0xA4;
/// Message length: message id + channel + 8-byte data page
pub const MESSAGE_LENGTH: u8 = 0x09;
/// Acknowledged data message id
pub const MSG_ID_ACK_DATA: u8 = 0x4F;
/// Channel used for trainer control
pub const DEFAULT_CHANNEL: u8 = 0x05;
/// Size of a full message on the wire
pub const FRAME_LEN: usize = 13;
/// Bytes in a data page payload (after the page number)
pub const PAYLOAD_LEN: usize = 7;

/// Errors raised when reading a frame
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame too short: {0} bytes")]
    TooShort(usize),

    #[error("Bad sync byte: {0:#04x}")]
    BadSync(u8),

    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    BadChecksum { expected: u8, actual: u8 },
}

/// XOR of all bytes
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// A complete 13-byte ANT message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntFrame([u8; FRAME_LEN]);

impl AntFrame {
    /// Build a frame for `page` on the default channel, computing the checksum.
    pub fn new(page: u8, payload: [u8; PAYLOAD_LEN]) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = SYNC_BYTE;
        bytes[1] = MESSAGE_LENGTH;
        bytes[2] = MSG_ID_ACK_DATA;
        bytes[3] = DEFAULT_CHANNEL;
        bytes[4] = page;
        bytes[5..12].copy_from_slice(&payload);
        bytes[12] = checksum(&bytes[..12]);
        Self(bytes)
    }

    /// Build a frame from an 8-byte data page (page number first)
    pub fn from_page(data: [u8; 8]) -> Self {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&data[1..]);
        Self::new(data[0], payload)
    }

    /// Validate and copy a received message.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < FRAME_LEN {
            return Err(FrameError::TooShort(bytes.len()));
        }
        if bytes[0] != SYNC_BYTE {
            return Err(FrameError::BadSync(bytes[0]));
        }

        let expected = checksum(&bytes[..12]);
        if bytes[12] != expected {
            return Err(FrameError::BadChecksum {
                expected,
                actual: bytes[12],
            });
        }

        let mut frame = [0u8; FRAME_LEN];
        frame.copy_from_slice(&bytes[..FRAME_LEN]);
        Ok(Self(frame))
    }

    /// Raw bytes as sent on the wire
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Data page number
    pub fn page(&self) -> u8 {
        self.0[4]
    }

    /// The 7 payload bytes following the page number
    pub fn payload(&self) -> &[u8] {
        &self.0[5..12]
    }

    /// Trailing checksum byte
    pub fn checksum(&self) -> u8 {
        self.0[12]
    }
}

impl AsRef<[u8]> for AntFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

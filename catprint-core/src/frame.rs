//! Printer frame structure and encoding/decoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::Opcode,
    constants::{MAX_PAYLOAD_SIZE, SYNC, TERMINATOR},
    error::{Error, Result},
};

/// One wire-legal printer frame
///
/// # Frame Structure
///
/// ```text
/// ┌───────────┬────────┬──────────┬─────────────┬─────────┬──────────┬────────────┐
/// │   Sync    │ Opcode │ Reserved │   Length    │ Payload │  CRC-8   │ Terminator │
/// │ 0x51 0x78 │ 1 byte │   0x00   │ (LE u16)    │ N bytes │ (payload)│    0xFF    │
/// └───────────┴────────┴──────────┴─────────────┴─────────┴──────────┴────────────┘
/// ```
///
/// `N` never exceeds [`Frame::MAX_PAYLOAD_SIZE`]. A `Frame` holds its encoded
/// bytes and cannot be mutated after construction.
///
/// # Examples
///
/// ```
/// use catprint_core::{Frame, Opcode};
///
/// let frame = Frame::new(Opcode::SetFeedRate, [0x19]).unwrap();
/// assert_eq!(
///     frame.as_bytes(),
///     &[0x51, 0x78, 0xBD, 0x00, 0x01, 0x00, 0x19, 0x4F, 0xFF][..]
/// );
///
/// let decoded = Frame::decode(frame.as_bytes()).unwrap();
/// assert_eq!(decoded, frame);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Sync + opcode + reserved + length
    pub const HEADER_SIZE: usize = 6;

    /// Checksum + terminator
    pub const TRAILER_SIZE: usize = 2;

    /// Fixed bytes around the payload
    pub const OVERHEAD: usize = Self::HEADER_SIZE + Self::TRAILER_SIZE;

    /// Maximum payload size
    pub const MAX_PAYLOAD_SIZE: usize = MAX_PAYLOAD_SIZE;

    /// Build a frame for a known opcode
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] when the payload exceeds
    /// [`Frame::MAX_PAYLOAD_SIZE`]. Nothing is encoded in that case.
    pub fn new(opcode: Opcode, payload: impl AsRef<[u8]>) -> Result<Self> {
        Self::from_raw(opcode.into(), payload.as_ref())
    }

    /// Build a frame from a raw opcode byte
    ///
    /// Used for opcodes this crate does not model yet.
    pub fn from_raw(opcode: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self::encode(opcode, payload))
    }

    /// Encode without the size check; callers guarantee the payload fits
    pub(crate) fn encode(opcode: u8, payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= Self::MAX_PAYLOAD_SIZE);

        let mut buf = BytesMut::with_capacity(Self::OVERHEAD + payload.len());

        buf.put_slice(&SYNC);
        buf.put_u8(opcode);
        buf.put_u8(0x00);
        buf.put_u16_le(payload.len() as u16);
        buf.put_slice(payload);
        buf.put_u8(checksum::calculate(payload));
        buf.put_u8(TERMINATOR);

        Self { bytes: buf.freeze() }
    }

    /// Decode a frame from bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the fixed overhead
    /// - Sync bytes, reserved byte or terminator are wrong
    /// - Declared length disagrees with the buffer
    /// - Checksum verification fails
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::OVERHEAD {
            return Err(Error::FrameTooShort {
                expected: Self::OVERHEAD,
                actual: buf.len(),
            });
        }

        let sync = [buf[0], buf[1]];
        if sync != SYNC {
            return Err(Error::InvalidSync(sync));
        }

        let declared = u16::from_le_bytes([buf[4], buf[5]]) as usize;
        let actual = buf.len() - Self::OVERHEAD;
        if buf[3] != 0x00 || declared != actual {
            return Err(Error::LengthMismatch { declared, actual });
        }

        let terminator = buf[buf.len() - 1];
        if terminator != TERMINATOR {
            return Err(Error::InvalidTerminator(terminator));
        }

        let payload = &buf[Self::HEADER_SIZE..Self::HEADER_SIZE + declared];
        let received = buf[Self::HEADER_SIZE + declared];
        let expected = checksum::calculate(payload);
        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }

        Ok(Self {
            bytes: Bytes::copy_from_slice(buf),
        })
    }

    /// Raw opcode byte
    pub fn opcode_byte(&self) -> u8 {
        self.bytes[2]
    }

    /// Opcode, if it is one this crate knows
    pub fn opcode(&self) -> Result<Opcode> {
        Opcode::try_from(self.opcode_byte())
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.bytes[Self::HEADER_SIZE..self.bytes.len() - Self::TRAILER_SIZE]
    }

    /// Length declared in the header
    pub fn declared_len(&self) -> usize {
        u16::from_le_bytes([self.bytes[4], self.bytes[5]]) as usize
    }

    /// Checksum byte
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - Self::TRAILER_SIZE]
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded bytes (cheap clone)
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Get total frame size
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Frames always carry the fixed overhead, so this is never true
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Build one frame
///
/// Shorthand for [`Frame::from_raw`].
pub fn frame(opcode: u8, payload: &[u8]) -> Result<Frame> {
    Frame::from_raw(opcode, payload)
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("opcode", &format!("0x{:02X}", self.opcode_byte()))
            .field("payload_len", &self.payload().len())
            .field("checksum", &format!("0x{:02X}", self.checksum()))
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Ok(op) => write!(f, "Frame[{}](len={})", op, self.payload().len()),
            Err(_) => write!(
                f,
                "Frame[0x{:02X}](len={})",
                self.opcode_byte(),
                self.payload().len()
            ),
        }
    }
}

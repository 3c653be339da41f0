//! Error types for catprint-core

use crate::session::SessionState;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
///
/// These are local encoding faults. They are never retried: a caller that
/// hits one has handed the codec something it must chunk or fix first.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Payload does not fit in a single frame
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Malformed 16-bit Bluetooth identifier
    #[error("Invalid identifier: {0:?} (expected four hex digits)")]
    InvalidIdentifier(String),

    /// Frame is too short to be valid
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Frame does not start with the sync bytes
    #[error("Invalid sync bytes: {0:02X?}")]
    InvalidSync([u8; 2]),

    /// Frame does not end with the terminator byte
    #[error("Invalid terminator: 0x{0:02X}")]
    InvalidTerminator(u8),

    /// Declared length disagrees with the bytes present
    #[error("Length mismatch: header declares {declared} bytes, frame carries {actual} bytes")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    ChecksumMismatch {
        expected: u8,
        received: u8,
    },

    /// Unknown opcode
    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Session state machine refused a transition
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

impl Error {
    /// Whether the error came from parsing bytes received off the wire
    /// (as opposed to encoding something the caller asked for)
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::FrameTooShort { .. }
                | Self::InvalidSync(_)
                | Self::InvalidTerminator(_)
                | Self::LengthMismatch { .. }
                | Self::ChecksumMismatch { .. }
                | Self::UnknownOpcode(_)
        )
    }
}

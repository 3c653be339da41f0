//! # catprint-core
//!
//! Core protocol implementation for GB01/GB02/GB03 thermal printers.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - CRC-8 checksum calculation
//! - Opcode definitions and logical commands (with feed chunking)
//! - 16-bit Bluetooth identifier expansion
//! - Session lifecycle state machine

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod identifier;
pub mod instruction;
pub mod session;

pub use command::Opcode;
pub use error::{Error, Result};
pub use frame::{frame, Frame};
pub use identifier::{build_uuid, uuid_from_u16};
pub use instruction::{blank_feed, encode_all, feed_lines, LogicalCommand};
pub use session::{SessionState, SessionStatus};

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "1.0";

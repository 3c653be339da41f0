//! Logical printer commands
//!
//! A [`LogicalCommand`] is what a caller wants the printer to do. It expands
//! to one or more [`Frame`]s; replaying those frames in order has the effect
//! of the single intent.

use bytes::Bytes;
use tracing::debug;

use crate::{
    command::Opcode,
    constants::{DrawingMode, FeedRate, Lattice, PrintQuality},
    error::Result,
    frame::Frame,
};

/// Largest line count a single feed frame can carry
pub const MAX_FEED_CHUNK: u32 = Frame::MAX_PAYLOAD_SIZE as u32;

/// Caller-level printing intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalCommand {
    /// Advance paper by N lines
    FeedLines(u32),

    /// Print one packed raster line
    ///
    /// A line is atomic: it is never split across frames.
    PrintLine(Bytes),

    /// Motor speed for the following feed/print
    SetFeedRate(FeedRate),

    /// Heating energy, see [`crate::constants::energy`]
    SetEnergy(u16),

    /// Print quality
    SetQuality(PrintQuality),

    /// Image or text mode
    SetDrawingMode(DrawingMode),

    /// Control lattice
    Lattice(Lattice),
}

impl LogicalCommand {
    /// Expand into wire frames
    ///
    /// # Errors
    ///
    /// [`crate::Error::PayloadTooLarge`] for a [`LogicalCommand::PrintLine`]
    /// longer than one frame.
    pub fn to_frames(&self) -> Result<Vec<Frame>> {
        match self {
            Self::FeedLines(lines) => Ok(feed_lines(*lines)),
            Self::PrintLine(line) => Ok(vec![Frame::new(Opcode::DrawBitmap, line)?]),
            Self::SetFeedRate(rate) => Ok(vec![Frame::new(Opcode::SetFeedRate, [*rate as u8])?]),
            Self::SetEnergy(energy) => Ok(vec![Frame::new(Opcode::SetEnergy, energy.to_le_bytes())?]),
            Self::SetQuality(quality) => Ok(vec![Frame::new(Opcode::SetQuality, [*quality as u8])?]),
            Self::SetDrawingMode(mode) => Ok(vec![Frame::new(Opcode::SetDrawingMode, [*mode as u8])?]),
            Self::Lattice(lattice) => Ok(vec![Frame::new(Opcode::SetControlLattice, lattice.payload())?]),
        }
    }
}

/// Expand "advance paper by `total` lines" into feed frames
///
/// Each frame carries a one-byte count of at most [`MAX_FEED_CHUNK`]; counts
/// are `min(remaining, 255)` until nothing remains. `feed_lines(0)` is empty.
///
/// # Examples
///
/// ```
/// use catprint_core::feed_lines;
///
/// let frames = feed_lines(300);
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[0].payload(), &[255]);
/// assert_eq!(frames[1].payload(), &[45]);
/// ```
pub fn feed_lines(total: u32) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(total.div_ceil(MAX_FEED_CHUNK) as usize);
    let mut remaining = total;

    while remaining > 0 {
        let chunk = remaining.min(MAX_FEED_CHUNK);
        frames.push(feed_chunk(chunk as u8));
        remaining -= chunk;
    }

    debug!(lines = total, frames = frames.len(), "Expanded paper feed");

    frames
}

fn feed_chunk(lines: u8) -> Frame {
    Frame::encode(Opcode::FeedPaper.into(), &[lines])
}

/// Blank paper advance: feed rate switch followed by the feed itself
pub fn blank_feed(lines: u32) -> Vec<LogicalCommand> {
    vec![
        LogicalCommand::SetFeedRate(FeedRate::Blank),
        LogicalCommand::FeedLines(lines),
    ]
}

/// Expand a sequence of commands into one ordered frame list
pub fn encode_all(commands: &[LogicalCommand]) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for command in commands {
        frames.extend(command.to_frames()?);
    }
    Ok(frames)
}

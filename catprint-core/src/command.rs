//! Printer opcode definitions

use std::fmt;

use crate::error::{Error, Result};

/// Printer opcodes
///
/// The byte that follows the sync bytes in every frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Advance paper (payload: line count)
    FeedPaper = 0xA1,

    /// One packed raster line, 1 bit per dot, LSB first
    DrawBitmap = 0xA2,

    /// Print quality (0x31..=0x35)
    SetQuality = 0xA4,

    /// 11-byte control lattice, sent around a bitmap
    SetControlLattice = 0xA6,

    /// Heating energy (LE u16)
    SetEnergy = 0xAF,

    /// Motor speed for the following feed/print
    SetFeedRate = 0xBD,

    /// Image or text drawing mode
    SetDrawingMode = 0xBE,
}

impl Opcode {
    /// Get opcode name
    pub fn name(self) -> &'static str {
        match self {
            Self::FeedPaper => "FEED_PAPER",
            Self::DrawBitmap => "DRAW_BITMAP",
            Self::SetQuality => "SET_QUALITY",
            Self::SetControlLattice => "SET_CONTROL_LATTICE",
            Self::SetEnergy => "SET_ENERGY",
            Self::SetFeedRate => "SET_FEED_RATE",
            Self::SetDrawingMode => "SET_DRAWING_MODE",
        }
    }

    /// Check if this opcode changes a printer setting rather than moving paper
    pub fn is_setting(self) -> bool {
        !matches!(self, Self::FeedPaper | Self::DrawBitmap)
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0xA1 => Ok(Self::FeedPaper),
            0xA2 => Ok(Self::DrawBitmap),
            0xA4 => Ok(Self::SetQuality),
            0xA6 => Ok(Self::SetControlLattice),
            0xAF => Ok(Self::SetEnergy),
            0xBD => Ok(Self::SetFeedRate),
            0xBE => Ok(Self::SetDrawingMode),
            _ => Err(Error::UnknownOpcode(value)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

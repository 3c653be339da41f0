//! Protocol constants

/// Frame sync bytes
pub const SYNC: [u8; 2] = [0x51, 0x78];

/// Frame terminator
pub const TERMINATOR: u8 = 0xFF;

/// Largest payload a single frame may carry
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Advertised names of supported printers
pub const PRINTER_NAMES: [&str; 4] = ["GT01", "GB01", "GB02", "GB03"];

/// Default discovery timeout (seconds)
pub const DEFAULT_SCAN_TIMEOUT: u64 = 15;

/// Bytes per write-without-response; longer frames are split
pub const MAX_WRITE_LEN: usize = 60;

/// GATT identifiers (16-bit short form)
pub mod gatt {
    /// Printer service
    pub const PRINTER_SERVICE: u16 = 0xAE30;

    /// Command characteristic (write without response)
    pub const COMMAND_CHARACTERISTIC: u16 = 0xAE01;

    /// Notification characteristic
    pub const NOTIFY_CHARACTERISTIC: u16 = 0xAE02;

    /// Service advertised by some firmware revisions instead of 0xAE30
    pub const ALT_ADVERTISED_SERVICE: u16 = 0xAF30;
}

/// Feed rates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FeedRate {
    /// While printing a bitmap
    Print = 0x23,

    /// Blank paper advance
    Blank = 0x19,
}

/// Drawing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DrawingMode {
    Image = 0x00,
    Text = 0x01,
}

/// Print quality levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PrintQuality {
    A = 0x31,
    B = 0x32,
    /// Vendor app default
    #[default]
    C = 0x33,
    D = 0x34,
    E = 0x35,
}

/// Heating energy presets
pub mod energy {
    pub const LOW: u16 = 8000;
    pub const MEDIUM: u16 = 12000;
    pub const HIGH: u16 = 17500;
}

/// Control lattice payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lattice {
    /// Sent before the first bitmap line
    Start,

    /// Sent after the last bitmap line
    Finish,
}

impl Lattice {
    /// Raw 11-byte payload
    pub fn payload(self) -> [u8; 11] {
        match self {
            Self::Start => [0xAA, 0x55, 0x17, 0x38, 0x44, 0x5F, 0x5F, 0x5F, 0x44, 0x38, 0x2C],
            Self::Finish => [0xAA, 0x55, 0x17, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x17],
        }
    }
}

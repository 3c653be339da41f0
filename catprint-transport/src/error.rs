//! Transport errors
//!
//! Backends report failures through these variants without interpretation;
//! the session layer wraps them and decides what they mean.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("Unknown scan handle: {0}")]
    UnknownScan(u64),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Service discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Disconnect failed: {0}")]
    DisconnectFailed(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

//! High-level error types

use std::time::Duration;

use catprint_transport::Error as TransportError;
use catprint_types::DeviceAddress;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] catprint_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Type error: {0}")]
    Types(#[from] catprint_types::Error),

    #[error("No matching printer found within {}s", timeout.as_secs_f32())]
    DiscoveryTimeout { timeout: Duration },

    #[error("Scan ended before a matching printer was found")]
    ScanEnded,

    #[error("Failed to connect to {address}: {source}")]
    ConnectFailed {
        address: DeviceAddress,
        #[source]
        source: TransportError,
    },

    #[error("Endpoint {endpoint} not found")]
    EndpointNotFound {
        endpoint: Uuid,
        #[source]
        source: Option<TransportError>,
    },

    #[error("Transmit failed after {frames_sent} frame(s): {source}")]
    TransmitFailed {
        frames_sent: usize,
        #[source]
        source: TransportError,
    },

    #[error("Disconnect failed: {0}")]
    DisconnectFailed(#[source] TransportError),

    #[error("Device {0} already has an active session")]
    DeviceBusy(DeviceAddress),
}

impl Error {
    /// Check if trying the whole operation again may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DiscoveryTimeout { .. }
                | Error::ScanEnded
                | Error::ConnectFailed { .. }
                | Error::DeviceBusy(_)
                | Error::Transport(TransportError::ScanInProgress)
        )
    }

    /// Frames accepted by the transport before a transmit failure
    pub fn frames_sent(&self) -> Option<usize> {
        match self {
            Error::TransmitFailed { frames_sent, .. } => Some(*frames_sent),
            _ => None,
        }
    }
}

//! Handles returned by a transport
//!
//! Handles are references into the transport, not owned resources: they stay
//! cheap to clone and become meaningless once the device disconnects.

use std::fmt;

use bitflags::bitflags;
use catprint_types::{Advertisement, DeviceAddress};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one outstanding scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanHandle(pub u64);

impl fmt::Display for ScanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan#{}", self.0)
    }
}

/// Scan filter passed down to the backend
///
/// Backends may use the service list to filter in hardware; they are free to
/// deliver non-matching advertisements as well.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub services: Vec<Uuid>,
}

/// A running scan: its handle plus the advertisement events it produces
///
/// The event sequence ends when the scan is stopped or the backend gives up.
#[derive(Debug)]
pub struct Scan {
    pub handle: ScanHandle,
    pub events: mpsc::Receiver<Advertisement>,
}

impl Scan {
    pub fn new(handle: ScanHandle, events: mpsc::Receiver<Advertisement>) -> Self {
        Self { handle, events }
    }
}

/// Connected device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    pub address: DeviceAddress,
}

impl DeviceHandle {
    pub fn new(address: DeviceAddress) -> Self {
        Self { address }
    }
}

/// GATT service on a connected device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceHandle {
    pub device: DeviceAddress,
    pub uuid: Uuid,
}

bitflags! {
    /// Characteristic capabilities
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharacteristicProperties: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const WRITE_WITHOUT_RESPONSE = 1 << 2;
        const NOTIFY = 1 << 3;
    }
}

/// GATT characteristic on a connected device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle {
    pub device: DeviceAddress,
    pub service: Uuid,
    pub uuid: Uuid,
    pub properties: CharacteristicProperties,
}

impl CharacteristicHandle {
    /// Check if the characteristic accepts write-without-response
    pub fn is_writable(&self) -> bool {
        self.properties
            .contains(CharacteristicProperties::WRITE_WITHOUT_RESPONSE)
    }

    /// Check if the characteristic can notify
    pub fn can_notify(&self) -> bool {
        self.properties.contains(CharacteristicProperties::NOTIFY)
    }
}

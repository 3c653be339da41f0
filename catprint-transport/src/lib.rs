//! Transport layer for catprint
//!
//! The [`Transport`] trait is the wireless capability the session layer
//! drives. Implementations:
//! - [`MemoryTransport`]: scripted in-process peripherals (tests, dry runs)
//! - `BleTransport`: Bluetooth LE through btleplug (feature `ble`)

pub mod error;
pub mod handle;
pub mod memory;

#[cfg(feature = "ble")]
pub mod ble;

pub use error::{Error, Result};
pub use handle::{
    CharacteristicHandle, CharacteristicProperties, DeviceHandle, Scan, ScanFilter, ScanHandle,
    ServiceHandle,
};
pub use memory::{MemoryTransport, TransportCall, VirtualPeripheral};

#[cfg(feature = "ble")]
pub use ble::BleTransport;

use async_trait::async_trait;
use catprint_types::DeviceAddress;
use uuid::Uuid;

/// Wireless capability used by a printing session
///
/// One adapter handle is shared by every session in the process, so methods
/// take `&self`. Implementations allow at most one outstanding scan.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Power up / check the adapter
    async fn enable(&self) -> Result<()>;

    /// Start a discovery sweep
    ///
    /// Fails with [`Error::ScanInProgress`] while another scan is outstanding.
    async fn scan(&self, filter: &ScanFilter) -> Result<Scan>;

    /// Stop a sweep started by [`Transport::scan`]
    async fn stop_scan(&self, handle: ScanHandle) -> Result<()>;

    /// Connect to an advertised device
    async fn connect(&self, address: &DeviceAddress) -> Result<DeviceHandle>;

    /// Resolve services by identifier
    async fn discover_services(
        &self,
        device: &DeviceHandle,
        services: &[Uuid],
    ) -> Result<Vec<ServiceHandle>>;

    /// Resolve characteristics of a service by identifier
    async fn discover_characteristics(
        &self,
        service: &ServiceHandle,
        characteristics: &[Uuid],
    ) -> Result<Vec<CharacteristicHandle>>;

    /// Write without waiting for an acknowledgement; returns bytes written
    async fn write_without_response(
        &self,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<usize>;

    /// Disconnect from a device
    async fn disconnect(&self, device: &DeviceHandle) -> Result<()>;
}

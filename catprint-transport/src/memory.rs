//! In-memory transport
//!
//! Virtual peripherals that advertise on a schedule, accept connections and
//! record every write. Failures can be injected per operation, and every call
//! is logged so tests can assert on exactly what the session layer did.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use catprint_core::constants::gatt;
use catprint_core::uuid_from_u16;
use catprint_types::{Advertisement, DeviceAddress};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::handle::{
    CharacteristicHandle, CharacteristicProperties, DeviceHandle, Scan, ScanFilter, ScanHandle,
    ServiceHandle,
};
use crate::{error::*, Transport};

const EVENT_BUFFER: usize = 32;

/// A GATT service exposed by a virtual peripheral
#[derive(Debug, Clone)]
pub struct VirtualService {
    pub uuid: Uuid,
    pub characteristics: Vec<(Uuid, CharacteristicProperties)>,
}

/// A scripted peripheral
#[derive(Debug, Clone)]
pub struct VirtualPeripheral {
    pub address: DeviceAddress,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub advertised_services: Vec<Uuid>,
    pub services: Vec<VirtualService>,

    /// Delay after scan start before the peripheral advertises; `None` never
    pub advertise_after: Option<Duration>,
}

impl VirtualPeripheral {
    /// Bare peripheral with no GATT services, advertising immediately
    pub fn new(address: impl Into<DeviceAddress>) -> Self {
        Self {
            address: address.into(),
            name: None,
            rssi: None,
            advertised_services: Vec::new(),
            services: Vec::new(),
            advertise_after: Some(Duration::ZERO),
        }
    }

    /// Peripheral laid out like a GB-series printer
    pub fn printer(address: impl Into<DeviceAddress>, name: impl Into<String>) -> Self {
        Self::new(address)
            .with_name(name)
            .with_rssi(-55)
            .with_service(
                uuid_from_u16(gatt::PRINTER_SERVICE),
                vec![
                    (
                        uuid_from_u16(gatt::COMMAND_CHARACTERISTIC),
                        CharacteristicProperties::WRITE
                            | CharacteristicProperties::WRITE_WITHOUT_RESPONSE,
                    ),
                    (
                        uuid_from_u16(gatt::NOTIFY_CHARACTERISTIC),
                        CharacteristicProperties::NOTIFY,
                    ),
                ],
            )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    pub fn with_service(
        mut self,
        uuid: Uuid,
        characteristics: Vec<(Uuid, CharacteristicProperties)>,
    ) -> Self {
        self.services.push(VirtualService {
            uuid,
            characteristics,
        });
        self
    }

    /// Drop every GATT service (endpoint resolution will fail)
    pub fn without_services(mut self) -> Self {
        self.services.clear();
        self
    }

    /// Include a service identifier in the advertisement
    pub fn advertising_service(mut self, uuid: Uuid) -> Self {
        self.advertised_services.push(uuid);
        self
    }

    pub fn advertising_after(mut self, delay: Duration) -> Self {
        self.advertise_after = Some(delay);
        self
    }

    /// Never advertise
    pub fn hidden(mut self) -> Self {
        self.advertise_after = None;
        self
    }

    fn advertisement(&self) -> Advertisement {
        let mut ad = Advertisement::new(self.address.clone());
        ad.name = self.name.clone();
        ad.rssi = self.rssi;
        ad.services = self.advertised_services.clone();
        ad
    }
}

/// Calls observed by a [`MemoryTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Enable,
    Scan(ScanHandle),
    StopScan(ScanHandle),
    Connect(DeviceAddress),
    DiscoverServices(DeviceAddress),
    DiscoverCharacteristics(Uuid),
    Write {
        device: DeviceAddress,
        characteristic: Uuid,
        len: usize,
    },
    Disconnect(DeviceAddress),
}

#[derive(Debug, Default)]
struct State {
    peripherals: Vec<VirtualPeripheral>,
    calls: Vec<TransportCall>,
    writes: Vec<Bytes>,
    connected: HashSet<DeviceAddress>,
    scan: Option<(ScanHandle, JoinHandle<()>)>,
    next_scan: u64,
    write_attempts: usize,

    scan_ends: bool,
    enable_error: Option<Error>,
    connect_failures: HashMap<DeviceAddress, u32>,
    fail_write_at: Option<usize>,
    disconnect_error: Option<Error>,
}

/// In-memory transport
///
/// # Examples
///
/// ```
/// use catprint_transport::{MemoryTransport, VirtualPeripheral};
///
/// let transport = MemoryTransport::new()
///     .with_peripheral(VirtualPeripheral::printer("AA:BB:CC:DD:EE:01", "GB02"))
///     .failing_write_at(3);
/// assert!(!transport.is_scanning());
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

impl MemoryTransport {
    /// Create an empty transport (no peripherals)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peripheral(self, peripheral: VirtualPeripheral) -> Self {
        self.state.lock().peripherals.push(peripheral);
        self
    }

    /// End the advertisement stream once every scheduled advertisement was sent
    pub fn ending_scan(self) -> Self {
        self.state.lock().scan_ends = true;
        self
    }

    pub fn failing_enable(self, error: Error) -> Self {
        self.state.lock().enable_error = Some(error);
        self
    }

    /// Fail the next `times` connection attempts to `address`
    pub fn failing_connect(self, address: impl Into<DeviceAddress>, times: u32) -> Self {
        self.state
            .lock()
            .connect_failures
            .insert(address.into(), times);
        self
    }

    /// Fail the write with this zero-based index (counted across the transport)
    pub fn failing_write_at(self, index: usize) -> Self {
        self.state.lock().fail_write_at = Some(index);
        self
    }

    pub fn failing_disconnect(self, error: Error) -> Self {
        self.state.lock().disconnect_error = Some(error);
        self
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Payloads of successful writes, in order
    pub fn writes(&self) -> Vec<Bytes> {
        self.state.lock().writes.clone()
    }

    /// Check if a scan is outstanding
    pub fn is_scanning(&self) -> bool {
        self.state.lock().scan.is_some()
    }

    /// Check if a device is currently connected
    pub fn is_connected(&self, address: &DeviceAddress) -> bool {
        self.state.lock().connected.contains(address)
    }

    fn record(state: &mut State, call: TransportCall) {
        trace!(?call, "Memory transport call");
        state.calls.push(call);
    }

    fn peripheral<'a>(state: &'a State, address: &DeviceAddress) -> Result<&'a VirtualPeripheral> {
        state
            .peripherals
            .iter()
            .find(|p| &p.address == address)
            .ok_or_else(|| Error::DeviceNotFound(address.to_string()))
    }

    fn ensure_connected(state: &State, address: &DeviceAddress) -> Result<()> {
        if !state.connected.contains(address) {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn enable(&self) -> Result<()> {
        let mut state = self.state.lock();
        Self::record(&mut state, TransportCall::Enable);

        match &state.enable_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Scan> {
        let mut state = self.state.lock();

        if state.scan.is_some() {
            return Err(Error::ScanInProgress);
        }

        state.next_scan += 1;
        let handle = ScanHandle(state.next_scan);
        Self::record(&mut state, TransportCall::Scan(handle));

        let mut schedule: Vec<(Duration, VirtualPeripheral)> = state
            .peripherals
            .iter()
            .filter(|p| {
                filter.services.is_empty()
                    || p.advertised_services.iter().any(|s| filter.services.contains(s))
            })
            .filter_map(|p| p.advertise_after.map(|after| (after, p.clone())))
            .collect();
        schedule.sort_by_key(|(after, _)| *after);

        debug!(
            %handle,
            advertisements = schedule.len(),
            services = filter.services.len(),
            "Starting memory scan"
        );

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let scan_ends = state.scan_ends;
        let start = Instant::now();

        let task = tokio::spawn(async move {
            for (after, peripheral) in schedule {
                sleep_until(start + after).await;
                if tx.send(peripheral.advertisement()).await.is_err() {
                    return;
                }
            }
            if !scan_ends {
                // Keep the stream open until stopped, like a radio would
                std::future::pending::<()>().await;
            }
        });

        state.scan = Some((handle, task));
        Ok(Scan::new(handle, rx))
    }

    async fn stop_scan(&self, handle: ScanHandle) -> Result<()> {
        let mut state = self.state.lock();
        Self::record(&mut state, TransportCall::StopScan(handle));

        match state.scan.take() {
            Some((active, task)) if active == handle => {
                task.abort();
                debug!(%handle, "Stopped memory scan");
                Ok(())
            }
            other => {
                state.scan = other;
                Err(Error::UnknownScan(handle.0))
            }
        }
    }

    async fn connect(&self, address: &DeviceAddress) -> Result<DeviceHandle> {
        let mut state = self.state.lock();
        Self::record(&mut state, TransportCall::Connect(address.clone()));

        Self::peripheral(&state, address)?;

        if let Some(remaining) = state.connect_failures.get_mut(address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::ConnectFailed(format!("{} refused connection", address)));
            }
        }

        state.connected.insert(address.clone());
        Ok(DeviceHandle::new(address.clone()))
    }

    async fn discover_services(
        &self,
        device: &DeviceHandle,
        services: &[Uuid],
    ) -> Result<Vec<ServiceHandle>> {
        let mut state = self.state.lock();
        Self::record(&mut state, TransportCall::DiscoverServices(device.address.clone()));
        Self::ensure_connected(&state, &device.address)?;

        let peripheral = Self::peripheral(&state, &device.address)?;
        Ok(peripheral
            .services
            .iter()
            .filter(|s| services.is_empty() || services.contains(&s.uuid))
            .map(|s| ServiceHandle {
                device: device.address.clone(),
                uuid: s.uuid,
            })
            .collect())
    }

    async fn discover_characteristics(
        &self,
        service: &ServiceHandle,
        characteristics: &[Uuid],
    ) -> Result<Vec<CharacteristicHandle>> {
        let mut state = self.state.lock();
        Self::record(&mut state, TransportCall::DiscoverCharacteristics(service.uuid));
        Self::ensure_connected(&state, &service.device)?;

        let peripheral = Self::peripheral(&state, &service.device)?;
        let virtual_service = peripheral
            .services
            .iter()
            .find(|s| s.uuid == service.uuid)
            .ok_or_else(|| Error::DiscoveryFailed(format!("service {} is gone", service.uuid)))?;

        Ok(virtual_service
            .characteristics
            .iter()
            .filter(|(uuid, _)| characteristics.is_empty() || characteristics.contains(uuid))
            .map(|(uuid, properties)| CharacteristicHandle {
                device: service.device.clone(),
                service: service.uuid,
                uuid: *uuid,
                properties: *properties,
            })
            .collect())
    }

    async fn write_without_response(
        &self,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<usize> {
        let mut state = self.state.lock();
        Self::record(
            &mut state,
            TransportCall::Write {
                device: characteristic.device.clone(),
                characteristic: characteristic.uuid,
                len: data.len(),
            },
        );
        Self::ensure_connected(&state, &characteristic.device)?;

        if !characteristic.is_writable() {
            return Err(Error::WriteFailed(format!(
                "{} does not accept write-without-response",
                characteristic.uuid
            )));
        }

        let index = state.write_attempts;
        state.write_attempts += 1;
        if state.fail_write_at == Some(index) {
            return Err(Error::WriteFailed(format!("injected failure at write {}", index)));
        }

        state.writes.push(Bytes::copy_from_slice(data));
        Ok(data.len())
    }

    async fn disconnect(&self, device: &DeviceHandle) -> Result<()> {
        let mut state = self.state.lock();
        Self::record(&mut state, TransportCall::Disconnect(device.address.clone()));

        if !state.connected.remove(&device.address) {
            return Err(Error::NotConnected);
        }

        match &state.disconnect_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        if let Some((_, task)) = self.state.get_mut().scan.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn printer_service() -> Uuid {
        uuid_from_u16(gatt::PRINTER_SERVICE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_delivers_in_schedule_order() {
        let transport = MemoryTransport::new()
            .with_peripheral(
                VirtualPeripheral::printer("02", "GB02").advertising_after(Duration::from_secs(2)),
            )
            .with_peripheral(
                VirtualPeripheral::printer("01", "GB01").advertising_after(Duration::from_secs(1)),
            )
            .with_peripheral(VirtualPeripheral::printer("03", "GB03").hidden());

        let mut scan = transport.scan(&ScanFilter::default()).await.unwrap();

        let first = scan.events.recv().await.unwrap();
        let second = scan.events.recv().await.unwrap();
        assert_eq!(first.name.as_deref(), Some("GB01"));
        assert_eq!(second.name.as_deref(), Some("GB02"));

        transport.stop_scan(scan.handle).await.unwrap();
        assert!(scan.events.recv().await.is_none());
        assert!(!transport.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_outstanding_scan() {
        let transport = MemoryTransport::new();
        let scan = transport.scan(&ScanFilter::default()).await.unwrap();

        assert_eq!(
            transport.scan(&ScanFilter::default()).await.unwrap_err(),
            Error::ScanInProgress
        );

        assert_eq!(
            transport.stop_scan(ScanHandle(99)).await.unwrap_err(),
            Error::UnknownScan(99)
        );
        assert!(transport.is_scanning());

        transport.stop_scan(scan.handle).await.unwrap();
        assert!(transport.scan(&ScanFilter::default()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_filters_by_advertised_service() {
        let service = uuid_from_u16(gatt::ALT_ADVERTISED_SERVICE);
        let transport = MemoryTransport::new()
            .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
            .with_peripheral(VirtualPeripheral::printer("02", "MX06").advertising_service(service))
            .ending_scan();

        let filter = ScanFilter {
            services: vec![service],
        };
        let mut scan = transport.scan(&filter).await.unwrap();

        let only = scan.events.recv().await.unwrap();
        assert_eq!(only.address, DeviceAddress::new("02"));
        assert!(scan.events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ending_scan_closes_stream() {
        let transport = MemoryTransport::new()
            .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
            .ending_scan();

        let mut scan = transport.scan(&ScanFilter::default()).await.unwrap();
        assert!(scan.events.recv().await.is_some());
        assert!(scan.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_and_resolve_printer_layout() {
        let transport =
            MemoryTransport::new().with_peripheral(VirtualPeripheral::printer("01", "GB01"));
        let address = DeviceAddress::new("01");

        let device = transport.connect(&address).await.unwrap();
        assert!(transport.is_connected(&address));

        let services = transport
            .discover_services(&device, &[printer_service()])
            .await
            .unwrap();
        assert_eq!(services.len(), 1);

        let chars = transport
            .discover_characteristics(&services[0], &[])
            .await
            .unwrap();
        assert_eq!(chars.len(), 2);
        assert!(chars[0].is_writable());
        assert!(chars[1].can_notify());
    }

    #[tokio::test]
    async fn test_connect_unknown_device() {
        let transport = MemoryTransport::new();
        let result = transport.connect(&DeviceAddress::new("nope")).await;

        assert!(matches!(result, Err(Error::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_connect_failure_injection() {
        let transport = MemoryTransport::new()
            .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
            .failing_connect("01", 1);
        let address = DeviceAddress::new("01");

        assert!(matches!(
            transport.connect(&address).await,
            Err(Error::ConnectFailed(_))
        ));
        assert!(transport.connect(&address).await.is_ok());
    }

    #[tokio::test]
    async fn test_write_failure_injection() {
        let transport = MemoryTransport::new()
            .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
            .failing_write_at(1);
        let device = transport.connect(&DeviceAddress::new("01")).await.unwrap();
        let service = transport
            .discover_services(&device, &[printer_service()])
            .await
            .unwrap()
            .remove(0);
        let command = transport
            .discover_characteristics(&service, &[uuid_from_u16(gatt::COMMAND_CHARACTERISTIC)])
            .await
            .unwrap()
            .remove(0);

        assert_eq!(transport.write_without_response(&command, &[1, 2]).await, Ok(2));
        assert!(transport.write_without_response(&command, &[3]).await.is_err());
        assert_eq!(transport.write_without_response(&command, &[4]).await, Ok(1));

        assert_eq!(
            transport.writes(),
            vec![Bytes::from_static(&[1, 2]), Bytes::from_static(&[4])]
        );
    }

    #[tokio::test]
    async fn test_write_requires_connection() {
        let transport =
            MemoryTransport::new().with_peripheral(VirtualPeripheral::printer("01", "GB01"));
        let handle = CharacteristicHandle {
            device: DeviceAddress::new("01"),
            service: printer_service(),
            uuid: uuid_from_u16(gatt::COMMAND_CHARACTERISTIC),
            properties: CharacteristicProperties::WRITE_WITHOUT_RESPONSE,
        };

        assert_eq!(
            transport.write_without_response(&handle, &[1]).await,
            Err(Error::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_disconnect_failure_still_disconnects() {
        let transport = MemoryTransport::new()
            .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
            .failing_disconnect(Error::DisconnectFailed("link lost".into()));
        let address = DeviceAddress::new("01");
        let device = transport.connect(&address).await.unwrap();

        assert!(transport.disconnect(&device).await.is_err());
        assert!(!transport.is_connected(&address));
        assert_eq!(
            transport.count_calls(|c| matches!(c, TransportCall::Disconnect(_))),
            1
        );
    }
}

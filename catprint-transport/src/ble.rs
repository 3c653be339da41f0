//! Bluetooth LE transport (btleplug)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use catprint_types::{Advertisement, DeviceAddress};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::handle::{
    CharacteristicHandle, CharacteristicProperties, DeviceHandle, Scan, ScanFilter, ScanHandle,
    ServiceHandle,
};
use crate::{error::*, Transport};

const EVENT_BUFFER: usize = 64;

type PeripheralMap = Arc<Mutex<HashMap<DeviceAddress, Peripheral>>>;

#[derive(Default)]
struct ScanState {
    next: u64,
    active: Option<(ScanHandle, JoinHandle<()>)>,
}

/// Transport over the first Bluetooth adapter on the host
pub struct BleTransport {
    adapter: Adapter,
    peripherals: PeripheralMap,
    scan: Mutex<ScanState>,
}

impl BleTransport {
    /// Open the first available adapter
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await.map_err(backend)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| Error::AdapterUnavailable(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::AdapterUnavailable("no Bluetooth adapter found".into()))?;

        Ok(Self {
            adapter,
            peripherals: Arc::new(Mutex::new(HashMap::new())),
            scan: Mutex::new(ScanState::default()),
        })
    }

    fn peripheral(&self, address: &DeviceAddress) -> Result<Peripheral> {
        self.peripherals
            .lock()
            .get(address)
            .cloned()
            .ok_or_else(|| Error::DeviceNotFound(address.to_string()))
    }

    fn characteristic(
        peripheral: &Peripheral,
        handle: &CharacteristicHandle,
    ) -> Result<Characteristic> {
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == handle.uuid && c.service_uuid == handle.service)
            .ok_or_else(|| Error::WriteFailed(format!("characteristic {} is gone", handle.uuid)))
    }
}

fn backend(e: btleplug::Error) -> Error {
    Error::Backend(e.to_string())
}

fn address_of(id: &PeripheralId, address: BDAddr) -> DeviceAddress {
    // Some platforms hide the hardware address behind an opaque identifier
    if address.into_inner() == [0; 6] {
        DeviceAddress::new(format!("{:?}", id))
    } else {
        DeviceAddress::new(address.to_string())
    }
}

fn properties_from(flags: CharPropFlags) -> CharacteristicProperties {
    let mut properties = CharacteristicProperties::empty();
    if flags.contains(CharPropFlags::READ) {
        properties |= CharacteristicProperties::READ;
    }
    if flags.contains(CharPropFlags::WRITE) {
        properties |= CharacteristicProperties::WRITE;
    }
    if flags.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
        properties |= CharacteristicProperties::WRITE_WITHOUT_RESPONSE;
    }
    if flags.contains(CharPropFlags::NOTIFY) {
        properties |= CharacteristicProperties::NOTIFY;
    }
    properties
}

async fn observe(
    adapter: &Adapter,
    id: &PeripheralId,
    peripherals: &PeripheralMap,
) -> Option<Advertisement> {
    let peripheral = adapter.peripheral(id).await.ok()?;
    let props = match peripheral.properties().await {
        Ok(Some(props)) => props,
        Ok(None) => return None,
        Err(e) => {
            trace!(error = %e, "Failed to read peripheral properties");
            return None;
        }
    };

    let address = address_of(id, props.address);
    peripherals.lock().insert(address.clone(), peripheral);

    let mut ad = Advertisement::new(address);
    ad.name = props.local_name;
    ad.rssi = props.rssi;
    ad.services = props.services;
    Some(ad)
}

#[async_trait]
impl Transport for BleTransport {
    async fn enable(&self) -> Result<()> {
        let info = self
            .adapter
            .adapter_info()
            .await
            .map_err(|e| Error::AdapterUnavailable(e.to_string()))?;
        info!(adapter = %info, "Bluetooth adapter ready");
        Ok(())
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Scan> {
        let handle = {
            let mut scan = self.scan.lock();
            if scan.active.is_some() {
                return Err(Error::ScanInProgress);
            }
            scan.next += 1;
            ScanHandle(scan.next)
        };

        let mut events = self
            .adapter
            .events()
            .await
            .map_err(|e| Error::ScanFailed(e.to_string()))?;
        self.adapter
            .start_scan(btleplug::api::ScanFilter {
                services: filter.services.clone(),
            })
            .await
            .map_err(|e| Error::ScanFailed(e.to_string()))?;

        debug!(%handle, "Started BLE scan");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let adapter = self.adapter.clone();
        let peripherals = Arc::clone(&self.peripherals);

        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => continue,
                };
                if let Some(ad) = observe(&adapter, &id, &peripherals).await {
                    if tx.send(ad).await.is_err() {
                        break;
                    }
                }
            }
            debug!("BLE event stream ended");
        });

        let mut scan = self.scan.lock();
        if scan.active.is_some() {
            task.abort();
            return Err(Error::ScanInProgress);
        }
        scan.active = Some((handle, task));
        Ok(Scan::new(handle, rx))
    }

    async fn stop_scan(&self, handle: ScanHandle) -> Result<()> {
        {
            let mut scan = self.scan.lock();
            match scan.active.take() {
                Some((active, task)) if active == handle => task.abort(),
                other => {
                    scan.active = other;
                    return Err(Error::UnknownScan(handle.0));
                }
            }
        }

        self.adapter
            .stop_scan()
            .await
            .map_err(|e| Error::ScanFailed(e.to_string()))?;
        debug!(%handle, "Stopped BLE scan");
        Ok(())
    }

    async fn connect(&self, address: &DeviceAddress) -> Result<DeviceHandle> {
        let peripheral = self.peripheral(address)?;
        peripheral
            .connect()
            .await
            .map_err(|e| Error::ConnectFailed(e.to_string()))?;
        Ok(DeviceHandle::new(address.clone()))
    }

    async fn discover_services(
        &self,
        device: &DeviceHandle,
        services: &[Uuid],
    ) -> Result<Vec<ServiceHandle>> {
        let peripheral = self.peripheral(&device.address)?;
        if !peripheral.is_connected().await.map_err(backend)? {
            return Err(Error::NotConnected);
        }

        peripheral
            .discover_services()
            .await
            .map_err(|e| Error::DiscoveryFailed(e.to_string()))?;

        Ok(peripheral
            .services()
            .into_iter()
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
        let peripheral = self.peripheral(&service.device)?;
        let found = peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == service.uuid)
            .ok_or_else(|| Error::DiscoveryFailed(format!("service {} not resolved", service.uuid)))?;

        Ok(found
            .characteristics
            .into_iter()
            .filter(|c| characteristics.is_empty() || characteristics.contains(&c.uuid))
            .map(|c| CharacteristicHandle {
                device: service.device.clone(),
                service: service.uuid,
                uuid: c.uuid,
                properties: properties_from(c.properties),
            })
            .collect())
    }

    async fn write_without_response(
        &self,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<usize> {
        let peripheral = self.peripheral(&characteristic.device)?;
        let target = Self::characteristic(&peripheral, characteristic)?;

        peripheral
            .write(&target, data, WriteType::WithoutResponse)
            .await
            .map_err(|e| Error::WriteFailed(e.to_string()))?;
        trace!(len = data.len(), "BLE write");
        Ok(data.len())
    }

    async fn disconnect(&self, device: &DeviceHandle) -> Result<()> {
        let peripheral = self.peripheral(&device.address)?;
        peripheral
            .disconnect()
            .await
            .map_err(|e| Error::DisconnectFailed(e.to_string()))
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        if let Some((handle, task)) = self.scan.get_mut().active.take() {
            warn!(%handle, "BLE transport dropped with an active scan");
            task.abort();
        }
    }
}

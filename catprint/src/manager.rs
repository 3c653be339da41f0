//! Session manager
//!
//! Drives the lifecycle: discovery, connection, endpoint resolution, frame
//! delivery and teardown. One manager is shared by every session in the
//! process; it owns the scan lock and the device reservations.

use std::collections::HashSet;
use std::sync::Arc;

use catprint_core::{blank_feed, encode_all, Frame, LogicalCommand, SessionState, SessionStatus};
use catprint_transport::{DeviceHandle, ScanFilter, ScanHandle, Transport};
use catprint_types::{Advertisement, DeviceIdentity};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::session::{DeviceLease, Endpoints, LeaseSet, Session, TransmitReport};

/// Everything that happened during one printing operation
#[derive(Debug)]
pub struct SessionOutcome {
    /// Primary result
    pub result: Result<TransmitReport>,

    /// Secondary disconnect failure, reported separately
    pub disconnect: Option<Error>,

    /// Device that was used, if one was found
    pub device: Option<DeviceIdentity>,

    /// Final session state
    pub state: SessionState,
}

impl SessionOutcome {
    fn failed(error: Error, status: &SessionStatus) -> Self {
        status.fail();
        Self {
            result: Err(error),
            disconnect: None,
            device: None,
            state: status.state(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Primary result only; a disconnect failure is logged and dropped
    pub fn into_result(self) -> Result<TransmitReport> {
        if let Some(e) = &self.disconnect {
            warn!(error = %e, "Ignoring disconnect failure");
        }
        self.result
    }
}

/// Running scan; stopped on every exit path
struct ActiveScan<T: Transport + ?Sized + 'static> {
    transport: Arc<T>,
    handle: Option<ScanHandle>,
    lock: Option<OwnedMutexGuard<()>>,
}

impl<T: Transport + ?Sized + 'static> ActiveScan<T> {
    async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            match self.transport.stop_scan(handle).await {
                Ok(()) => debug!(%handle, "Scan stopped"),
                Err(e) => warn!(%handle, error = %e, "Failed to stop scan"),
            }
        }
        self.lock.take();
    }
}

impl<T: Transport + ?Sized + 'static> Drop for ActiveScan<T> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        let transport = Arc::clone(&self.transport);
        let lock = self.lock.take();

        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = transport.stop_scan(handle).await {
                        warn!(%handle, error = %e, "Failed to stop abandoned scan");
                    }
                    drop(lock);
                });
            }
            Err(_) => warn!(%handle, "No runtime to stop abandoned scan on"),
        }
    }
}

/// Opens printing sessions over a shared transport
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use catprint::{MemoryTransport, SessionManager, VirtualPeripheral};
///
/// #[tokio::main]
/// async fn main() -> catprint::Result<()> {
///     let transport = MemoryTransport::new()
///         .with_peripheral(VirtualPeripheral::printer("AA:BB:CC:DD:EE:01", "GB02"));
///     let manager = SessionManager::new(Arc::new(transport));
///
///     let report = manager.feed(100).await.into_result()?;
///     println!("{} frames written", report.frames_written);
///     Ok(())
/// }
/// ```
pub struct SessionManager<T: Transport + ?Sized + 'static> {
    transport: Arc<T>,
    config: SessionConfig,
    scan_lock: Arc<tokio::sync::Mutex<()>>,
    leases: LeaseSet,
}

impl<T: Transport + ?Sized + 'static> Clone for SessionManager<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
            scan_lock: Arc::clone(&self.scan_lock),
            leases: Arc::clone(&self.leases),
        }
    }
}

impl<T: Transport + ?Sized + 'static> SessionManager<T> {
    /// Create a manager with the default configuration
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            config: SessionConfig::default(),
            scan_lock: Arc::new(tokio::sync::Mutex::new(())),
            leases: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Replace the configuration
    ///
    /// Clones made before this call keep their own configuration but still
    /// share the scan lock and device reservations.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Find the first advertised device that matches the allow-list
    ///
    /// Moves `status` from Idle to Scanning, or to Failed on error.
    ///
    /// # Errors
    ///
    /// - [`Error::Types`] if the allow-list is empty
    /// - [`Error::DiscoveryTimeout`] if nothing matched in time
    /// - [`Error::ScanEnded`] if the transport ended the scan first
    pub async fn discover(&self, status: &SessionStatus) -> Result<DeviceIdentity> {
        let result = self.discover_inner(status).await;
        if result.is_err() {
            status.fail();
        }
        result
    }

    async fn discover_inner(&self, status: &SessionStatus) -> Result<DeviceIdentity> {
        self.config.filter.validate()?;
        let deadline = Instant::now() + self.config.scan_timeout;
        self.transport.enable().await?;
        status.transition(SessionState::Scanning)?;

        let (scan, mut events) = self.start_scan(deadline).await?;
        let filter = &self.config.filter;

        let found = timeout_at(deadline, async {
            while let Some(ad) = events.recv().await {
                trace!(address = %ad.address, name = ?ad.name, "Advertisement");
                if filter.matches(&ad) {
                    return Some(ad);
                }
            }
            None
        })
        .await;

        scan.stop().await;

        match found {
            Ok(Some(ad)) => {
                let identity = DeviceIdentity::from(ad);
                info!(device = %identity, "Found printer");
                Ok(identity)
            }
            Ok(None) => {
                warn!("Scan ended without a matching printer");
                Err(Error::ScanEnded)
            }
            Err(_) => {
                warn!(timeout = ?self.config.scan_timeout, "No matching printer found");
                Err(self.discovery_timeout())
            }
        }
    }

    fn discovery_timeout(&self) -> Error {
        Error::DiscoveryTimeout {
            timeout: self.config.scan_timeout,
        }
    }

    /// Take the scan lock and start a scan, both within `deadline`
    async fn start_scan(
        &self,
        deadline: Instant,
    ) -> Result<(ActiveScan<T>, mpsc::Receiver<Advertisement>)> {
        let lock = match timeout_at(deadline, Arc::clone(&self.scan_lock).lock_owned()).await {
            Ok(lock) => lock,
            Err(_) => {
                warn!("Timed out waiting for another scan to finish");
                return Err(self.discovery_timeout());
            }
        };

        // Backends filter services in the radio, which would hide name-only matches
        let services = if self.config.filter.names.is_empty() {
            self.config.filter.services.clone()
        } else {
            Vec::new()
        };
        let filter = ScanFilter { services };

        let scan = self.transport.scan(&filter).await?;
        debug!(handle = %scan.handle, "Scan started");

        let active = ActiveScan {
            transport: Arc::clone(&self.transport),
            handle: Some(scan.handle),
            lock: Some(lock),
        };
        Ok((active, scan.events))
    }

    /// Discover, connect and resolve endpoints
    pub async fn open(&self) -> Result<Session<T>> {
        self.open_with(SessionStatus::new()).await
    }

    /// Like [`SessionManager::open`], reporting progress through `status`
    pub async fn open_with(&self, status: SessionStatus) -> Result<Session<T>> {
        let identity = self.discover(&status).await?;

        match self.establish(identity, &status).await {
            Ok(session) => Ok(session),
            Err(e) => {
                status.fail();
                Err(e)
            }
        }
    }

    async fn establish(&self, identity: DeviceIdentity, status: &SessionStatus) -> Result<Session<T>> {
        let lease = DeviceLease::acquire(&self.leases, &identity.address)?;
        status.transition(SessionState::Connecting)?;

        let device = self.connect(&identity).await?;

        let endpoints = match self.resolve_endpoints(&device).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!(device = %identity, error = %e, "Endpoint resolution failed");
                status.transition(SessionState::Closing)?;
                if let Err(de) = self.transport.disconnect(&device).await {
                    warn!(device = %identity, error = %de, "Disconnect after failed resolution failed");
                }
                return Err(e);
            }
        };

        status.transition(SessionState::Ready)?;
        info!(device = %identity, "Session ready");

        Ok(Session::new(
            Arc::clone(&self.transport),
            identity,
            device,
            endpoints,
            status.clone(),
            &self.config,
            lease,
        ))
    }

    async fn connect(&self, identity: &DeviceIdentity) -> Result<DeviceHandle> {
        let attempts = self.config.connect_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(device = %identity, attempt, attempts, "Connecting");

            match self.transport.connect(&identity.address).await {
                Ok(device) => {
                    info!(device = %identity, "Connected");
                    return Ok(device);
                }
                Err(source) if attempt >= attempts => {
                    return Err(Error::ConnectFailed {
                        address: identity.address.clone(),
                        source,
                    });
                }
                Err(e) => {
                    warn!(device = %identity, attempt, error = %e, "Connection attempt failed");
                    attempt += 1;
                }
            }
        }
    }

    async fn resolve_endpoints(&self, device: &DeviceHandle) -> Result<Endpoints> {
        let service_id = self.config.service;
        let command_id = self.config.command;

        let service = self
            .transport
            .discover_services(device, &[service_id])
            .await
            .map_err(|e| Error::EndpointNotFound {
                endpoint: service_id,
                source: Some(e),
            })?
            .into_iter()
            .find(|s| s.uuid == service_id)
            .ok_or(Error::EndpointNotFound {
                endpoint: service_id,
                source: None,
            })?;

        let wanted: Vec<_> = std::iter::once(command_id).chain(self.config.notify).collect();
        let characteristics = self
            .transport
            .discover_characteristics(&service, &wanted)
            .await
            .map_err(|e| Error::EndpointNotFound {
                endpoint: command_id,
                source: Some(e),
            })?;

        let command = characteristics
            .iter()
            .find(|c| c.uuid == command_id)
            .cloned()
            .ok_or(Error::EndpointNotFound {
                endpoint: command_id,
                source: None,
            })?;

        let notify = self
            .config
            .notify
            .and_then(|id| characteristics.iter().find(|c| c.uuid == id).cloned());
        if notify.is_none() && self.config.notify.is_some() {
            debug!("Notify characteristic not present");
        }

        Ok(Endpoints {
            service,
            command,
            notify,
        })
    }

    /// Run one complete printing operation
    ///
    /// Commands are encoded before any radio activity.
    pub async fn print(&self, commands: &[LogicalCommand]) -> SessionOutcome {
        let status = SessionStatus::new();

        match encode_all(commands) {
            Ok(frames) => self.deliver_with(&frames, status).await,
            Err(e) => SessionOutcome::failed(e.into(), &status),
        }
    }

    /// Advance blank paper by `lines`
    pub async fn feed(&self, lines: u32) -> SessionOutcome {
        self.print(&blank_feed(lines)).await
    }

    /// Deliver already encoded frames in one session
    pub async fn deliver(&self, frames: &[Frame]) -> SessionOutcome {
        self.deliver_with(frames, SessionStatus::new()).await
    }

    async fn deliver_with(&self, frames: &[Frame], status: SessionStatus) -> SessionOutcome {
        let mut session = match self.open_with(status.clone()).await {
            Ok(session) => session,
            Err(e) => return SessionOutcome::failed(e, &status),
        };

        let device = session.identity().clone();
        let result = session.transmit(frames).await;
        let disconnect = session.close().await.err();

        SessionOutcome {
            result,
            disconnect,
            device: Some(device),
            state: status.state(),
        }
    }

    /// Scan for the configured timeout and list every matching device
    pub async fn survey(&self) -> Result<Vec<DeviceIdentity>> {
        self.config.filter.validate()?;
        let deadline = Instant::now() + self.config.scan_timeout;
        self.transport.enable().await?;

        let (scan, mut events) = self.start_scan(deadline).await?;
        let filter = &self.config.filter;
        let mut found: Vec<DeviceIdentity> = Vec::new();

        let _ = timeout_at(deadline, async {
            while let Some(ad) = events.recv().await {
                if filter.matches(&ad) && !found.iter().any(|d| d.address == ad.address) {
                    let identity = DeviceIdentity::from(ad);
                    info!(device = %identity, "Found printer");
                    found.push(identity);
                }
            }
        })
        .await;

        scan.stop().await;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use catprint_core::feed_lines;
    use catprint_transport::{
        Error as TransportError, MemoryTransport, TransportCall, VirtualPeripheral,
    };
    use catprint_types::{DeviceAddress, DeviceFilter};
    use pretty_assertions::assert_eq;
    use SessionState::*;

    fn manager(transport: MemoryTransport) -> (Arc<MemoryTransport>, SessionManager<MemoryTransport>) {
        let transport = Arc::new(transport);
        (Arc::clone(&transport), SessionManager::new(transport))
    }

    fn disconnects(transport: &MemoryTransport) -> usize {
        transport.count_calls(|c| matches!(c, TransportCall::Disconnect(_)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_allowed_device_wins() {
        let (transport, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
                .with_peripheral(
                    VirtualPeripheral::printer("02", "GB02")
                        .advertising_after(Duration::from_secs(1)),
                ),
        );
        let manager = manager.with_config(
            SessionConfig::default().with_filter(DeviceFilter::by_names(["GB02"])),
        );

        let session = manager.open().await.unwrap();

        assert_eq!(session.identity().address, DeviceAddress::new("02"));
        assert_eq!(session.state(), Ready);
        assert!(!transport.is_scanning());
        assert_eq!(
            transport.count_calls(|c| matches!(c, TransportCall::Connect(_))),
            1
        );

        session.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_timeout_stops_scan() {
        let (transport, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
                .with_peripheral(
                    VirtualPeripheral::printer("02", "GB02")
                        .advertising_after(Duration::from_secs(10)),
                ),
        );
        let manager = manager.with_config(
            SessionConfig::default()
                .with_filter(DeviceFilter::by_names(["GB02"]))
                .with_scan_timeout(Duration::from_secs(5)),
        );
        let status = SessionStatus::new();

        let err = manager.open_with(status.clone()).await.unwrap_err();

        assert!(matches!(err, Error::DiscoveryTimeout { timeout } if timeout == Duration::from_secs(5)));
        assert_eq!(status.history(), vec![Idle, Scanning, Failed]);
        assert!(!transport.is_scanning());
        assert_eq!(
            transport.count_calls(|c| matches!(c, TransportCall::StopScan(_))),
            1
        );
        assert_eq!(
            transport.count_calls(|c| matches!(c, TransportCall::Connect(_))),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_ended() {
        let (_, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "XX99"))
                .ending_scan(),
        );

        assert!(matches!(manager.open().await, Err(Error::ScanEnded)));
    }

    #[tokio::test]
    async fn test_empty_allow_list_rejected_before_scan() {
        let (transport, manager) = manager(MemoryTransport::new());
        let manager = manager.with_config(SessionConfig::default().with_filter(DeviceFilter::default()));
        let status = SessionStatus::new();

        let err = manager.open_with(status.clone()).await.unwrap_err();

        assert!(matches!(err, Error::Types(_)));
        assert!(transport.calls().is_empty());
        assert_eq!(status.state(), Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_allow_list() {
        let service = catprint_core::uuid_from_u16(catprint_core::constants::gatt::ALT_ADVERTISED_SERVICE);
        let (_, manager) = manager(
            MemoryTransport::new().with_peripheral(
                VirtualPeripheral::printer("01", "MX06").advertising_service(service),
            ),
        );
        let manager =
            manager.with_config(SessionConfig::default().with_filter(DeviceFilter::by_services([service])));

        let session = manager.open().await.unwrap();
        assert_eq!(session.identity().name.as_deref(), Some("MX06"));
        session.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_transmit_disconnects_once() {
        let (transport, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
                .failing_write_at(1),
        );

        let outcome = manager.deliver(&feed_lines(600)).await;

        let err = outcome.result.unwrap_err();
        assert!(matches!(err, Error::TransmitFailed { frames_sent: 1, .. }));
        assert!(outcome.disconnect.is_none());
        assert_eq!(outcome.state, Failed);
        assert_eq!(disconnects(&transport), 1);
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_success() {
        let (transport, manager) =
            manager(MemoryTransport::new().with_peripheral(VirtualPeripheral::printer("01", "GB03")));

        let outcome = manager.feed(300).await;

        assert_eq!(outcome.state, Closed);
        assert_eq!(outcome.device.as_ref().map(|d| d.address.clone()), Some(DeviceAddress::new("01")));
        let report = outcome.into_result().unwrap();
        assert_eq!(report.frames_written, 3);

        let payloads: Vec<Vec<u8>> = transport.writes().iter().map(|b| b.to_vec()).collect();
        assert_eq!(
            payloads,
            vec![
                vec![0x51, 0x78, 0xBD, 0x00, 0x01, 0x00, 0x19, 0x4F, 0xFF],
                vec![0x51, 0x78, 0xA1, 0x00, 0x01, 0x00, 0xFF, 0xF3, 0xFF],
                vec![0x51, 0x78, 0xA1, 0x00, 0x01, 0x00, 0x2D, 0xC3, 0xFF],
            ]
        );
        assert_eq!(disconnects(&transport), 1);
    }

    #[tokio::test]
    async fn test_encoding_error_never_scans() {
        let (transport, manager) =
            manager(MemoryTransport::new().with_peripheral(VirtualPeripheral::printer("01", "GB01")));

        let outcome = manager
            .print(&[LogicalCommand::PrintLine(vec![0u8; 300].into())])
            .await;

        assert!(matches!(outcome.result, Err(Error::Core(_))));
        assert_eq!(outcome.state, Failed);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_no_disconnect() {
        let (transport, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
                .failing_connect("01", 1),
        );
        let status = SessionStatus::new();

        let err = manager.open_with(status.clone()).await.unwrap_err();

        assert!(matches!(err, Error::ConnectFailed { .. }));
        assert_eq!(status.history(), vec![Idle, Scanning, Connecting, Failed]);
        assert_eq!(disconnects(&transport), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retry() {
        let (transport, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
                .failing_connect("01", 2),
        );
        let manager = manager.with_config(SessionConfig::default().with_connect_attempts(3));

        let session = manager.open().await.unwrap();

        assert_eq!(
            transport.count_calls(|c| matches!(c, TransportCall::Connect(_))),
            3
        );
        session.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_endpoint_disconnects() {
        let (transport, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "GB01").without_services()),
        );
        let status = SessionStatus::new();

        let err = manager.open_with(status.clone()).await.unwrap_err();

        assert!(matches!(err, Error::EndpointNotFound { source: None, .. }));
        assert_eq!(
            status.history(),
            vec![Idle, Scanning, Connecting, Closing, Failed]
        );
        assert_eq!(disconnects(&transport), 1);
        assert!(!transport.is_connected(&DeviceAddress::new("01")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_busy() {
        let (_, manager) =
            manager(MemoryTransport::new().with_peripheral(VirtualPeripheral::printer("01", "GB01")));

        let first = manager.open().await.unwrap();
        let err = manager.open().await.unwrap_err();
        assert!(matches!(err, Error::DeviceBusy(ref a) if a.as_str() == "01"));

        first.close().await.unwrap();
        let again = manager.open().await.unwrap();
        again.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_failure_does_not_replace_result() {
        let (_, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
                .failing_disconnect(TransportError::DisconnectFailed("link lost".into())),
        );

        let outcome = manager.feed(10).await;

        assert!(outcome.is_success());
        assert!(matches!(outcome.disconnect, Some(Error::DisconnectFailed(_))));
        assert_eq!(outcome.state, Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_discovery_stops_scan() {
        let (transport, manager) = manager(
            MemoryTransport::new().with_peripheral(VirtualPeripheral::printer("01", "GB01").hidden()),
        );

        let status = SessionStatus::new();
        let discovery = manager.discover(&status);
        let _ = tokio::time::timeout(Duration::from_secs(1), discovery).await;

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(!transport.is_scanning());
        assert_eq!(
            transport.count_calls(|c| matches!(c, TransportCall::StopScan(_))),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_survey_lists_distinct_matches() {
        let (transport, manager) = manager(
            MemoryTransport::new()
                .with_peripheral(VirtualPeripheral::printer("01", "GB01"))
                .with_peripheral(
                    VirtualPeripheral::printer("02", "GB02").advertising_after(Duration::from_secs(3)),
                )
                .with_peripheral(VirtualPeripheral::printer("03", "Speaker"))
                .with_peripheral(
                    VirtualPeripheral::printer("04", "GT01").advertising_after(Duration::from_secs(30)),
                ),
        );

        let found = manager.survey().await.unwrap();
        let names: Vec<_> = found.iter().filter_map(|d| d.name.clone()).collect();

        assert_eq!(names, vec!["GB01", "GB02"]);
        assert!(!transport.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_discovery_bounded_by_timeout() {
        let (transport, manager) = manager(
            MemoryTransport::new().with_peripheral(VirtualPeripheral::printer("01", "GB01").hidden()),
        );
        let long = manager
            .clone()
            .with_config(SessionConfig::default().with_scan_timeout(Duration::from_secs(10)));
        let short =
            manager.with_config(SessionConfig::default().with_scan_timeout(Duration::from_secs(5)));

        let running = tokio::spawn(async move {
            let status = SessionStatus::new();
            long.discover(&status).await
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(transport.is_scanning());

        let start = tokio::time::Instant::now();
        let err = short.discover(&SessionStatus::new()).await.unwrap_err();

        assert!(matches!(err, Error::DiscoveryTimeout { .. }));
        assert!(start.elapsed() <= Duration::from_secs(5));
        // Still queued behind the first scan when its deadline passed
        assert_eq!(
            transport.count_calls(|c| matches!(c, TransportCall::Scan(_))),
            1
        );

        assert!(matches!(
            running.await.unwrap(),
            Err(Error::DiscoveryTimeout { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_name_match_with_service_in_allow_list() {
        let service =
            catprint_core::uuid_from_u16(catprint_core::constants::gatt::ALT_ADVERTISED_SERVICE);
        let (_, manager) = manager(
            MemoryTransport::new().with_peripheral(VirtualPeripheral::printer("01", "GB02")),
        );
        let manager = manager.with_config(
            SessionConfig::default()
                .with_filter(DeviceFilter::by_names(["GB02"]).with_service(service))
                .with_scan_timeout(Duration::from_secs(5)),
        );

        let session = manager.open().await.unwrap();

        assert_eq!(session.identity().name.as_deref(), Some("GB02"));
        session.close().await.unwrap();
    }
}

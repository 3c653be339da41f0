//! Connected printing session

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use catprint_core::{encode_all, Frame, LogicalCommand, SessionState, SessionStatus};
use catprint_transport::{
    CharacteristicHandle, DeviceHandle, Error as TransportError, ServiceHandle, Transport,
};
use catprint_types::{DeviceAddress, DeviceIdentity};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};

/// Devices that currently have a session
pub(crate) type LeaseSet = Arc<Mutex<HashSet<DeviceAddress>>>;

/// Reservation of one device; released on drop
#[derive(Debug)]
pub(crate) struct DeviceLease {
    address: DeviceAddress,
    leases: LeaseSet,
}

impl DeviceLease {
    pub(crate) fn acquire(leases: &LeaseSet, address: &DeviceAddress) -> Result<Self> {
        if !leases.lock().insert(address.clone()) {
            return Err(Error::DeviceBusy(address.clone()));
        }
        Ok(Self {
            address: address.clone(),
            leases: Arc::clone(leases),
        })
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.leases.lock().remove(&self.address);
    }
}

/// Endpoints resolved once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub service: ServiceHandle,
    pub command: CharacteristicHandle,
    pub notify: Option<CharacteristicHandle>,
}

/// Result of a successful batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransmitReport {
    pub frames_written: usize,
    pub bytes_written: usize,
}

/// A connected, ready printer
///
/// Owned by one caller. Call [`Session::close`] when done; a session that is
/// dropped instead disconnects in the background.
pub struct Session<T: Transport + ?Sized + 'static> {
    transport: Arc<T>,
    identity: DeviceIdentity,
    device: Option<DeviceHandle>,
    endpoints: Endpoints,
    status: SessionStatus,
    write_delay: Duration,
    max_write_len: usize,
    failed: bool,
    lease: Option<DeviceLease>,
}

impl<T: Transport + ?Sized + 'static> Session<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        identity: DeviceIdentity,
        device: DeviceHandle,
        endpoints: Endpoints,
        status: SessionStatus,
        config: &SessionConfig,
        lease: DeviceLease,
    ) -> Self {
        Self {
            transport,
            identity,
            device: Some(device),
            endpoints,
            status,
            write_delay: config.write_delay,
            max_write_len: config.max_write_len.max(1),
            failed: false,
            lease: Some(lease),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Shared view of the lifecycle state
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn state(&self) -> SessionState {
        self.status.state()
    }

    /// Write frames in order
    ///
    /// # Errors
    ///
    /// - [`Error::TransmitFailed`] when a write fails; the batch is aborted
    ///   and the session can only be closed afterwards
    /// - [`Error::Core`] when the session is not ready
    pub async fn transmit(&mut self, frames: &[Frame]) -> Result<TransmitReport> {
        self.status.transition(SessionState::Transmitting)?;
        debug!(device = %self.identity, frames = frames.len(), "Transmitting");

        let mut report = TransmitReport::default();

        for (index, frame) in frames.iter().enumerate() {
            trace!(index, %frame, "Writing frame");

            if let Err(source) = self.write_frame(index > 0, frame).await {
                warn!(
                    device = %self.identity,
                    frames_sent = index,
                    error = %source,
                    "Write failed, aborting batch"
                );
                self.failed = true;
                self.status.transition(SessionState::Closing)?;
                return Err(Error::TransmitFailed {
                    frames_sent: index,
                    source,
                });
            }

            report.frames_written += 1;
            report.bytes_written += frame.len();
        }

        self.status.transition(SessionState::Ready)?;
        debug!(
            frames = report.frames_written,
            bytes = report.bytes_written,
            "Batch complete"
        );

        Ok(report)
    }

    /// Write one frame in pieces of at most `max_write_len` bytes
    async fn write_frame(
        &self,
        mut delay_first: bool,
        frame: &Frame,
    ) -> std::result::Result<(), TransportError> {
        for chunk in frame.as_bytes().chunks(self.max_write_len) {
            if delay_first && !self.write_delay.is_zero() {
                tokio::time::sleep(self.write_delay).await;
            }
            delay_first = true;

            let written = self
                .transport
                .write_without_response(&self.endpoints.command, chunk)
                .await?;
            if written != chunk.len() {
                return Err(TransportError::WriteFailed(format!(
                    "short write: {} of {} bytes",
                    written,
                    chunk.len()
                )));
            }
        }
        Ok(())
    }

    /// Encode commands and transmit them as one batch
    ///
    /// Encoding finishes before the first write, so an encoding error leaves
    /// the session untouched.
    pub async fn send(&mut self, commands: &[LogicalCommand]) -> Result<TransmitReport> {
        let frames = encode_all(commands)?;
        self.transmit(&frames).await
    }

    /// Disconnect and end the session
    ///
    /// Ends in `Failed` if a transmit failed, `Closed` otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::DisconnectFailed`] if the transport could not disconnect.
    pub async fn close(mut self) -> Result<()> {
        let Some(device) = self.device.take() else {
            return Ok(());
        };

        enter_closing(&self.status);
        info!(device = %self.identity, "Disconnecting");

        let result = self.transport.disconnect(&device).await;
        finish(&self.status, self.failed);
        self.lease.take();

        match result {
            Ok(()) => {
                info!(device = %self.identity, "Disconnected");
                Ok(())
            }
            Err(e) => {
                warn!(device = %self.identity, error = %e, "Disconnect failed");
                Err(Error::DisconnectFailed(e))
            }
        }
    }
}

fn enter_closing(status: &SessionStatus) {
    if status.state() == SessionState::Closing {
        return;
    }
    if let Err(e) = status.transition(SessionState::Closing) {
        warn!(error = %e, "Unexpected state while closing");
    }
}

fn finish(status: &SessionStatus, failed: bool) {
    if failed {
        status.fail();
    } else if let Err(e) = status.transition(SessionState::Closed) {
        warn!(error = %e, "Unexpected state while closing");
        status.fail();
    }
}

impl<T: Transport + ?Sized + 'static> Drop for Session<T> {
    fn drop(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };

        warn!(device = %self.identity, "Session dropped without close, disconnecting");
        enter_closing(&self.status);

        let transport = Arc::clone(&self.transport);
        let status = self.status.clone();
        let failed = self.failed;
        let lease = self.lease.take();

        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = transport.disconnect(&device).await {
                        warn!(device = %device.address, error = %e, "Background disconnect failed");
                    }
                    finish(&status, failed);
                    drop(lease);
                });
            }
            Err(_) => {
                warn!(device = %device.address, "No runtime to disconnect on, connection left open");
                status.fail();
            }
        }
    }
}

impl<T: Transport + ?Sized + 'static> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("state", &self.status.state())
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

//! Session configuration

use std::time::Duration;

use catprint_core::constants::{gatt, DEFAULT_SCAN_TIMEOUT, MAX_WRITE_LEN, PRINTER_NAMES};
use catprint_core::uuid_from_u16;
use catprint_types::DeviceFilter;
use uuid::Uuid;

/// Settings shared by every session a manager opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long discovery waits for a matching advertisement
    pub scan_timeout: Duration,

    /// Devices that may be connected to
    pub filter: DeviceFilter,

    /// Printer service
    pub service: Uuid,

    /// Characteristic frames are written to
    pub command: Uuid,

    /// Characteristic the printer notifies on, resolved if present
    pub notify: Option<Uuid>,

    /// Connection attempts before giving up (at least one)
    pub connect_attempts: u32,

    /// Pause between consecutive writes
    pub write_delay: Duration,

    /// Largest single write; frames are split into writes of this size
    pub max_write_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(DEFAULT_SCAN_TIMEOUT),
            filter: DeviceFilter::by_names(PRINTER_NAMES),
            service: uuid_from_u16(gatt::PRINTER_SERVICE),
            command: uuid_from_u16(gatt::COMMAND_CHARACTERISTIC),
            notify: Some(uuid_from_u16(gatt::NOTIFY_CHARACTERISTIC)),
            connect_attempts: 1,
            write_delay: Duration::ZERO,
            max_write_len: MAX_WRITE_LEN,
        }
    }
}

impl SessionConfig {
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_service(mut self, service: Uuid) -> Self {
        self.service = service;
        self
    }

    pub fn with_command(mut self, command: Uuid) -> Self {
        self.command = command;
        self
    }

    pub fn with_notify(mut self, notify: Option<Uuid>) -> Self {
        self.notify = notify;
        self
    }

    /// Set connection attempts (values below one are raised to one)
    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts.max(1);
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Set the write size (values below one are raised to one)
    pub fn with_max_write_len(mut self, len: usize) -> Self {
        self.max_write_len = len.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catprint_core::build_uuid;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();

        assert_eq!(config.scan_timeout, Duration::from_secs(15));
        assert_eq!(config.filter.names, vec!["GT01", "GB01", "GB02", "GB03"]);
        assert_eq!(config.service, build_uuid("ae30").unwrap());
        assert_eq!(config.command, build_uuid("ae01").unwrap());
        assert_eq!(config.notify, Some(build_uuid("ae02").unwrap()));
        assert_eq!(config.connect_attempts, 1);
        assert!(config.write_delay.is_zero());
        assert_eq!(config.max_write_len, 60);
    }

    #[test]
    fn test_connect_attempts_floor() {
        assert_eq!(
            SessionConfig::default()
                .with_connect_attempts(0)
                .connect_attempts,
            1
        );
        assert_eq!(SessionConfig::default().with_max_write_len(0).max_write_len, 1);
    }
}

//! Device discovery structures

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;

/// Opaque transport address of a peripheral
///
/// Backends pick the string form (`AA:BB:CC:DD:EE:FF` on Linux, a platform
/// identifier elsewhere). Only equality matters to the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::Parse("device address is empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for DeviceAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeviceAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observed advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Transport address
    pub address: DeviceAddress,

    /// Advertised local name
    pub name: Option<String>,

    /// Signal strength (dBm)
    pub rssi: Option<i16>,

    /// Advertised service identifiers
    pub services: Vec<Uuid>,

    /// When the advertisement was observed
    pub observed_at: DateTime<Utc>,
}

impl Advertisement {
    pub fn new(address: impl Into<DeviceAddress>) -> Self {
        Self {
            address: address.into(),
            name: None,
            rssi: None,
            services: Vec::new(),
            observed_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    pub fn with_service(mut self, service: Uuid) -> Self {
        self.services.push(service);
        self
    }
}

/// Identity of a discovered device
///
/// Produced from the advertisement that matched the allow-list; immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Transport address
    pub address: DeviceAddress,

    /// Advertised name
    pub name: Option<String>,

    /// Signal strength at discovery time
    pub rssi: Option<i16>,
}

impl From<Advertisement> for DeviceIdentity {
    fn from(ad: Advertisement) -> Self {
        Self {
            address: ad.address,
            name: ad.name,
            rssi: ad.rssi,
        }
    }
}

impl From<&Advertisement> for DeviceIdentity {
    fn from(ad: &Advertisement) -> Self {
        Self {
            address: ad.address.clone(),
            name: ad.name.clone(),
            rssi: ad.rssi,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.address
        )?;
        if let Some(rssi) = self.rssi {
            write!(f, " {} dBm", rssi)?;
        }
        Ok(())
    }
}

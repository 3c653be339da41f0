//! Discovery allow-list

use uuid::Uuid;

use crate::device::Advertisement;
use crate::error::{Error, Result};

/// Allow-list of acceptable devices
///
/// An advertisement matches when its name equals one of `names` exactly, or
/// when it advertises any service in `services`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub names: Vec<String>,
    pub services: Vec<Uuid>,
}

impl DeviceFilter {
    /// Match by exact advertised name
    pub fn by_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            services: Vec::new(),
        }
    }

    /// Match by advertised service
    pub fn by_services(services: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            names: Vec::new(),
            services: services.into_iter().collect(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn with_service(mut self, service: Uuid) -> Self {
        self.services.push(service);
        self
    }

    /// Check that the allow-list can match anything at all
    pub fn validate(&self) -> Result<()> {
        if self.names.is_empty() && self.services.is_empty() {
            return Err(Error::Validation(
                "allow-list needs at least one device name or service".into(),
            ));
        }
        Ok(())
    }

    /// Check an advertisement against the allow-list
    pub fn matches(&self, ad: &Advertisement) -> bool {
        let name_match = ad
            .name
            .as_deref()
            .is_some_and(|name| self.names.iter().any(|n| n == name));

        name_match || ad.services.iter().any(|s| self.services.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRINTER_SERVICE: Uuid = Uuid::from_u128(0x0000ae30_0000_1000_8000_00805f9b34fb);

    #[test]
    fn test_name_match_is_exact() {
        let filter = DeviceFilter::by_names(["GB02"]);

        assert!(filter.matches(&Advertisement::new("a").with_name("GB02")));
        assert!(!filter.matches(&Advertisement::new("b").with_name("GB01")));
        assert!(!filter.matches(&Advertisement::new("c").with_name("gb02")));
        assert!(!filter.matches(&Advertisement::new("d").with_name("GB02 ")));
        assert!(!filter.matches(&Advertisement::new("e")));
    }

    #[test]
    fn test_service_match() {
        let filter = DeviceFilter::by_services([PRINTER_SERVICE]);

        assert!(filter.matches(&Advertisement::new("a").with_service(PRINTER_SERVICE)));
        assert!(!filter.matches(&Advertisement::new("b").with_name("GB02")));
    }

    #[test]
    fn test_name_or_service() {
        let filter = DeviceFilter::by_names(["GT01"]).with_service(PRINTER_SERVICE);

        assert!(filter.matches(&Advertisement::new("a").with_name("GT01")));
        assert!(filter.matches(&Advertisement::new("b").with_name("X").with_service(PRINTER_SERVICE)));
    }

    #[test]
    fn test_empty_filter_is_invalid() {
        assert!(DeviceFilter::default().validate().is_err());
        assert!(DeviceFilter::by_names(["GB01"]).validate().is_ok());
    }
}

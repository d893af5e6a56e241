use std::fmt;
use std::str::FromStr;

use volant_core::Error;

/// A PCI address in `DDDD:BB:DD.F` form (domain:bus:device.function).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PciAddress {
    pub domain: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl FromStr for PciAddress {
    type Err = Error;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let (domain_bus_dev, function) = raw
            .split_once('.')
            .ok_or_else(|| Error::validation(format!("invalid PCI address: {raw}")))?;
        let parts: Vec<&str> = domain_bus_dev.split(':').collect();
        if parts.len() != 3 {
            return Err(Error::validation(format!("invalid PCI address: {raw}")));
        }
        let domain = u16::from_str_radix(parts[0], 16)
            .map_err(|_| Error::validation(format!("invalid PCI domain in: {raw}")))?;
        let bus = u8::from_str_radix(parts[1], 16)
            .map_err(|_| Error::validation(format!("invalid PCI bus in: {raw}")))?;
        let device = u8::from_str_radix(parts[2], 16)
            .map_err(|_| Error::validation(format!("invalid PCI device in: {raw}")))?;
        let function = u8::from_str_radix(function, 16)
            .map_err(|_| Error::validation(format!("invalid PCI function in: {raw}")))?;

        Ok(PciAddress {
            domain,
            bus,
            device,
            function,
        })
    }
}

/// True if `vendor:device` matches one of `allowlist`'s `vendor:device` or
/// `vendor:*` patterns (case-insensitive, no leading `0x`).
pub fn matches_allowlist(vendor: &str, device: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let vendor = vendor.trim_start_matches("0x").to_lowercase();
    let device = device.trim_start_matches("0x").to_lowercase();

    allowlist.iter().any(|pattern| {
        let pattern = pattern.to_lowercase();
        match pattern.split_once(':') {
            Some((v, "*")) => v == vendor,
            Some((v, d)) => v == vendor && d == device,
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_address() {
        let addr: PciAddress = "0000:01:00.0".parse().unwrap();
        assert_eq!(addr.domain, 0);
        assert_eq!(addr.bus, 1);
        assert_eq!(addr.device, 0);
        assert_eq!(addr.function, 0);
        assert_eq!(addr.to_string(), "0000:01:00.0");
    }

    #[test]
    fn rejects_malformed_address() {
        assert!("not-an-address".parse::<PciAddress>().is_err());
        assert!("0000:01:00".parse::<PciAddress>().is_err());
    }

    #[test]
    fn allowlist_wildcard_matches_vendor_only() {
        let allowlist = vec!["10de:*".to_string()];
        assert!(matches_allowlist("10de", "1eb8", &allowlist));
        assert!(!matches_allowlist("8086", "1eb8", &allowlist));
    }

    #[test]
    fn allowlist_exact_match() {
        let allowlist = vec!["10de:1eb8".to_string()];
        assert!(matches_allowlist("10de", "1eb8", &allowlist));
        assert!(!matches_allowlist("10de", "1eb9", &allowlist));
    }

    #[test]
    fn empty_allowlist_rejects_nothing() {
        assert!(matches_allowlist("10de", "1eb8", &[]));
    }
}

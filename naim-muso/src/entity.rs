//! Registry metadata shared by all entities of one speaker.

use serde::Serialize;

use crate::consts::{DOMAIN, MANUFACTURER};

/// How the host should group an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

/// Device-registry record for a speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, unique id)` pairs
    pub identifiers: Vec<(String, String)>,
    /// `("mac", address)` when the MAC is known
    pub connections: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
}

impl DeviceInfo {
    pub fn new(unique_id: &str, name: &str, mac: Option<&str>) -> Self {
        Self {
            identifiers: vec![(DOMAIN.to_string(), unique_id.to_string())],
            connections: mac
                .map(|mac| vec![("mac".to_string(), mac.to_ascii_lowercase())])
                .unwrap_or_default(),
            name: name.to_string(),
            manufacturer: MANUFACTURER.to_string(),
        }
    }
}

/// `naim_muso-<device>-<key>`
pub fn unique_id(device_id: &str, key: &str) -> String {
    format!("{}-{}-{}", DOMAIN, device_id, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info() {
        let info = DeviceInfo::new("uuid:abc", "Kitchen", Some("00:1A:2B:3C:4D:5E"));
        assert_eq!(info.identifiers, vec![("naim_muso".to_string(), "uuid:abc".to_string())]);
        assert_eq!(info.connections[0].1, "00:1a:2b:3c:4d:5e");
        assert_eq!(info.manufacturer, "Naim Audio");

        assert!(DeviceInfo::new("10.0.0.2", "Study", None).connections.is_empty());
    }

    #[test]
    fn test_unique_id() {
        assert_eq!(unique_id("uuid:abc", "Psu"), "naim_muso-uuid:abc-Psu");
    }
}

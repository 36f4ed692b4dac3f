//! Device description parsing and validation.
//!
//! This module handles parsing UPnP device description XML and deciding
//! whether a device is a Naim streamer.

use crate::error::{DiscoveryError, Result};
use crate::Device;
use serde::Deserialize;
use url::Url;

/// UPnP device description root element.
#[derive(Debug, Deserialize)]
pub struct Root {
    pub device: DeviceDescription,
}

/// Device description parsed from XML.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub manufacturer_url: Option<String>,
    pub model_description: Option<String>,
    pub model_name: String,
    pub model_number: Option<String>,
    pub model_url: Option<String>,
    pub serial_number: Option<String>,
    #[serde(rename = "UDN")]
    pub udn: String,
}

impl DeviceDescription {
    /// Parse device description from XML.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::ParseError` if the XML is malformed or missing required fields.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root: Root = quick_xml::de::from_str(xml)
            .map_err(|e| DiscoveryError::ParseError(format!("Failed to parse device XML: {}", e)))?;

        Ok(root.device)
    }

    /// Convert the description into the public [`Device`] type.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::ParseError` if `location` has no host.
    pub fn to_device(&self, location: &str) -> Result<Device> {
        let (host, port) = host_and_port(location)?;

        Ok(Device {
            id: self.udn.clone(),
            name: self.friendly_name.clone(),
            ip_address: host,
            port,
            location: location.to_string(),
            model_name: self.model_name.clone(),
            device_type: self.device_type.clone(),
            manufacturer: self.manufacturer.clone(),
            serial_number: self.serial_number.clone(),
        })
    }

    /// Check if this device is a Naim product.
    ///
    /// Other vendors' MediaRenderers answer the same search target, so the
    /// device type alone is not enough.
    pub fn is_naim_device(&self) -> bool {
        self.manufacturer.to_lowercase().contains("naim")
            || self.model_name.starts_with("Mu-so")
    }
}

/// Split a location URL into host and port.
///
/// The port defaults to the scheme's well-known port.
pub fn host_and_port(location: &str) -> Result<(String, u16)> {
    let url = Url::parse(location)
        .map_err(|e| DiscoveryError::ParseError(format!("Invalid location '{}': {}", location, e)))?;

    let host = url
        .host_str()
        .ok_or_else(|| DiscoveryError::ParseError(format!("Location '{}' has no host", location)))?
        .to_string();

    Ok((host, url.port_or_known_default().unwrap_or(80)))
}

/// Extract the host from a location URL, or `None` if the URL is malformed.
pub fn extract_host_from_url(url: &str) -> Option<String> {
    host_and_port(url).ok().map(|(host, _)| host)
}

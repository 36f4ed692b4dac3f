//! Naim Mu-so device discovery library
//!
//! This crate finds Naim streamers on the local network using SSDP (Simple
//! Service Discovery Protocol) and UPnP device descriptions, and tracks their
//! presence afterwards through SSDP `NOTIFY` announcements.
//!
//! # Quick Start
//!
//! ```no_run
//! use naim_discovery::get;
//!
//! // Discover all Naim devices on the network
//! let devices = get();
//! for device in devices {
//!     println!("Found {} at {}", device.name, device.ip_address);
//! }
//! ```
//!
//! # Iterator-based Discovery
//!
//! ```no_run
//! use naim_discovery::{get_iter, DeviceEvent};
//!
//! for event in get_iter() {
//!     match event {
//!         DeviceEvent::Found(device) => {
//!             println!("Found: {}", device.name);
//!         }
//!     }
//! }
//! ```
//!
//! # Presence tracking
//!
//! Once a device is known, [`PresenceListener`] routes `ssdp:alive`,
//! `ssdp:byebye` and `ssdp:update` notifications to whoever registered the
//! device's UDN. [`UpnpFactory`] resolves a description location into a
//! [`Device`] and is meant to be shared by every connection that needs it.

mod error;
mod ssdp;
pub mod device;
mod discovery;
mod factory;
mod listener;

pub use error::{DiscoveryError, Result};
pub use discovery::DiscoveryIterator;
pub use factory::{DeviceFactory, UpnpFactory};
pub use listener::PresenceListener;
pub use ssdp::{PresenceChange, SsdpNotification};

use std::time::Duration;

/// Search target used for Naim renderers.
pub const UPNP_ST: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";

/// Information about a discovered Naim device.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Unique device name (UDN), e.g. "uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01"
    pub id: String,
    /// Friendly name of the device
    pub name: String,
    /// Host part of the description location
    pub ip_address: String,
    /// Port of the description location
    pub port: u16,
    /// Full URL of the UPnP device description
    pub location: String,
    /// Model name (e.g. "Mu-so", "Mu-so Qb 2nd Gen")
    pub model_name: String,
    /// UPnP device type
    pub device_type: String,
    /// Manufacturer string from the description
    pub manufacturer: String,
    /// Serial number, when published
    pub serial_number: Option<String>,
}

/// Events emitted during device discovery.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A Naim device was found on the network
    Found(Device),
}

/// Discover all Naim devices on the local network with a default 3-second timeout.
///
/// For more control over the discovery process, use `get_iter()` instead.
pub fn get() -> Vec<Device> {
    get_with_timeout(Duration::from_secs(3))
}

/// Discover all Naim devices on the local network with a custom timeout.
///
/// The timeout controls how long to wait for SSDP responses and HTTP requests.
///
/// ```no_run
/// use naim_discovery::get_with_timeout;
/// use std::time::Duration;
///
/// let devices = get_with_timeout(Duration::from_secs(5));
/// println!("{} devices", devices.len());
/// ```
pub fn get_with_timeout(timeout: Duration) -> Vec<Device> {
    get_iter_with_timeout(timeout)
        .filter_map(|event| match event {
            DeviceEvent::Found(device) => Some(device),
        })
        .collect()
}

/// Get an iterator for discovering Naim devices with a default 3-second timeout.
pub fn get_iter() -> DiscoveryIterator {
    get_iter_with_timeout(Duration::from_secs(3))
}

/// Get an iterator for discovering Naim devices with a custom timeout.
///
/// If the UDP socket cannot be created the iterator is empty.
pub fn get_iter_with_timeout(timeout: Duration) -> DiscoveryIterator {
    DiscoveryIterator::new(timeout).unwrap_or_else(|e| {
        tracing::warn!("Discovery unavailable: {}", e);
        DiscoveryIterator::empty()
    })
}

//! Core discovery logic and iterator implementation.
//!
//! The iterator:
//! 1. Sends an SSDP M-SEARCH for MediaRenderer devices
//! 2. Receives and filters SSDP responses
//! 3. Fetches device descriptions via HTTP
//! 4. Keeps only Naim devices and yields them as events

use std::collections::HashSet;
use std::time::Duration;
use crate::device::DeviceDescription;
use crate::error::{DiscoveryError, Result};
use crate::ssdp::{SsdpClient, SsdpResponse};
use crate::{DeviceEvent, UPNP_ST};

/// Iterator that discovers Naim devices on the local network.
///
/// Handles deduplication, filtering of other vendors' renderers, and
/// socket cleanup when dropped early.
pub struct DiscoveryIterator {
    ssdp_client: Option<SsdpClient>,
    ssdp_buffer: Vec<SsdpResponse>,
    buffer_index: usize,
    seen_locations: HashSet<String>,
    http_client: reqwest::blocking::Client,
}

impl DiscoveryIterator {
    /// Create a new discovery iterator with the specified timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let ssdp_client = SsdpClient::new(timeout)?;
        let http_client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            ssdp_client: Some(ssdp_client),
            ssdp_buffer: Vec::new(),
            buffer_index: 0,
            seen_locations: HashSet::new(),
            http_client,
        })
    }

    /// Create an empty iterator that yields no results
    pub(crate) fn empty() -> Self {
        Self {
            ssdp_client: None,
            ssdp_buffer: Vec::new(),
            buffer_index: 0,
            seen_locations: HashSet::new(),
            http_client: reqwest::blocking::Client::new(),
        }
    }

    /// Cheap check on the SSDP reply before any HTTP request is made.
    ///
    /// Naim streamers advertise a `Naim` server token; replies without a
    /// server header are kept and checked against their description.
    fn is_likely_naim(response: &SsdpResponse) -> bool {
        match response.server {
            Some(ref server) => {
                let server = server.to_lowercase();
                server.contains("naim") || server.contains("linux")
            }
            None => true,
        }
    }

    /// Fetch and parse device description from a location URL
    fn fetch_device_description(&self, location: &str) -> Result<DeviceDescription> {
        let xml = self.http_client
            .get(location)
            .send()
            .and_then(|response| response.text())
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to fetch device description: {}", e)))?;

        DeviceDescription::from_xml(&xml)
    }

    /// Fill the buffer with SSDP responses
    fn fill_buffer(&mut self) {
        if let Some(client) = self.ssdp_client.take() {
            match client.search(UPNP_ST) {
                Ok(iter) => {
                    self.ssdp_buffer.extend(iter.filter_map(|result| result.ok()));
                }
                Err(e) => {
                    tracing::debug!("SSDP search failed: {}", e);
                }
            }
        }
    }
}

impl Iterator for DiscoveryIterator {
    type Item = DeviceEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ssdp_client.is_some() {
            self.fill_buffer();
        }

        while self.buffer_index < self.ssdp_buffer.len() {
            let ssdp_response = self.ssdp_buffer[self.buffer_index].clone();
            self.buffer_index += 1;

            if !self.seen_locations.insert(ssdp_response.location.clone()) {
                continue;
            }

            if !Self::is_likely_naim(&ssdp_response) {
                continue;
            }

            let device_desc = match self.fetch_device_description(&ssdp_response.location) {
                Ok(desc) => desc,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", ssdp_response.location, e);
                    continue;
                }
            };

            if !device_desc.is_naim_device() {
                continue;
            }

            match device_desc.to_device(&ssdp_response.location) {
                Ok(device) => return Some(DeviceEvent::Found(device)),
                Err(e) => tracing::debug!("Skipping {}: {}", ssdp_response.location, e),
            }
        }

        None
    }
}

//! Resolution of a description location into a [`Device`].
//!
//! A single factory is created per process and handed to every connection
//! manager that needs it, so they share one HTTP client.

use std::time::Duration;

use async_trait::async_trait;

use crate::device::DeviceDescription;
use crate::error::{DiscoveryError, Result};
use crate::Device;

/// Creates [`Device`] records from UPnP description locations.
#[async_trait]
pub trait DeviceFactory: Send + Sync {
    /// Fetch and validate the description published at `location`.
    async fn create_device(&self, location: &str) -> Result<Device>;
}

/// [`DeviceFactory`] backed by an async HTTP client.
#[derive(Debug, Clone)]
pub struct UpnpFactory {
    http_client: reqwest::Client,
}

impl UpnpFactory {
    /// Create a factory whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Create a factory around an existing client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl DeviceFactory for UpnpFactory {
    async fn create_device(&self, location: &str) -> Result<Device> {
        tracing::debug!("Fetching device description from {}", location);

        let response = self
            .http_client
            .get(location)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DiscoveryError::Timeout
                } else {
                    DiscoveryError::NetworkError(format!("Failed to fetch device description: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(DiscoveryError::HttpStatus(response.status().as_u16()));
        }

        let xml = response
            .text()
            .await
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to read response body: {}", e)))?;

        let description = DeviceDescription::from_xml(&xml)?;
        if !description.is_naim_device() {
            return Err(DiscoveryError::InvalidDevice(format!(
                "{} ({}) is not a Naim device",
                description.friendly_name, description.manufacturer
            )));
        }

        description.to_device(location)
    }
}

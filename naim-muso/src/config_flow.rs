//! Validation of user input before a config entry is created.

use std::sync::Arc;
use std::time::Duration;

use naim_api::{ApiError, Connector};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::ConfigEntry;

/// Reasons a host cannot be added. [`FlowError::key`] is the form error key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Failed to connect")]
    CannotConnect,

    #[error("Invalid authentication")]
    InvalidAuth,

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl FlowError {
    pub fn key(&self) -> &'static str {
        match self {
            FlowError::CannotConnect => "cannot_connect",
            FlowError::InvalidAuth => "invalid_auth",
            FlowError::Unknown(_) => "unknown",
        }
    }
}

impl From<ApiError> for FlowError {
    fn from(e: ApiError) -> Self {
        if e.is_transport() {
            FlowError::CannotConnect
        } else {
            FlowError::Unknown(e.to_string())
        }
    }
}

/// What a successful validation yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowInfo {
    pub title: String,
}

/// Check that a Mu-so answers at `host`.
pub async fn validate_input(
    connector: &Arc<dyn Connector>,
    host: &str,
    timeout: Duration,
) -> Result<FlowInfo, FlowError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(FlowError::CannotConnect);
    }

    let device = connector.connect(host, Arc::new(|_| {}));
    if let Err(e) = device.startup(timeout).await {
        debug!("Validation of {} failed: {}", host, e);
        if let Err(shutdown_err) = device.shutdown().await {
            debug!("Shutdown after failed validation: {}", shutdown_err);
        }
        return Err(e.into());
    }
    if let Err(e) = device.shutdown().await {
        error!("Unexpected error closing validation connection to {}: {}", host, e);
        return Err(FlowError::Unknown(e.to_string()));
    }

    Ok(FlowInfo {
        title: format!("Mu-so {}", host),
    })
}

/// Entry for a validated host.
pub fn create_entry(host: &str, info: FlowInfo) -> ConfigEntry {
    ConfigEntry::manual(host.trim(), info.title)
}

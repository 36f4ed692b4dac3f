//! Discovery errors.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    /// Socket or HTTP transport failure
    NetworkError(String),
    /// Malformed description XML, SSDP message or location URL
    ParseError(String),
    Timeout,
    /// The description server answered with a non-success status
    HttpStatus(u16),
    /// The description belongs to something other than a Naim device
    InvalidDevice(String),
}

impl DiscoveryError {
    /// Whether the device could not be reached at all, as opposed to
    /// answering with something unusable.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, DiscoveryError::NetworkError(_) | DiscoveryError::Timeout)
    }
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DiscoveryError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DiscoveryError::Timeout => write!(f, "Timed out waiting for the device"),
            DiscoveryError::HttpStatus(status) => {
                write!(f, "Device description request returned HTTP {}", status)
            }
            DiscoveryError::InvalidDevice(msg) => write!(f, "Not a Naim device: {}", msg),
        }
    }
}

impl std::error::Error for DiscoveryError {}

impl From<std::io::Error> for DiscoveryError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => DiscoveryError::Timeout,
            _ => DiscoveryError::NetworkError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

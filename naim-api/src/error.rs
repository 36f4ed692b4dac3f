use thiserror::Error;

/// Errors reported by a Naim device-control implementation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// Network communication error
    ///
    /// Connection refused or reset, host unreachable, DNS failure.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// No reply within the allotted time
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The device replied with something that could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The device rejected or failed the request
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Invalid parameter value (volume out of range, unknown input, ...)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The handle has been shut down
    #[error("Device is not connected")]
    NotConnected,
}

impl ApiError {
    /// Transport failures are the ones worth retrying on the next access.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::NetworkError(_) | ApiError::Timeout(_) | ApiError::NotConnected
        )
    }
}

impl From<std::io::Error> for ApiError {
    fn from(error: std::io::Error) -> Self {
        ApiError::NetworkError(error.to_string())
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transport_classification() {
        assert!(ApiError::NetworkError("reset".to_string()).is_transport());
        assert!(ApiError::Timeout(Duration::from_secs(10)).is_transport());
        assert!(ApiError::NotConnected.is_transport());
        assert!(!ApiError::DeviceError("busy".to_string()).is_transport());
        assert!(!ApiError::InvalidParameter("volume".to_string()).is_transport());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let api: ApiError = io.into();
        assert!(matches!(api, ApiError::NetworkError(ref msg) if msg.contains("refused")));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ApiError::NetworkError("connection failed".to_string()).to_string(),
            "Network error: connection failed"
        );
        assert_eq!(ApiError::NotConnected.to_string(), "Device is not connected");
    }
}

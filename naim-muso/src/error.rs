use thiserror::Error;

use naim_api::ApiError;
use naim_discovery::DiscoveryError;

#[derive(Error, Debug)]
pub enum MusoError {
    #[error("Device error: {0}")]
    Api(#[from] ApiError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// One command failed on an established connection.
    #[error("{operation} failed to communicate with Mu-so: {source}")]
    CommunicationFailed {
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Runner task finished, disconnecting")]
    RunnerFinished,

    #[error("Runner task failed: {0}")]
    RunnerFailed(String),

    #[error("Device not connected")]
    NotConnected,

    #[error("Config entry not ready: {0}")]
    ConfigEntryNotReady(String),

    #[error("Error communicating with Mu-so: {0}")]
    UpdateFailed(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid media id: {0}")]
    InvalidMediaId(String),

    #[error("Browsing did not start within {0:?}")]
    BrowseTimeout(std::time::Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MusoError {
    /// Wrap a device error raised while running `operation`.
    pub fn communication(operation: &'static str, source: ApiError) -> Self {
        Self::CommunicationFailed { operation, source }
    }

    /// Whether the device is simply unreachable right now.
    pub fn is_transport(&self) -> bool {
        match self {
            MusoError::Api(e) => e.is_transport(),
            MusoError::CommunicationFailed { source, .. } => source.is_transport(),
            MusoError::Discovery(e) => e.is_unreachable(),
            MusoError::NotConnected => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MusoError>;

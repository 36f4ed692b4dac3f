//! Configuration types
//!
//! A [`ConfigEntry`] is the persisted record for one speaker. Entries created
//! from discovery carry the UPnP identity and description URL; entries typed
//! in by hand carry only a host. [`CoordinatorConfig`] holds the timing knobs
//! of the polling and connection logic.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{CONF_DEVICE_ID, CONF_HOST, CONF_TYPE, CONF_URL, DOMAIN};
use crate::error::{MusoError, Result};

/// Connection data of a config entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryData {
    /// Created from an SSDP discovery
    Discovered {
        device_id: String,
        #[serde(rename = "type")]
        device_type: String,
        url: String,
        #[serde(default)]
        mac: Option<String>,
    },
    /// Created from a host typed in by the user
    Manual { host: String },
}

impl EntryData {
    /// Where to connect: the description URL, or the bare host.
    pub fn location(&self) -> &str {
        match self {
            EntryData::Discovered { url, .. } => url,
            EntryData::Manual { host } => host,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let missing = |key: &str| MusoError::InvalidConfig(format!("'{}' must not be empty", key));
        match self {
            EntryData::Discovered { device_id, device_type, url, .. } => {
                if device_id.trim().is_empty() {
                    return Err(missing(CONF_DEVICE_ID));
                }
                if device_type.trim().is_empty() {
                    return Err(missing(CONF_TYPE));
                }
                if url.trim().is_empty() {
                    return Err(missing(CONF_URL));
                }
            }
            EntryData::Manual { host } => {
                if host.trim().is_empty() {
                    return Err(missing(CONF_HOST));
                }
            }
        }
        Ok(())
    }
}

/// User-adjustable options of a config entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryOptions {
    /// Show every browse row, even those the player cannot use
    pub browse_unfiltered: bool,
    /// Keep polling while the device is unavailable
    pub poll_availability: bool,
    pub listen_port: Option<u16>,
    pub callback_url_override: Option<String>,
}

/// Persisted configuration for one speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
    pub data: EntryData,
    #[serde(default)]
    pub options: EntryOptions,
}

impl ConfigEntry {
    /// Entry for a host entered by hand.
    pub fn manual(host: &str, title: impl Into<String>) -> Self {
        Self {
            entry_id: format!("{}-{}", DOMAIN, host),
            title: title.into(),
            data: EntryData::Manual { host: host.to_string() },
            options: EntryOptions::default(),
        }
    }

    /// Entry for a device found through discovery.
    pub fn discovered(device: &naim_discovery::Device, mac: Option<String>) -> Self {
        Self {
            entry_id: format!("{}-{}", DOMAIN, device.id),
            title: device.name.clone(),
            data: EntryData::Discovered {
                device_id: device.id.clone(),
                device_type: device.device_type.clone(),
                url: device.location.clone(),
                mac,
            },
            options: EntryOptions::default(),
        }
    }
}

/// JSON file holding every config entry.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<user config dir>/naim-muso/entries.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("naim-muso").join("entries.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored entries; a missing file is an empty store.
    pub fn load(&self) -> Result<Vec<ConfigEntry>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let entries: Vec<ConfigEntry> = serde_json::from_str(&text)?;
        for entry in &entries {
            entry.data.validate()?;
        }
        Ok(entries)
    }

    pub fn save(&self, entries: &[ConfigEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, text)?;
        tracing::debug!("Saved {} config entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    /// Insert or replace the entry with the same `entry_id`.
    pub fn upsert(&self, entry: ConfigEntry) -> Result<()> {
        entry.data.validate()?;
        let mut entries = self.load()?;
        match entries.iter_mut().find(|e| e.entry_id == entry.entry_id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        self.save(&entries)
    }

    /// Returns whether an entry was removed.
    pub fn remove(&self, entry_id: &str) -> Result<bool> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.entry_id != entry_id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }
}

/// Timing configuration for the coordinator and connection manager.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Period of the background refresh.
    /// Default: 10 seconds
    pub update_interval: Duration,

    /// Handshake timeout when connecting.
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// How long to wait for the reply to a single browse command.
    /// Default: 10 seconds
    pub reply_timeout: Duration,

    /// Upper bound for starting a browse session.
    /// Default: 120 seconds
    pub browse_timeout: Duration,

    /// Pause after the view switched to browse mode.
    /// Default: 500 milliseconds
    pub browse_settle_delay: Duration,

    /// First delay between view-state polls; doubles each time.
    /// Default: 50 milliseconds
    pub view_state_poll_initial: Duration,

    /// Cap for the view-state poll delay.
    /// Default: 1 second
    pub view_state_poll_max: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            reply_timeout: Duration::from_secs(10),
            browse_timeout: Duration::from_secs(120),
            browse_settle_delay: Duration::from_millis(500),
            view_state_poll_initial: Duration::from_millis(50),
            view_state_poll_max: Duration::from_secs(1),
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_browse_timeout(mut self, timeout: Duration) -> Self {
        self.browse_timeout = timeout;
        self
    }

    pub fn with_browse_settle_delay(mut self, delay: Duration) -> Self {
        self.browse_settle_delay = delay;
        self
    }

    pub fn with_view_state_polling(mut self, initial: Duration, max: Duration) -> Self {
        self.view_state_poll_initial = initial;
        self.view_state_poll_max = max;
        self
    }

    /// Reject zero intervals, which would spin.
    pub fn validate(&self) -> Result<()> {
        if self.update_interval.is_zero() {
            return Err(MusoError::InvalidConfig("update_interval must be > 0".to_string()));
        }
        if self.view_state_poll_initial.is_zero() {
            return Err(MusoError::InvalidConfig("view_state_poll_initial must be > 0".to_string()));
        }
        if self.view_state_poll_max < self.view_state_poll_initial {
            return Err(MusoError::InvalidConfig(
                "view_state_poll_max must be >= view_state_poll_initial".to_string(),
            ));
        }
        Ok(())
    }
}

//! Naim Mu-so integration
//!
//! Keeps one connection per configured speaker alive, polls it, and exposes it
//! as a media player, a set of diagnostic sensors and a front-panel light.
//!
//! The device protocol itself is provided by a [`naim_api::Connector`]; UPnP
//! description lookups go through a [`naim_discovery::DeviceFactory`]. Both are
//! injected, so one factory can be shared by every entry in the process.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use naim_discovery::UpnpFactory;
//! use naim_muso::{setup_entry, ConfigEntry, CoordinatorConfig};
//!
//! let factory = Arc::new(UpnpFactory::new(Duration::from_secs(5))?);
//! let entry = ConfigEntry::manual("192.168.1.40", "Mu-so 192.168.1.40");
//! let runtime = setup_entry(entry, factory, connector, CoordinatorConfig::default(), None).await?;
//!
//! runtime.media_player.set_volume_level(0.3).await?;
//! runtime.media_player.play_media("radio/BBC1").await?;
//! ```
//!
//! # Presence
//!
//! Hand a listener to [`setup_entry`] so a discovered speaker is reconnected
//! after a reboot and let go when it leaves the network:
//!
//! ```rust,ignore
//! let listener = naim_discovery::PresenceListener::bind()?;
//! let runtime = setup_entry(entry, factory, connector, config, Some(&listener)).await?;
//! tokio::spawn(async move { listener.run().await });
//! ```

pub mod config;
pub mod config_flow;
pub mod connection;
pub mod consts;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod light;
pub mod logging;
pub mod media_browser;
pub mod media_player;
pub mod sensor;
pub mod setup;

#[cfg(test)]
mod test_util;

pub use config::{ConfigEntry, ConfigStore, CoordinatorConfig, EntryData, EntryOptions};
pub use config_flow::{create_entry, validate_input, FlowError, FlowInfo};
pub use connection::ConnectionManager;
pub use coordinator::{MusoCoordinator, StateWatcher};
pub use entity::{DeviceInfo, EntityCategory};
pub use error::{MusoError, Result};
pub use light::Light;
pub use media_browser::{BrowseMedia, MediaClass, MediaPath};
pub use media_player::{MediaPlayer, MediaType, PlayerState, SupportedFeatures};
pub use sensor::{Sensor, SensorDescription, SensorKind, SENSORS};
pub use setup::{remove_device, setup_entry, unload_entry, RuntimeData};

//! Setting up and tearing down one config entry.

use std::sync::Arc;

use naim_api::Connector;
use naim_discovery::{DeviceFactory, PresenceListener};
use tracing::info;

use crate::config::{ConfigEntry, CoordinatorConfig};
use crate::coordinator::MusoCoordinator;
use crate::error::Result;
use crate::light::Light;
use crate::media_player::MediaPlayer;
use crate::sensor::Sensor;

/// Everything that lives while an entry is loaded.
pub struct RuntimeData {
    pub coordinator: Arc<MusoCoordinator>,
    pub media_player: MediaPlayer,
    pub sensors: Vec<Sensor>,
    pub light: Light,
}

/// Connect, load the first snapshot and create the entities.
///
/// Returns [`MusoError::ConfigEntryNotReady`](crate::MusoError::ConfigEntryNotReady)
/// when the speaker is unreachable. Polling is started on success, and SSDP
/// announcements are followed when a `presence` listener is given.
pub async fn setup_entry(
    entry: ConfigEntry,
    factory: Arc<dyn DeviceFactory>,
    connector: Arc<dyn Connector>,
    config: CoordinatorConfig,
    presence: Option<&PresenceListener>,
) -> Result<RuntimeData> {
    let coordinator = Arc::new(MusoCoordinator::new(entry, factory, connector, config)?);
    coordinator.first_refresh().await?;
    coordinator.spawn_polling();
    if let Some(listener) = presence {
        coordinator.track_presence(listener);
    }

    info!("Set up {}", coordinator.title());
    Ok(RuntimeData {
        media_player: MediaPlayer::new(Arc::clone(&coordinator)),
        sensors: Sensor::all(&coordinator),
        light: Light::new(Arc::clone(&coordinator)),
        coordinator,
    })
}

pub async fn unload_entry(runtime: RuntimeData) {
    runtime.coordinator.shutdown().await;
}

/// Devices can always be removed from the registry.
pub fn remove_device(_runtime: &RuntimeData) -> bool {
    true
}

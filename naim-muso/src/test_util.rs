//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use naim_api::mock::MockConnector;
use naim_api::{BrowseRow, NaimState, StandbyState};
use naim_discovery::{Device, DeviceFactory, DiscoveryError};

use crate::config::{ConfigEntry, CoordinatorConfig};
use crate::coordinator::MusoCoordinator;

/// Host that [`HostFactory`] reports as unreachable.
pub const UNREACHABLE_HOST: &str = "10.0.0.99";

/// Resolves any description URL to a Mu-so at the URL's host.
pub struct HostFactory;

#[async_trait]
impl DeviceFactory for HostFactory {
    async fn create_device(&self, location: &str) -> naim_discovery::Result<Device> {
        let (ip_address, port) = naim_discovery::device::host_and_port(location)?;
        if ip_address == UNREACHABLE_HOST {
            return Err(DiscoveryError::Timeout);
        }
        Ok(Device {
            id: "uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01".to_string(),
            name: "Kitchen".to_string(),
            ip_address,
            port,
            location: location.to_string(),
            model_name: "Mu-so".to_string(),
            device_type: naim_discovery::UPNP_ST.to_string(),
            manufacturer: "Naim Audio Ltd.".to_string(),
            serial_number: None,
        })
    }
}

/// A powered-on speaker playing internet radio.
pub fn playing_state() -> NaimState {
    let mut state = NaimState {
        standby: Some(StandbyState::Off),
        volume: Some(35),
        muted: Some(false),
        input: Some("1".to_string()),
        buffer_state: Some(100),
        illumination: Some(2),
        ..NaimState::default()
    };
    state.inputs.insert("1".to_string(), "iRadio".to_string());
    state.inputs.insert("2".to_string(), "Spotify".to_string());
    state.presets.insert("BBC1".to_string(), "BBC Radio 1".to_string());
    state.presets.insert("FIP".to_string(), "FIP".to_string());
    state.now_playing.source = Some("iradio".to_string());
    state.now_playing.title = Some("Morning Show".to_string());
    state.unit_temperatures.insert("Psu".to_string(), 41.4);
    state.voltages.insert("3V3".to_string(), 3312.0);
    state.rows = vec![
        BrowseRow {
            index: 1,
            text: "Jazz".to_string(),
            play: false,
            browse: true,
            album_art_url: None,
        },
        BrowseRow {
            index: 2,
            text: "Radio Swiss Jazz".to_string(),
            play: true,
            browse: false,
            album_art_url: Some("http://img.example/rsj.png".to_string()),
        },
    ];
    state
}

/// A coordinator for a manual entry at `10.0.0.2`, with short browse timings.
pub fn coordinator(connector: &MockConnector) -> Arc<MusoCoordinator> {
    let config = CoordinatorConfig::default()
        .with_browse_settle_delay(std::time::Duration::from_millis(1))
        .with_view_state_polling(
            std::time::Duration::from_millis(1),
            std::time::Duration::from_millis(4),
        );
    Arc::new(
        MusoCoordinator::new(
            ConfigEntry::manual("10.0.0.2", "Mu-so 10.0.0.2"),
            Arc::new(HostFactory),
            Arc::new(connector.clone()),
            config,
        )
        .unwrap(),
    )
}

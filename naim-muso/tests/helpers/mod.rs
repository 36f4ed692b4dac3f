//! Shared fixtures for the naim-muso integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use naim_api::mock::MockConnector;
use naim_api::{BrowseRow, NaimState, StandbyState};
use naim_discovery::{Device, DeviceFactory, PresenceChange, SsdpNotification, UPNP_ST};
use naim_muso::{ConfigEntry, ConnectionManager, CoordinatorConfig, EntryData, EntryOptions, MusoCoordinator};

pub const UDN: &str = "uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01";
pub const LOCATION: &str = "http://192.168.1.40:8080/description.xml";

/// Resolves every description URL to a Mu-so at the URL's host.
pub struct FakeFactory;

#[async_trait]
impl DeviceFactory for FakeFactory {
    async fn create_device(&self, location: &str) -> naim_discovery::Result<Device> {
        let (ip_address, port) = naim_discovery::device::host_and_port(location)?;
        Ok(Device {
            id: UDN.to_string(),
            name: "Living Room".to_string(),
            ip_address,
            port,
            location: location.to_string(),
            model_name: "Mu-so".to_string(),
            device_type: UPNP_ST.to_string(),
            manufacturer: "Naim Audio Ltd.".to_string(),
            serial_number: Some("320456".to_string()),
        })
    }
}

/// Browse timings short enough for tests.
pub fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_browse_settle_delay(Duration::from_millis(1))
        .with_view_state_polling(Duration::from_millis(1), Duration::from_millis(8))
}

pub fn manager(connector: &MockConnector) -> ConnectionManager {
    ConnectionManager::new(
        Arc::new(FakeFactory),
        Arc::new(connector.clone()),
        LOCATION,
        fast_config(),
    )
}

pub fn discovered_entry() -> ConfigEntry {
    ConfigEntry {
        entry_id: "naim_muso-living-room".to_string(),
        title: "Living Room".to_string(),
        data: EntryData::Discovered {
            device_id: UDN.to_string(),
            device_type: UPNP_ST.to_string(),
            url: LOCATION.to_string(),
            mac: None,
        },
        options: EntryOptions::default(),
    }
}

pub fn coordinator(connector: &MockConnector) -> Arc<MusoCoordinator> {
    Arc::new(
        MusoCoordinator::new(
            discovered_entry(),
            Arc::new(FakeFactory),
            Arc::new(connector.clone()),
            fast_config(),
        )
        .expect("valid entry"),
    )
}

pub fn notification(change: PresenceChange, boot_id: u32) -> SsdpNotification {
    SsdpNotification {
        change,
        usn: format!("{}::{}", UDN, UPNP_ST),
        nt: UPNP_ST.to_string(),
        location: (change == PresenceChange::Alive).then(|| LOCATION.to_string()),
        boot_id: Some(boot_id),
        next_boot_id: None,
        server: Some("Linux/3.x UPnP/1.1 Naim/1.0".to_string()),
    }
}

/// Raw NOTIFY datagram as the speaker sends it.
pub fn notify_datagram(nts: &str, boot_id: u32) -> String {
    format!(
        "NOTIFY * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         LOCATION: {}\r\n\
         NT: {}\r\n\
         NTS: {}\r\n\
         USN: {}::{}\r\n\
         BOOTID.UPNP.ORG: {}\r\n\
         \r\n",
        LOCATION, UPNP_ST, nts, UDN, UPNP_ST, boot_id
    )
}

pub fn radio_state() -> NaimState {
    let mut state = NaimState {
        standby: Some(StandbyState::Off),
        volume: Some(20),
        ..NaimState::default()
    };
    state.presets.insert("BBC1".to_string(), "BBC Radio 1".to_string());
    state.rows = (1..=3)
        .map(|index| BrowseRow {
            index,
            text: format!("Station {}", index),
            play: true,
            browse: false,
            album_art_url: None,
        })
        .collect();
    state
}

/// Let spawned tasks (runners, presence loops) make progress.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

//! Polling and fan-out of device state
//!
//! One [`MusoCoordinator`] exists per config entry. It owns the
//! [`ConnectionManager`], refreshes the device on a fixed interval and
//! publishes every fresh [`NaimState`] to subscribers. Entities never talk to
//! the connection directly: reads go through [`MusoCoordinator::data`] or a
//! [`StateWatcher`], commands through [`MusoCoordinator::execute`].

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use naim_api::{Connector, NaimDevice, NaimState};
use naim_discovery::{DeviceFactory, PresenceListener, SsdpNotification};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ConfigEntry, CoordinatorConfig, EntryData};
use crate::connection::ConnectionManager;
use crate::consts::DEFAULT_NAME;
use crate::entity::DeviceInfo;
use crate::error::{MusoError, Result};

/// Observer of published snapshots.
///
/// [`changed`](Self::changed) yields each published snapshot at most once.
/// A slow subscriber only sees the latest of several quick updates.
#[derive(Clone)]
pub struct StateWatcher {
    rx: watch::Receiver<Option<NaimState>>,
}

impl StateWatcher {
    /// Latest snapshot, without waiting.
    pub fn get(&self) -> Option<NaimState> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<NaimState> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }

    /// Like [`changed`](Self::changed), giving up after `timeout`.
    pub async fn changed_timeout(&mut self, timeout: Duration) -> Option<NaimState> {
        tokio::time::timeout(timeout, self.changed()).await.ok().flatten()
    }

    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

pub struct MusoCoordinator {
    entry: ConfigEntry,
    connection: ConnectionManager,
    state_tx: Arc<watch::Sender<Option<NaimState>>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl MusoCoordinator {
    pub fn new(
        entry: ConfigEntry,
        factory: Arc<dyn DeviceFactory>,
        connector: Arc<dyn Connector>,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        entry.data.validate()?;
        config.validate()?;

        let (state_tx, _) = watch::channel(None);
        let state_tx = Arc::new(state_tx);
        let (shutdown_tx, _) = watch::channel(false);

        let sender = Arc::clone(&state_tx);
        let connection =
            ConnectionManager::new(factory, connector, entry.data.location(), config)
                .with_update_callback(Arc::new(move |state| publish_to(&sender, state)));

        Ok(Self {
            entry,
            connection,
            state_tx,
            shutdown_tx,
            tasks: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// UDN for discovered entries, the host for manual ones.
    pub fn unique_id(&self) -> &str {
        match &self.entry.data {
            EntryData::Discovered { device_id, .. } => device_id,
            EntryData::Manual { host } => host,
        }
    }

    /// `<udn>::<device type>`, the key SSDP announcements are matched on.
    pub fn usn(&self) -> Option<String> {
        match &self.entry.data {
            EntryData::Discovered { device_id, device_type, .. } => {
                Some(format!("{}::{}", device_id, device_type))
            }
            EntryData::Manual { .. } => None,
        }
    }

    pub fn title(&self) -> &str {
        if self.entry.title.is_empty() {
            return DEFAULT_NAME;
        }
        &self.entry.title
    }

    pub fn mac_address(&self) -> Option<&str> {
        match &self.entry.data {
            EntryData::Discovered { mac, .. } => mac.as_deref(),
            EntryData::Manual { .. } => None,
        }
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(self.unique_id(), self.title(), self.mac_address())
    }

    pub fn entry(&self) -> &ConfigEntry {
        &self.entry
    }

    pub fn config(&self) -> &CoordinatorConfig {
        self.connection.config()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Latest published snapshot.
    pub fn data(&self) -> Option<NaimState> {
        self.state_tx.borrow().clone()
    }

    pub async fn available(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Connect and load the first snapshot.
    ///
    /// Fails with [`MusoError::ConfigEntryNotReady`] when the speaker cannot be
    /// reached, so the caller can retry setup later.
    pub async fn first_refresh(&self) -> Result<()> {
        let location = self.connection.location();
        if let Err(e) = self.connection.connect(&location).await {
            debug!("Initial connect to {} failed: {}", location, e);
        }
        if !self.connection.is_connected().await {
            return Err(MusoError::ConfigEntryNotReady(format!(
                "Failed to connect to Mu-so at {}",
                location
            )));
        }
        self.refresh()
            .await
            .map_err(|e| MusoError::ConfigEntryNotReady(e.to_string()))
    }

    /// Poll the device once and publish the result.
    pub async fn refresh(&self) -> Result<()> {
        let result = async {
            self.connection.ensure_connected().await?;
            let device = self.connection.device().await.ok_or(MusoError::NotConnected)?;
            device.update_data().await?;
            self.publish(device.state());
            Ok::<_, MusoError>(())
        }
        .await;

        result.map_err(|e| {
            debug!("Error fetching {} data: {}", self.title(), e);
            MusoError::UpdateFailed(e.to_string())
        })
    }

    /// Hand a snapshot to subscribers. Identical snapshots are not re-sent.
    pub fn publish(&self, state: NaimState) {
        publish_to(&self.state_tx, state);
    }

    pub fn subscribe(&self) -> StateWatcher {
        StateWatcher {
            rx: self.state_tx.subscribe(),
        }
    }

    /// Run one device command.
    ///
    /// Reconnects first if needed; a failure of `f` itself is reported as
    /// [`MusoError::CommunicationFailed`] naming `operation`.
    pub async fn execute<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn NaimDevice>) -> Fut,
        Fut: Future<Output = naim_api::Result<T>>,
    {
        self.connection.ensure_connected().await?;
        let device = self.connection.device().await.ok_or(MusoError::NotConnected)?;
        f(device)
            .await
            .map_err(|e| MusoError::communication(operation, e))
    }

    /// Refresh every `update_interval` until [`shutdown`](Self::shutdown).
    pub fn spawn_polling(self: &Arc<Self>) {
        let coordinator = Arc::downgrade(self);
        let mut shutdown = self.shutdown_tx.subscribe();
        let period = self.config().update_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(coordinator) = Weak::upgrade(&coordinator) else {
                            break;
                        };
                        // Failures are already logged
                        let _ = coordinator.refresh().await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
        self.tasks.lock().push(task);
    }

    /// Feed SSDP announcements for this device to the connection manager.
    pub fn spawn_presence(self: &Arc<Self>, mut notifications: mpsc::UnboundedReceiver<SsdpNotification>) {
        let coordinator = Arc::downgrade(self);
        let mut shutdown = self.shutdown_tx.subscribe();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    notification = notifications.recv() => {
                        let Some(notification) = notification else {
                            break;
                        };
                        let Some(coordinator) = Weak::upgrade(&coordinator) else {
                            break;
                        };
                        coordinator.connection.handle_presence(&notification).await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
        self.tasks.lock().push(task);
    }

    /// Register with `listener` for this device's announcements.
    ///
    /// Manual entries have no UDN and are not tracked; returns whether a
    /// registration was made.
    pub fn track_presence(self: &Arc<Self>, listener: &PresenceListener) -> bool {
        let EntryData::Discovered { device_id, .. } = &self.entry.data else {
            debug!("{} has no UDN, presence not tracked", self.title());
            return false;
        };
        self.spawn_presence(listener.register(device_id));
        true
    }

    /// Stop background tasks and disconnect.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let abort = task.abort_handle();
            if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
                warn!("Background task did not stop in time, aborting");
                abort.abort();
            }
        }

        self.connection.disconnect().await;
        info!("Unloaded {}", self.title());
    }
}

fn publish_to(sender: &watch::Sender<Option<NaimState>>, state: NaimState) {
    sender.send_if_modified(|current| {
        if current.as_ref() == Some(&state) {
            return false;
        }
        *current = Some(state);
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryOptions;
    use crate::test_util::{coordinator, playing_state, HostFactory};
    use naim_api::mock::MockConnector;
    use naim_api::ApiError;

    fn discovered_entry() -> ConfigEntry {
        ConfigEntry {
            entry_id: "e1".to_string(),
            title: "Kitchen".to_string(),
            data: EntryData::Discovered {
                device_id: "uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01".to_string(),
                device_type: naim_discovery::UPNP_ST.to_string(),
                url: "http://10.0.0.2:8080/description.xml".to_string(),
                mac: Some("00:1a:2b:3c:4d:5e".to_string()),
            },
            options: EntryOptions::default(),
        }
    }

    #[test]
    fn test_identity() {
        let coordinator = MusoCoordinator::new(
            discovered_entry(),
            Arc::new(HostFactory),
            Arc::new(MockConnector::new()),
            CoordinatorConfig::default(),
        )
        .unwrap();

        assert_eq!(coordinator.unique_id(), "uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01");
        assert_eq!(
            coordinator.usn().unwrap(),
            "uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01::urn:schemas-upnp-org:device:MediaRenderer:1"
        );
        assert_eq!(coordinator.mac_address(), Some("00:1a:2b:3c:4d:5e"));
        assert_eq!(coordinator.device_info().name, "Kitchen");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = MusoCoordinator::new(
            discovered_entry(),
            Arc::new(HostFactory),
            Arc::new(MockConnector::new()),
            CoordinatorConfig::default().with_update_interval(Duration::ZERO),
        );
        assert!(matches!(result, Err(MusoError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_first_refresh_publishes_state() {
        let connector = MockConnector::new().with_state(playing_state());
        let coordinator = coordinator(&connector);
        let mut watcher = coordinator.subscribe();

        coordinator.first_refresh().await.unwrap();

        assert!(coordinator.available().await);
        assert_eq!(coordinator.data().unwrap().volume, Some(35));
        assert_eq!(watcher.changed().await.unwrap().volume, Some(35));
        assert!(!watcher.has_changed());
    }

    #[tokio::test]
    async fn test_first_refresh_not_ready() {
        let connector = MockConnector::new();
        connector.set_fail_startup(true);
        let coordinator = coordinator(&connector);

        let err = coordinator.first_refresh().await.unwrap_err();
        assert!(matches!(err, MusoError::ConfigEntryNotReady(_)));
    }

    #[tokio::test]
    async fn test_refresh_failure_is_update_failed() {
        let connector = MockConnector::new();
        let coordinator = coordinator(&connector);
        coordinator.first_refresh().await.unwrap();

        connector.set_fail_commands(true);
        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, MusoError::UpdateFailed(_)));
    }

    #[tokio::test]
    async fn test_identical_snapshots_are_delivered_once() {
        let coordinator = coordinator(&MockConnector::new());
        let mut watcher = coordinator.subscribe();

        coordinator.publish(playing_state());
        coordinator.publish(playing_state());

        assert!(watcher.changed().await.is_some());
        assert!(watcher.changed_timeout(Duration::from_millis(20)).await.is_none());
    }

    #[tokio::test]
    async fn test_execute_wraps_command_failures() {
        let connector = MockConnector::new();
        let coordinator = coordinator(&connector);
        coordinator.first_refresh().await.unwrap();

        coordinator
            .execute("media_play", |device| async move { device.play().await })
            .await
            .unwrap();

        connector.set_fail_commands(true);
        let err = coordinator
            .execute("media_pause", |device| async move { device.pause().await })
            .await
            .unwrap_err();
        match err {
            MusoError::CommunicationFailed { operation, source } => {
                assert_eq!(operation, "media_pause");
                assert!(matches!(source, ApiError::NetworkError(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_refreshes_until_shutdown() {
        let connector = MockConnector::new();
        let coordinator = coordinator(&connector);
        coordinator.first_refresh().await.unwrap();
        coordinator.spawn_polling();

        tokio::time::sleep(Duration::from_secs(25)).await;
        let device = connector.last_device().unwrap();
        let polls = device.calls().iter().filter(|c| *c == "update_data").count();
        assert_eq!(polls, 3);

        coordinator.shutdown().await;
        assert!(!coordinator.available().await);
        assert_eq!(device.shutdown_count(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let after = device.calls().iter().filter(|c| *c == "update_data").count();
        assert_eq!(after, 3);
    }
}

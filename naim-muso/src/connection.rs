//! Device connection lifecycle
//!
//! [`ConnectionManager`] owns at most one live [`NaimDevice`] handle and the
//! runner task that came with it. Every command path goes through
//! [`ConnectionManager::ensure_connected`], which notices a dead runner,
//! clears the handle exactly once and reconnects on demand.
//!
//! SSDP presence announcements are fed in through
//! [`ConnectionManager::handle_presence`]:
//!
//! - `ssdp:update` records the announced next boot id
//! - a changed boot id resets the failure flag and drops the old session
//! - `ssdp:byebye` disconnects
//! - `ssdp:alive` connects, unless a previous attempt failed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use naim_api::{Connector, NaimDevice, RunnerHandle, StateCallback};
use naim_discovery::{DeviceFactory, PresenceChange, SsdpNotification};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::{MusoError, Result};

/// The guarded part: the handle and its runner change together.
#[derive(Default)]
struct Slot {
    device: Option<Arc<dyn NaimDevice>>,
    runner: Option<RunnerHandle>,
}

pub struct ConnectionManager {
    factory: Arc<dyn DeviceFactory>,
    connector: Arc<dyn Connector>,
    on_update: StateCallback,
    config: CoordinatorConfig,
    slot: Mutex<Slot>,
    location: RwLock<String>,
    boot_id: RwLock<Option<u32>>,
    ssdp_connect_failed: AtomicBool,
}

impl ConnectionManager {
    /// `location` is either a description URL or a bare host.
    pub fn new(
        factory: Arc<dyn DeviceFactory>,
        connector: Arc<dyn Connector>,
        location: impl Into<String>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            factory,
            connector,
            on_update: Arc::new(|_| {}),
            config,
            slot: Mutex::new(Slot::default()),
            location: RwLock::new(location.into()),
            boot_id: RwLock::new(None),
            ssdp_connect_failed: AtomicBool::new(false),
        }
    }

    /// Callback handed to every device handle this manager creates.
    pub fn with_update_callback(mut self, on_update: StateCallback) -> Self {
        self.on_update = on_update;
        self
    }

    /// Connect to `location` unless a handle already exists.
    ///
    /// The lock is held for the whole resolution and handshake, so racing
    /// callers end up sharing one handle. Errors leave the slot empty.
    pub async fn connect(&self, location: &str) -> Result<()> {
        let mut slot = self.slot.lock().await;
        if slot.device.is_some() {
            debug!("Already connected, ignoring connect to {}", location);
            return Ok(());
        }

        let host = self.resolve_host(location).await?;
        debug!("Connecting to Mu-so at {} ({})", host, location);

        let device = self.connector.connect(&host, Arc::clone(&self.on_update));
        let runner = match device.startup(self.config.connect_timeout).await {
            Ok(runner) => runner,
            Err(e) => {
                if let Err(shutdown_err) = device.shutdown().await {
                    debug!("Shutdown after failed startup: {}", shutdown_err);
                }
                return Err(e.into());
            }
        };

        slot.device = Some(device);
        slot.runner = runner;
        *self.location.write() = location.to_string();
        info!("Connected to Mu-so at {}", host);
        Ok(())
    }

    /// Drop the handle, if any. Never fails; shutdown errors are logged.
    pub async fn disconnect(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(runner) = slot.runner.take() {
            runner.abort();
        }
        let Some(device) = slot.device.take() else {
            return;
        };

        debug!("Disconnecting from {}", device.host());
        if let Err(e) = device.shutdown().await {
            warn!("Error shutting down {}: {}", device.host(), e);
        }
    }

    /// Make sure a usable handle exists before a command is issued.
    ///
    /// A finished runner means the handle is stale: it is cleared, one
    /// reconnect is attempted, and the runner's failure is returned as a
    /// communication failure of the `runner` operation. With no
    /// handle at all a reconnect is attempted and transport errors are only
    /// logged.
    pub async fn ensure_connected(&self) -> Result<()> {
        let stale = {
            let mut slot = self.slot.lock().await;
            let finished = slot.runner.as_ref().is_some_and(|runner| runner.is_finished());
            if finished {
                Some((slot.runner.take(), slot.device.take()))
            } else {
                None
            }
        };

        if let Some((runner, device)) = stale {
            let failure = match runner {
                Some(runner) => match runner.await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(MusoError::communication("runner", e)),
                    Err(e) => Some(MusoError::RunnerFailed(e.to_string())),
                },
                None => None,
            };
            warn!(
                "Runner task finished{}, disconnecting",
                failure.as_ref().map(|e| format!(" ({})", e)).unwrap_or_default()
            );

            if let Some(device) = device {
                if let Err(e) = device.shutdown().await {
                    debug!("Error shutting down stale handle: {}", e);
                }
            }

            self.try_connect().await?;
            return match failure {
                Some(failure) => Err(failure),
                None if self.is_connected().await => Ok(()),
                None => Err(MusoError::RunnerFinished),
            };
        }

        if !self.is_connected().await {
            self.try_connect().await?;
        }
        Ok(())
    }

    /// React to one SSDP announcement for this device.
    pub async fn handle_presence(&self, notification: &SsdpNotification) {
        debug!(
            "Presence {:?} for {} (boot id {:?})",
            notification.change, notification.usn, notification.boot_id
        );

        if notification.change == PresenceChange::Update {
            let mut boot_id = self.boot_id.write();
            if notification.boot_id.is_some() && *boot_id == notification.boot_id {
                if let Some(next) = notification.next_boot_id {
                    *boot_id = Some(next);
                }
            }
            return;
        }

        if let Some(new_boot_id) = notification.boot_id {
            let rebooted = {
                let mut boot_id = self.boot_id.write();
                let rebooted = matches!(*boot_id, Some(old) if old != new_boot_id);
                *boot_id = Some(new_boot_id);
                rebooted
            };
            if rebooted {
                info!("Mu-so rebooted (boot id {}), dropping old session", new_boot_id);
                self.ssdp_connect_failed.store(false, Ordering::SeqCst);
                if self.is_connected().await {
                    self.disconnect().await;
                }
            }
        }

        match notification.change {
            PresenceChange::ByeBye => {
                self.disconnect().await;
                self.ssdp_connect_failed.store(false, Ordering::SeqCst);
            }
            PresenceChange::Alive => {
                if self.is_connected().await || self.ssdp_connect_failed() {
                    return;
                }
                let Some(location) = notification.location.as_deref() else {
                    debug!("Alive notification without location for {}", notification.usn);
                    return;
                };
                if let Err(e) = self.connect(location).await {
                    self.ssdp_connect_failed.store(true, Ordering::SeqCst);
                    warn!("Failed connecting to recently alive device at {}: {}", location, e);
                }
            }
            PresenceChange::Update => {}
        }
    }

    /// Current handle, if connected.
    pub async fn device(&self) -> Option<Arc<dyn NaimDevice>> {
        self.slot.lock().await.device.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.device.is_some()
    }

    /// Last location connected to, or the configured one.
    pub fn location(&self) -> String {
        self.location.read().clone()
    }

    pub fn ssdp_connect_failed(&self) -> bool {
        self.ssdp_connect_failed.load(Ordering::SeqCst)
    }

    pub fn boot_id(&self) -> Option<u32> {
        *self.boot_id.read()
    }

    /// Install `runner` as the background task of the current handle.
    pub async fn set_runner(&self, runner: RunnerHandle) {
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.runner.replace(runner) {
            previous.abort();
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Connect to the remembered location, logging transport errors.
    async fn try_connect(&self) -> Result<()> {
        let location = self.location();
        match self.connect(&location).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_transport() => {
                debug!("Mu-so at {} is not reachable: {}", location, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Host to hand to the connector.
    async fn resolve_host(&self, location: &str) -> Result<String> {
        if !location.contains("://") {
            return Ok(location.to_string());
        }
        let device = self.factory.create_device(location).await?;
        Ok(device.ip_address)
    }
}

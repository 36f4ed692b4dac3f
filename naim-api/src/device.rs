//! The device handle and connector traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::{Command, NaimState, Result};

/// Called by the device library whenever it has a fresh [`NaimState`].
pub type StateCallback = Arc<dyn Fn(NaimState) + Send + Sync>;

/// The device library's own connection-maintaining loop.
///
/// When it finishes, for whatever reason, the handle it belongs to is stale.
pub type RunnerHandle = JoinHandle<Result<()>>;

/// A live handle to one Naim device.
///
/// All commands are single attempts; retry policy belongs to the caller.
#[async_trait]
pub trait NaimDevice: Send + Sync {
    /// Host name or address the handle was created for.
    fn host(&self) -> &str;

    /// Device name as reported by the device, falling back to the host.
    fn name(&self) -> String;

    /// Latest known state.
    fn state(&self) -> NaimState;

    /// Open the connection and complete the handshake within `timeout`.
    ///
    /// May return the handle of a background loop that keeps the connection
    /// alive and pushes updates through the [`StateCallback`].
    async fn startup(&self, timeout: Duration) -> Result<Option<RunnerHandle>>;

    /// Close the connection. Further commands fail with `NotConnected`.
    async fn shutdown(&self) -> Result<()>;

    /// Poll the device for everything in [`NaimState`].
    async fn update_data(&self) -> Result<()>;

    async fn on(&self) -> Result<()>;
    async fn off(&self) -> Result<()>;
    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    async fn next_track(&self) -> Result<()>;
    async fn previous_track(&self) -> Result<()>;
    async fn set_mute(&self, mute: bool) -> Result<()>;
    async fn volume_up(&self) -> Result<()>;
    async fn volume_down(&self) -> Result<()>;

    /// Absolute volume, 0..=100.
    async fn set_volume(&self, volume: u8) -> Result<()>;

    /// Select an input by its id (a key of [`NaimState::inputs`]).
    async fn select_input(&self, input: &str) -> Result<()>;

    /// Start playing a preset by its id (a key of [`NaimState::presets`]).
    async fn select_preset(&self, preset: &str) -> Result<()>;

    /// Open a row of the active browse list.
    async fn select_row(&self, row: &str, reply_timeout: Duration) -> Result<()>;

    /// Play a row of the active browse list.
    async fn play_row(&self, row: &str) -> Result<()>;

    /// Front-panel illumination, 0..=3.
    async fn set_illumination(&self, level: u8) -> Result<()>;

    /// Send a raw browse primitive and wait up to `reply_timeout` for its reply.
    async fn send_command(&self, command: Command, reply_timeout: Duration) -> Result<()>;
}

/// Creates device handles. This is the entry point of a device library.
pub trait Connector: Send + Sync {
    /// Create an unconnected handle for `host`; call
    /// [`NaimDevice::startup`] to connect it.
    fn connect(&self, host: &str, on_update: StateCallback) -> Arc<dyn NaimDevice>;
}

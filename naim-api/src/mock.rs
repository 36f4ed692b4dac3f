//! In-memory device library for tests.
//!
//! [`MockConnector`] hands out [`MockDevice`]s that record every call and can
//! be told to fail in the ways a real speaker does: refusing the handshake,
//! failing commands, or having its background loop die.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::{ApiError, Command, Connector, NaimDevice, NaimState, Result, RunnerHandle, StateCallback, ViewState};

/// Failure switches shared by a connector and every device it creates.
#[derive(Debug, Default)]
struct Behavior {
    fail_startup: AtomicBool,
    fail_commands: AtomicBool,
    spawn_runner: AtomicBool,
    browse_polls: AtomicU32,
}

/// Connector that creates [`MockDevice`]s.
#[derive(Clone)]
pub struct MockConnector {
    behavior: Arc<Behavior>,
    initial_state: Arc<Mutex<NaimState>>,
    devices: Arc<Mutex<Vec<Arc<MockDevice>>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            behavior: Arc::new(Behavior::default()),
            initial_state: Arc::new(Mutex::new(NaimState::default())),
            devices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Devices created from now on start with `state`.
    pub fn with_state(self, state: NaimState) -> Self {
        *self.initial_state.lock().unwrap() = state;
        self
    }

    /// `startup` spawns a background runner that can be failed on demand.
    pub fn with_runner(self) -> Self {
        self.behavior.spawn_runner.store(true, Ordering::SeqCst);
        self
    }

    /// Number of `GETVIEWSTATE` polls before the view reports `BROWSE`.
    pub fn with_browse_polls(self, polls: u32) -> Self {
        self.behavior.browse_polls.store(polls, Ordering::SeqCst);
        self
    }

    pub fn set_fail_startup(&self, fail: bool) {
        self.behavior.fail_startup.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_commands(&self, fail: bool) {
        self.behavior.fail_commands.store(fail, Ordering::SeqCst);
    }

    /// How many handles have been created.
    pub fn connect_count(&self) -> usize {
        self.devices.lock().unwrap().len()
    }

    /// Every handle created so far, oldest first.
    pub fn devices(&self) -> Vec<Arc<MockDevice>> {
        self.devices.lock().unwrap().clone()
    }

    pub fn last_device(&self) -> Option<Arc<MockDevice>> {
        self.devices.lock().unwrap().last().cloned()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MockConnector {
    fn connect(&self, host: &str, on_update: StateCallback) -> Arc<dyn NaimDevice> {
        let device = Arc::new(MockDevice {
            host: host.to_string(),
            behavior: Arc::clone(&self.behavior),
            state: Mutex::new(self.initial_state.lock().unwrap().clone()),
            on_update,
            calls: Mutex::new(Vec::new()),
            commands: Mutex::new(VecDeque::new()),
            runner_tx: Mutex::new(None),
            polls_left: AtomicU32::new(0),
            started: AtomicBool::new(false),
            shutdown_count: AtomicU32::new(0),
        });
        self.devices.lock().unwrap().push(Arc::clone(&device));
        device
    }
}

/// A recorded, scriptable device handle.
pub struct MockDevice {
    host: String,
    behavior: Arc<Behavior>,
    state: Mutex<NaimState>,
    on_update: StateCallback,
    calls: Mutex<Vec<String>>,
    commands: Mutex<VecDeque<Command>>,
    runner_tx: Mutex<Option<oneshot::Sender<Result<()>>>>,
    polls_left: AtomicU32,
    started: AtomicBool,
    shutdown_count: AtomicU32,
}

impl MockDevice {
    /// Names of every call made on this handle, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Raw commands sent through `send_command`, in order.
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().iter().cloned().collect()
    }

    pub fn shutdown_count(&self) -> u32 {
        self.shutdown_count.load(Ordering::SeqCst)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Replace the state and push it through the update callback.
    pub fn push_state(&self, state: NaimState) {
        *self.state.lock().unwrap() = state.clone();
        (self.on_update)(state);
    }

    /// Make the background runner finish with `result`.
    pub fn finish_runner(&self, result: Result<()>) {
        if let Some(tx) = self.runner_tx.lock().unwrap().take() {
            let _ = tx.send(result);
        }
    }

    fn record(&self, call: impl Into<String>) -> Result<()> {
        self.calls.lock().unwrap().push(call.into());
        if !self.started.load(Ordering::SeqCst) {
            return Err(ApiError::NotConnected);
        }
        if self.behavior.fail_commands.load(Ordering::SeqCst) {
            return Err(ApiError::NetworkError("connection reset by peer".to_string()));
        }
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut NaimState)) {
        let mut state = self.state.lock().unwrap();
        f(&mut state);
    }
}

#[async_trait]
impl NaimDevice for MockDevice {
    fn host(&self) -> &str {
        &self.host
    }

    fn name(&self) -> String {
        format!("Mock Mu-so ({})", self.host)
    }

    fn state(&self) -> NaimState {
        self.state.lock().unwrap().clone()
    }

    async fn startup(&self, timeout: Duration) -> Result<Option<RunnerHandle>> {
        self.calls.lock().unwrap().push("startup".to_string());
        if self.behavior.fail_startup.load(Ordering::SeqCst) {
            return Err(ApiError::Timeout(timeout));
        }
        self.started.store(true, Ordering::SeqCst);

        if !self.behavior.spawn_runner.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let (tx, rx) = oneshot::channel();
        *self.runner_tx.lock().unwrap() = Some(tx);
        Ok(Some(tokio::spawn(async move { rx.await.unwrap_or(Ok(())) })))
    }

    async fn shutdown(&self) -> Result<()> {
        self.calls.lock().unwrap().push("shutdown".to_string());
        self.shutdown_count.fetch_add(1, Ordering::SeqCst);
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn update_data(&self) -> Result<()> {
        self.record("update_data")?;
        let state = self.state();
        (self.on_update)(state);
        Ok(())
    }

    async fn on(&self) -> Result<()> {
        self.record("on")?;
        self.update(|s| s.standby = Some(crate::StandbyState::Off));
        Ok(())
    }

    async fn off(&self) -> Result<()> {
        self.record("off")?;
        self.update(|s| s.standby = Some(crate::StandbyState::On));
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.record("play")
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause")
    }

    async fn stop(&self) -> Result<()> {
        self.record("stop")
    }

    async fn next_track(&self) -> Result<()> {
        self.record("next_track")
    }

    async fn previous_track(&self) -> Result<()> {
        self.record("previous_track")
    }

    async fn set_mute(&self, mute: bool) -> Result<()> {
        self.record(format!("set_mute:{}", mute))?;
        self.update(|s| s.muted = Some(mute));
        Ok(())
    }

    async fn volume_up(&self) -> Result<()> {
        self.record("volume_up")
    }

    async fn volume_down(&self) -> Result<()> {
        self.record("volume_down")
    }

    async fn set_volume(&self, volume: u8) -> Result<()> {
        self.record(format!("set_volume:{}", volume))?;
        if volume > 100 {
            return Err(ApiError::InvalidParameter(format!("volume {} out of range", volume)));
        }
        self.update(|s| s.volume = Some(volume));
        Ok(())
    }

    async fn select_input(&self, input: &str) -> Result<()> {
        self.record(format!("select_input:{}", input))?;
        self.update(|s| s.input = Some(input.to_string()));
        Ok(())
    }

    async fn select_preset(&self, preset: &str) -> Result<()> {
        self.record(format!("select_preset:{}", preset))
    }

    async fn select_row(&self, row: &str, _reply_timeout: Duration) -> Result<()> {
        self.record(format!("select_row:{}", row))
    }

    async fn play_row(&self, row: &str) -> Result<()> {
        self.record(format!("play_row:{}", row))
    }

    async fn set_illumination(&self, level: u8) -> Result<()> {
        self.record(format!("set_illumination:{}", level))?;
        self.update(|s| s.illumination = Some(level));
        Ok(())
    }

    async fn send_command(&self, command: Command, _reply_timeout: Duration) -> Result<()> {
        self.record(format!("send_command:{}", command.name()))?;
        self.commands.lock().unwrap().push_back(command.clone());

        match command {
            Command::SetViewStateBrowse => {
                let polls = self.behavior.browse_polls.load(Ordering::SeqCst);
                self.polls_left.store(polls, Ordering::SeqCst);
                self.update(|s| {
                    s.view_state = Some(ViewState {
                        state: Some(if polls == 0 { "BROWSE" } else { "HOME" }.to_string()),
                        phase: None,
                    })
                });
            }
            Command::NvmGetViewState => {
                let left = self.polls_left.load(Ordering::SeqCst);
                if left > 0 {
                    self.polls_left.store(left - 1, Ordering::SeqCst);
                }
                if left <= 1 {
                    self.update(|s| {
                        s.view_state = Some(ViewState {
                            state: Some("BROWSE".to_string()),
                            phase: None,
                        })
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> StateCallback {
        Arc::new(|_| {})
    }

    #[tokio::test]
    async fn test_commands_fail_before_startup() {
        let connector = MockConnector::new();
        let device = connector.connect("10.0.0.2", noop());
        assert_eq!(device.play().await, Err(ApiError::NotConnected));

        device.startup(Duration::from_secs(1)).await.unwrap();
        assert_eq!(device.play().await, Ok(()));
    }

    #[tokio::test]
    async fn test_runner_finishes_on_demand() {
        let connector = MockConnector::new().with_runner();
        let device = connector.connect("10.0.0.2", noop());
        let runner = device.startup(Duration::from_secs(1)).await.unwrap().unwrap();
        assert!(!runner.is_finished());

        connector
            .last_device()
            .unwrap()
            .finish_runner(Err(ApiError::NetworkError("reset".to_string())));
        let result = runner.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_data_invokes_callback() {
        let seen = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&seen);
        let callback: StateCallback = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let connector = MockConnector::new();
        let device = connector.connect("10.0.0.2", callback);
        device.startup(Duration::from_secs(1)).await.unwrap();
        device.update_data().await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}

//! Media player entity
//!
//! The mapping from a [`NaimState`] snapshot to what a media player shows is a
//! set of free functions, so it can be tested without a device. [`MediaPlayer`]
//! ties them to a coordinator and adds the commands.

use std::future::Future;
use std::ops::BitOr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use naim_api::{NaimDevice, NaimState, StandbyState};
use serde::Serialize;

use crate::coordinator::MusoCoordinator;
use crate::entity::DeviceInfo;
use crate::error::{MusoError, Result};
use crate::media_browser::{self, BrowseMedia};

/// Buffer fill below which the player counts as buffering, in percent.
const BUFFERING_THRESHOLD: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Off,
    On,
    Idle,
    Playing,
    Paused,
    Buffering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Channel,
    Track,
    Music,
}

/// Bit set of supported player features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportedFeatures(u32);

impl SupportedFeatures {
    pub const PAUSE: Self = Self(1);
    pub const SEEK: Self = Self(1 << 1);
    pub const VOLUME_SET: Self = Self(1 << 2);
    pub const VOLUME_MUTE: Self = Self(1 << 3);
    pub const PREVIOUS_TRACK: Self = Self(1 << 4);
    pub const NEXT_TRACK: Self = Self(1 << 5);
    pub const TURN_ON: Self = Self(1 << 7);
    pub const TURN_OFF: Self = Self(1 << 8);
    pub const PLAY_MEDIA: Self = Self(1 << 9);
    pub const VOLUME_STEP: Self = Self(1 << 10);
    pub const SELECT_SOURCE: Self = Self(1 << 11);
    pub const STOP: Self = Self(1 << 12);
    pub const PLAY: Self = Self(1 << 14);
    pub const BROWSE_MEDIA: Self = Self(1 << 17);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SupportedFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

pub fn available(connected: bool) -> bool {
    connected
}

/// Nothing is supported while disconnected.
pub fn supported_features(connected: bool) -> SupportedFeatures {
    if !connected {
        return SupportedFeatures::empty();
    }
    SupportedFeatures::TURN_ON
        | SupportedFeatures::TURN_OFF
        | SupportedFeatures::VOLUME_MUTE
        | SupportedFeatures::VOLUME_SET
        | SupportedFeatures::VOLUME_STEP
        | SupportedFeatures::SELECT_SOURCE
        | SupportedFeatures::BROWSE_MEDIA
        | SupportedFeatures::PLAY_MEDIA
        | SupportedFeatures::STOP
        | SupportedFeatures::PAUSE
        | SupportedFeatures::PLAY
        | SupportedFeatures::NEXT_TRACK
        | SupportedFeatures::PREVIOUS_TRACK
        | SupportedFeatures::SEEK
}

pub fn player_state(state: Option<&NaimState>) -> Option<PlayerState> {
    let state = state?;

    if state.standby == Some(StandbyState::On) {
        return Some(PlayerState::Off);
    }
    if state.buffer_state.is_some_and(|fill| fill < BUFFERING_THRESHOLD) {
        return Some(PlayerState::Buffering);
    }
    let view = state.view_state.as_ref();
    if view.and_then(|v| v.phase.as_deref()) == Some("PAUSE") {
        return Some(PlayerState::Paused);
    }
    if view.and_then(|v| v.state.as_deref()) == Some("PLAYING") {
        return Some(PlayerState::Playing);
    }
    if state.standby == Some(StandbyState::Off) {
        return Some(PlayerState::On);
    }
    Some(PlayerState::Idle)
}

/// 0.0..=1.0; a zero volume reads as unknown.
pub fn volume_level(state: &NaimState) -> Option<f32> {
    match state.volume {
        Some(volume) if volume > 0 => Some(f32::from(volume) / 100.0),
        _ => None,
    }
}

pub fn is_volume_muted(state: &NaimState) -> Option<bool> {
    state.muted
}

pub fn source(state: &NaimState) -> Option<&str> {
    state.input_name()
}

pub fn source_list(state: &NaimState) -> Vec<&str> {
    state.inputs.values().map(String::as_str).collect()
}

pub fn media_content_type(state: &NaimState) -> Option<MediaType> {
    match state.now_playing.source.as_deref()? {
        "iradio" => Some(MediaType::Channel),
        "spotify" | "tidal" | "upnp" => Some(MediaType::Track),
        _ => None,
    }
}

pub fn media_duration(state: &NaimState) -> Option<u32> {
    state.now_playing.duration
}

pub fn media_position(state: &NaimState) -> Option<u32> {
    state.now_playing.position
}

pub fn media_position_updated_at(state: &NaimState) -> Option<DateTime<Utc>> {
    state.now_playing.position_updated_at
}

pub fn media_image_url(state: &NaimState) -> Option<&str> {
    state.now_playing.image_url.as_deref()
}

pub fn media_image_remotely_accessible() -> bool {
    true
}

pub fn media_title(state: &NaimState) -> Option<&str> {
    state.now_playing.title.as_deref()
}

pub fn media_artist(state: &NaimState) -> Option<&str> {
    state.now_playing.artist.as_deref()
}

pub fn media_album_name(state: &NaimState) -> Option<&str> {
    state.now_playing.album.as_deref()
}

/// The speaker as a media player.
pub struct MediaPlayer {
    coordinator: Arc<MusoCoordinator>,
}

impl MediaPlayer {
    pub fn new(coordinator: Arc<MusoCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn unique_id(&self) -> &str {
        self.coordinator.unique_id()
    }

    pub fn name(&self) -> &str {
        self.coordinator.title()
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.coordinator.device_info()
    }

    /// Latest snapshot.
    pub fn data(&self) -> Option<NaimState> {
        self.coordinator.data()
    }

    pub async fn available(&self) -> bool {
        available(self.coordinator.available().await)
    }

    pub async fn supported_features(&self) -> SupportedFeatures {
        supported_features(self.coordinator.available().await)
    }

    pub fn state(&self) -> Option<PlayerState> {
        player_state(self.data().as_ref())
    }

    pub async fn turn_on(&self) -> Result<()> {
        self.run("turn_on", |device| async move { device.on().await }).await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.run("turn_off", |device| async move { device.off().await }).await
    }

    pub async fn media_stop(&self) -> Result<()> {
        self.run("media_stop", |device| async move { device.stop().await }).await
    }

    pub async fn media_pause(&self) -> Result<()> {
        self.run("media_pause", |device| async move { device.pause().await }).await
    }

    pub async fn media_play(&self) -> Result<()> {
        self.run("media_play", |device| async move { device.play().await }).await
    }

    pub async fn media_next_track(&self) -> Result<()> {
        self.run("media_next_track", |device| async move { device.next_track().await })
            .await
    }

    pub async fn media_previous_track(&self) -> Result<()> {
        self.run("media_previous_track", |device| async move {
            device.previous_track().await
        })
        .await
    }

    pub async fn mute_volume(&self, mute: bool) -> Result<()> {
        self.run("mute_volume", move |device| async move { device.set_mute(mute).await })
            .await
    }

    pub async fn volume_up(&self) -> Result<()> {
        self.run("volume_up", |device| async move { device.volume_up().await }).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        self.run("volume_down", |device| async move { device.volume_down().await }).await
    }

    /// `level` is 0.0..=1.0.
    pub async fn set_volume_level(&self, level: f32) -> Result<()> {
        let volume = (100.0 * level.clamp(0.0, 1.0)) as u8;
        self.run("set_volume_level", move |device| async move {
            device.set_volume(volume).await
        })
        .await
    }

    /// Select an input by its display name.
    pub async fn select_source(&self, source: &str) -> Result<()> {
        let input = self
            .data()
            .and_then(|state| state.input_id(source).map(str::to_string))
            .ok_or_else(|| MusoError::UnknownSource(source.to_string()))?;

        self.run("select_source", move |device| async move {
            device.select_input(&input).await
        })
        .await
    }

    pub async fn browse_media(&self, media_content_id: Option<&str>) -> Result<Option<BrowseMedia>> {
        media_browser::browse_media(&self.coordinator, media_content_id).await
    }

    pub async fn play_media(&self, media_id: &str) -> Result<()> {
        media_browser::play_media(&self.coordinator, media_id).await
    }

    /// Execute a command, then publish what the device now reports.
    async fn run<F, Fut>(&self, operation: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(Arc<dyn NaimDevice>) -> Fut,
        Fut: Future<Output = naim_api::Result<()>>,
    {
        let state = self
            .coordinator
            .execute(operation, |device| async move {
                f(Arc::clone(&device)).await?;
                Ok(device.state())
            })
            .await?;
        self.coordinator.publish(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{coordinator, playing_state};
    use naim_api::mock::MockConnector;
    use naim_api::ViewState;
    use rstest::rstest;

    fn view(state: Option<&str>, phase: Option<&str>) -> Option<ViewState> {
        Some(ViewState {
            state: state.map(str::to_string),
            phase: phase.map(str::to_string),
        })
    }

    #[rstest]
    #[case(Some(StandbyState::On), Some(5), view(Some("PLAYING"), None), PlayerState::Off)]
    #[case(Some(StandbyState::Off), Some(5), view(Some("PLAYING"), None), PlayerState::Buffering)]
    #[case(Some(StandbyState::Off), Some(100), view(Some("PLAYING"), Some("PAUSE")), PlayerState::Paused)]
    #[case(Some(StandbyState::Off), Some(100), view(Some("PLAYING"), Some("PLAY")), PlayerState::Playing)]
    #[case(Some(StandbyState::Off), None, view(Some("HOME"), None), PlayerState::On)]
    #[case(None, None, None, PlayerState::Idle)]
    fn test_player_state(
        #[case] standby: Option<StandbyState>,
        #[case] buffer_state: Option<u8>,
        #[case] view_state: Option<ViewState>,
        #[case] expected: PlayerState,
    ) {
        let state = NaimState {
            standby,
            buffer_state,
            view_state,
            ..NaimState::default()
        };
        assert_eq!(player_state(Some(&state)), Some(expected));
    }

    #[test]
    fn test_no_snapshot_has_no_state() {
        assert_eq!(player_state(None), None);
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(0), None)]
    #[case(Some(35), Some(0.35))]
    #[case(Some(100), Some(1.0))]
    fn test_volume_level(#[case] volume: Option<u8>, #[case] expected: Option<f32>) {
        let state = NaimState {
            volume,
            ..NaimState::default()
        };
        assert_eq!(volume_level(&state), expected);
    }

    #[rstest]
    #[case("iradio", Some(MediaType::Channel))]
    #[case("spotify", Some(MediaType::Track))]
    #[case("tidal", Some(MediaType::Track))]
    #[case("upnp", Some(MediaType::Track))]
    #[case("analog", None)]
    fn test_media_content_type(#[case] source: &str, #[case] expected: Option<MediaType>) {
        let mut state = NaimState::default();
        state.now_playing.source = Some(source.to_string());
        assert_eq!(media_content_type(&state), expected);
    }

    #[test]
    fn test_sources_and_metadata() {
        let state = playing_state();
        assert_eq!(source(&state), Some("iRadio"));
        assert_eq!(source_list(&state), vec!["iRadio", "Spotify"]);
        assert_eq!(media_title(&state), Some("Morning Show"));
        assert_eq!(media_artist(&state), None);
        assert!(media_image_remotely_accessible());
    }

    #[test]
    fn test_supported_features() {
        assert!(supported_features(false).is_empty());
        let features = supported_features(true);
        assert!(features.contains(SupportedFeatures::BROWSE_MEDIA | SupportedFeatures::VOLUME_SET));
        assert!(features.contains(SupportedFeatures::SEEK));
    }

    #[tokio::test]
    async fn test_commands_reach_device_and_publish() {
        let connector = MockConnector::new().with_state(playing_state());
        let player = MediaPlayer::new(coordinator(&connector));

        player.set_volume_level(0.5).await.unwrap();
        player.mute_volume(true).await.unwrap();
        player.select_source("Spotify").await.unwrap();

        let device = connector.last_device().unwrap();
        let calls = device.calls();
        assert!(calls.contains(&"set_volume:50".to_string()));
        assert!(calls.contains(&"set_mute:true".to_string()));
        assert!(calls.contains(&"select_input:2".to_string()));

        let data = player.data().unwrap();
        assert_eq!(data.volume, Some(50));
        assert_eq!(data.muted, Some(true));
        assert_eq!(source(&data), Some("Spotify"));
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let connector = MockConnector::new().with_state(playing_state());
        let coordinator = coordinator(&connector);
        coordinator.first_refresh().await.unwrap();
        let player = MediaPlayer::new(coordinator);

        let err = player.select_source("Vinyl").await.unwrap_err();
        assert!(matches!(err, MusoError::UnknownSource(ref name) if name == "Vinyl"));
    }

    #[tokio::test]
    async fn test_unavailable_without_device() {
        let connector = MockConnector::new();
        connector.set_fail_startup(true);
        let player = MediaPlayer::new(coordinator(&connector));

        assert!(!player.available().await);
        assert!(player.supported_features().await.is_empty());
        assert!(matches!(player.media_play().await, Err(MusoError::NotConnected)));
    }
}

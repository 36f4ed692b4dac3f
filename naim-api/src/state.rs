//! Typed state snapshot of a Naim device.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standby flag as reported by the device.
///
/// `On` means standby is engaged, i.e. the speaker is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StandbyState {
    On,
    Off,
}

/// Front-panel view state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// e.g. `PLAYING`, `BROWSE`, `HOME`
    pub state: Option<String>,
    /// e.g. `PLAY`, `PAUSE`
    pub phase: Option<String>,
}

/// Metadata of what is currently playing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    /// Source kind, e.g. `iradio`, `spotify`, `tidal`, `upnp`
    pub source: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub image_url: Option<String>,
    /// Track length in seconds
    pub duration: Option<u32>,
    /// Playback position in seconds
    pub position: Option<u32>,
    /// When `position` was last reported
    pub position_updated_at: Option<DateTime<Utc>>,
}

/// Header of the list currently shown by the device's browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveList {
    /// 0 at the top level
    pub depth: u32,
    pub title: String,
    pub list_handle: u32,
    /// Number of rows in the list
    pub count: u32,
}

/// One row of the active browse list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseRow {
    /// 1-based row index within the list
    pub index: u32,
    pub text: String,
    /// Row can be played directly
    pub play: bool,
    /// Row opens a sub-list
    pub browse: bool,
    pub album_art_url: Option<String>,
}

/// Everything the device library knows about the speaker at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NaimState {
    pub standby: Option<StandbyState>,
    /// 0..=100
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    /// Key into `inputs` of the selected input
    pub input: Option<String>,
    /// Input id -> display name
    pub inputs: BTreeMap<String, String>,
    /// Preset id -> display name
    pub presets: BTreeMap<String, String>,
    /// Stream buffer fill, in percent
    pub buffer_state: Option<u8>,
    pub view_state: Option<ViewState>,
    pub now_playing: NowPlaying,
    /// Temperature sensor name -> degrees Celsius
    pub unit_temperatures: BTreeMap<String, f64>,
    /// Supply rail name -> millivolts
    pub voltages: BTreeMap<String, f64>,
    /// Front-panel illumination, 0 (off) to 3
    pub illumination: Option<u8>,
    pub active_list: Option<ActiveList>,
    pub rows: Vec<BrowseRow>,
}

impl NaimState {
    /// Display name of the selected input.
    pub fn input_name(&self) -> Option<&str> {
        let input = self.input.as_ref()?;
        self.inputs.get(input).map(String::as_str)
    }

    /// Input id whose display name is `name`.
    pub fn input_id(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(_, display)| display.as_str() == name)
            .map(|(id, _)| id.as_str())
    }

    /// Whether the view state reports `state`.
    pub fn view_state_is(&self, state: &str) -> bool {
        self.view_state
            .as_ref()
            .and_then(|view| view.state.as_deref())
            == Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_inputs() -> NaimState {
        let mut state = NaimState::default();
        state.inputs.insert("1".to_string(), "iRadio".to_string());
        state.inputs.insert("2".to_string(), "Spotify".to_string());
        state.input = Some("2".to_string());
        state
    }

    #[test]
    fn test_input_lookup() {
        let state = with_inputs();
        assert_eq!(state.input_name(), Some("Spotify"));
        assert_eq!(state.input_id("iRadio"), Some("1"));
        assert_eq!(state.input_id("Vinyl"), None);
    }

    #[test]
    fn test_view_state_is() {
        let mut state = NaimState::default();
        assert!(!state.view_state_is("BROWSE"));
        state.view_state = Some(ViewState {
            state: Some("BROWSE".to_string()),
            phase: None,
        });
        assert!(state.view_state_is("BROWSE"));
    }

    #[test]
    fn test_standby_serde_uppercase() {
        let json = serde_json::to_string(&StandbyState::On).unwrap();
        assert_eq!(json, "\"ON\"");
        let parsed: StandbyState = serde_json::from_str("\"OFF\"").unwrap();
        assert_eq!(parsed, StandbyState::Off);
    }
}

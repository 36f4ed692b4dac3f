//! Media browsing
//!
//! Content ids are two-level paths:
//!
//! | id              | meaning                               |
//! |-----------------|---------------------------------------|
//! | `root`, none    | favourites: presets plus "Browse"     |
//! | `radio/<id>`    | a preset                              |
//! | `browse`        | the device's current browse list      |
//! | `browse/up`     | the parent of the current list        |
//! | `browse/<row>`  | a row of the current list             |
//!
//! Browsing drives the speaker's own front-panel browser, so every step is a
//! round trip: switch the view to browse mode, wait until the device reports
//! it, then read the active list and its rows.

use std::time::Duration;

use naim_api::{ActiveList, BrowseRow, Command, NaimDevice, NaimState};
use serde::Serialize;
use tracing::debug;

use crate::config::CoordinatorConfig;
use crate::coordinator::MusoCoordinator;
use crate::error::{MusoError, Result};
use crate::media_player::MediaType;

const ROOT_ID: &str = "root";
const PRESETS_ID: &str = "presets";
const BROWSE_ID: &str = "browse";
const BROWSE_UP_ID: &str = "browse/up";

/// A parsed content id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPath<'a> {
    Root,
    Radio(&'a str),
    Browse,
    BrowseUp,
    BrowseRow(&'a str),
}

impl<'a> MediaPath<'a> {
    /// `None` for ids outside the known categories.
    pub fn parse(id: Option<&'a str>) -> Option<Self> {
        let id = match id {
            None | Some(ROOT_ID) | Some(PRESETS_ID) => return Some(MediaPath::Root),
            Some(id) => id,
        };

        let Some((category, rest)) = id.split_once('/') else {
            return (id == BROWSE_ID).then_some(MediaPath::Browse);
        };
        if rest.is_empty() {
            return None;
        }
        match category {
            "radio" => Some(MediaPath::Radio(rest)),
            BROWSE_ID if rest == "up" => Some(MediaPath::BrowseUp),
            BROWSE_ID => Some(MediaPath::BrowseRow(rest)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    Directory,
    Channel,
    Track,
}

/// One node of the browse tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseMedia {
    pub title: String,
    pub media_class: MediaClass,
    pub media_content_id: String,
    pub media_content_type: MediaType,
    pub can_play: bool,
    pub can_expand: bool,
    pub thumbnail: Option<String>,
    pub children_media_class: Option<MediaClass>,
    pub children: Vec<BrowseMedia>,
}

impl BrowseMedia {
    fn directory(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            media_class: MediaClass::Directory,
            media_content_id: id.into(),
            media_content_type: MediaType::Music,
            can_play: false,
            can_expand: true,
            thumbnail: None,
            children_media_class: None,
            children: Vec::new(),
        }
    }

    fn channel(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            media_class: MediaClass::Channel,
            media_content_id: id.into(),
            media_content_type: MediaType::Channel,
            can_play: true,
            can_expand: false,
            thumbnail: None,
            children_media_class: None,
            children: Vec::new(),
        }
    }
}

/// Browse the node `media_content_id`; `None` for unknown ids and leaves.
pub async fn browse_media(
    coordinator: &MusoCoordinator,
    media_content_id: Option<&str>,
) -> Result<Option<BrowseMedia>> {
    let Some(path) = MediaPath::parse(media_content_id) else {
        debug!("Unknown browse category: {:?}", media_content_id);
        return Ok(None);
    };

    let navigation = match path {
        MediaPath::Root => {
            let state = coordinator.data().unwrap_or_default();
            return Ok(Some(favourites(&state)));
        }
        MediaPath::Radio(_) => return Ok(None),
        MediaPath::Browse => None,
        MediaPath::BrowseUp => Some(Navigation::Parent),
        MediaPath::BrowseRow(row) => Some(Navigation::Row(row.to_string())),
    };

    let config = coordinator.config().clone();
    let browse_timeout = config.browse_timeout;
    let browsing = coordinator.execute("browse_media", move |device| async move {
        if let Some(navigation) = navigation {
            navigation.send(device.as_ref(), config.reply_timeout).await?;
        }
        initiate_browsing(device.as_ref(), &config).await?;
        Ok(device.state())
    });
    let state = tokio::time::timeout(browse_timeout, browsing)
        .await
        .map_err(|_| MusoError::BrowseTimeout(browse_timeout))??;
    coordinator.publish(state.clone());

    let show_all = coordinator.entry().options.browse_unfiltered;
    Ok(Some(browse_list(state.active_list.as_ref(), &state.rows, show_all)))
}

/// Play `media_id`: a preset or a row of the current browse list.
pub async fn play_media(coordinator: &MusoCoordinator, media_id: &str) -> Result<()> {
    match MediaPath::parse(Some(media_id)) {
        Some(MediaPath::Radio(preset)) => {
            let preset = preset.to_string();
            coordinator
                .execute("play_media", |device| async move {
                    device.select_preset(&preset).await
                })
                .await
        }
        Some(MediaPath::BrowseRow(row)) => {
            let row = row.to_string();
            coordinator
                .execute("play_media", |device| async move { device.play_row(&row).await })
                .await
        }
        _ => Err(MusoError::InvalidMediaId(media_id.to_string())),
    }
}

enum Navigation {
    Parent,
    Row(String),
}

impl Navigation {
    async fn send(&self, device: &dyn NaimDevice, reply_timeout: Duration) -> naim_api::Result<()> {
        match self {
            Navigation::Parent => device.send_command(Command::BrowseParent, reply_timeout).await,
            Navigation::Row(row) => device.select_row(row, reply_timeout).await,
        }
    }
}

/// Put the device in browse mode and load the active list with its rows.
pub async fn initiate_browsing(device: &dyn NaimDevice, config: &CoordinatorConfig) -> naim_api::Result<()> {
    let reply_timeout = config.reply_timeout;

    device.send_command(Command::SetViewStateBrowse, reply_timeout).await?;
    device.send_command(Command::NvmGetViewState, reply_timeout).await?;

    let mut delay = config.view_state_poll_initial;
    while !device.state().view_state_is("BROWSE") {
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(config.view_state_poll_max);
        device.send_command(Command::NvmGetViewState, reply_timeout).await?;
    }

    tokio::time::sleep(config.browse_settle_delay).await;
    device.send_command(Command::GetViewState, reply_timeout).await?;
    device.send_command(Command::GetActiveList, reply_timeout).await?;

    if let Some(list) = device.state().active_list.filter(|list| list.count > 0) {
        let rows = Command::GetRows {
            list_handle: list.list_handle,
            from: 1,
            to: list.count,
        };
        device.send_command(rows, reply_timeout).await?;
    }
    Ok(())
}

fn favourites(state: &NaimState) -> BrowseMedia {
    let mut children: Vec<BrowseMedia> = state
        .presets
        .iter()
        .map(|(id, name)| BrowseMedia::channel(name, format!("radio/{}", id)))
        .collect();
    children.push(BrowseMedia::directory("Browse", BROWSE_ID));

    BrowseMedia {
        children,
        ..BrowseMedia::directory("Favourites", PRESETS_ID)
    }
}

fn browse_list(list: Option<&ActiveList>, rows: &[BrowseRow], show_all: bool) -> BrowseMedia {
    let mut children = Vec::new();
    if list.is_some_and(|list| list.depth > 0) {
        children.push(BrowseMedia::directory("Back", BROWSE_UP_ID));
    }
    children.extend(rows.iter().filter_map(|row| row_to_media(row, show_all)));

    let title = list
        .map(|list| list.title.as_str())
        .filter(|title| !title.is_empty())
        .unwrap_or("Browse");
    BrowseMedia {
        children,
        children_media_class: Some(MediaClass::Directory),
        ..BrowseMedia::directory(title, BROWSE_ID)
    }
}

/// Rows that neither play nor browse only show up when `show_all` is set.
pub fn row_to_media(row: &BrowseRow, show_all: bool) -> Option<BrowseMedia> {
    let id = format!("browse/{}", row.index);
    let mut media = if row.play {
        BrowseMedia {
            can_expand: row.browse,
            ..BrowseMedia::channel(&row.text, id)
        }
    } else if row.browse {
        BrowseMedia::directory(&row.text, id)
    } else if show_all {
        BrowseMedia {
            media_class: MediaClass::Track,
            media_content_type: MediaType::Track,
            can_play: false,
            can_expand: false,
            ..BrowseMedia::channel(&row.text, id)
        }
    } else {
        return None;
    };
    media.thumbnail = row.album_art_url.clone();
    Some(media)
}

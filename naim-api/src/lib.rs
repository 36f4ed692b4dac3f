//! Typed control contract for Naim Mu-so streamers
//!
//! This crate describes what a Naim device-control library must offer to the
//! rest of the workspace: a [`Connector`] that creates a device handle for a
//! host, and the [`NaimDevice`] trait that handle implements. State is read
//! through the typed [`NaimState`] snapshot.
//!
//! The wire protocol lives in the implementation behind these traits; nothing
//! here speaks to the network.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use naim_api::{Connector, NaimDevice, StateCallback};
//!
//! let on_update: StateCallback = Arc::new(|state| println!("volume {:?}", state.volume));
//! let device = connector.connect("192.168.1.40", on_update);
//! let runner = device.startup(Duration::from_secs(10)).await?;
//! device.set_volume(30).await?;
//! device.shutdown().await?;
//! ```

pub mod command;
pub mod device;
pub mod error;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use command::Command;
pub use device::{Connector, NaimDevice, RunnerHandle, StateCallback};
pub use error::{ApiError, Result};
pub use state::{
    ActiveList, BrowseRow, NaimState, NowPlaying, StandbyState, ViewState,
};

//! Front-panel illumination as a dimmable light.
//!
//! The device knows levels 0 (off) to 3; the light exposes 1..=255.

use std::sync::Arc;

use crate::coordinator::MusoCoordinator;
use crate::entity::{self, DeviceInfo, EntityCategory};
use crate::error::Result;

/// Device levels mapped onto brightness.
pub const BRIGHTNESS_SCALE: (u8, u8) = (1, 3);

const TRANSLATION_KEY: &str = "illum";

/// 1 -> 85, 2 -> 170, 3 -> 255; clamped to 1..=255.
pub fn value_to_brightness(value: u8) -> u8 {
    let (low, high) = BRIGHTNESS_SCALE;
    let span = u32::from(high - low + 1);
    let offset = u32::from(low) - 1;
    let brightness = (u32::from(value).saturating_sub(offset) * 255) / span;
    brightness.clamp(1, 255) as u8
}

/// Smallest level whose brightness is at least `brightness`.
pub fn brightness_to_value(brightness: u8) -> u8 {
    let (low, high) = BRIGHTNESS_SCALE;
    let span = u32::from(high - low + 1);
    let offset = u32::from(low) - 1;
    let value = (u32::from(brightness) * span).div_ceil(255) + offset;
    value as u8
}

pub struct Light {
    coordinator: Arc<MusoCoordinator>,
}

impl Light {
    pub fn new(coordinator: Arc<MusoCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn unique_id(&self) -> String {
        entity::unique_id(self.coordinator.unique_id(), TRANSLATION_KEY)
    }

    pub fn translation_key(&self) -> &'static str {
        TRANSLATION_KEY
    }

    pub fn entity_category(&self) -> EntityCategory {
        EntityCategory::Config
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.coordinator.device_info()
    }

    fn illumination(&self) -> Option<u8> {
        self.coordinator.data()?.illumination
    }

    pub fn is_on(&self) -> Option<bool> {
        self.illumination().map(|level| level > 0)
    }

    pub fn brightness(&self) -> Option<u8> {
        self.illumination().map(value_to_brightness)
    }

    /// Full illumination without a brightness.
    pub async fn turn_on(&self, brightness: Option<u8>) -> Result<()> {
        let level = brightness.map_or(BRIGHTNESS_SCALE.1, brightness_to_value);
        self.set_level(level).await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.set_level(0).await
    }

    async fn set_level(&self, level: u8) -> Result<()> {
        let state = self
            .coordinator
            .execute("set_illumination", |device| async move {
                device.set_illumination(level).await?;
                Ok(device.state())
            })
            .await?;
        self.coordinator.publish(state);
        Ok(())
    }
}

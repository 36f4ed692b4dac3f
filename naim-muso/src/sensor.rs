//! Diagnostic sensors for the speaker's temperatures and supply rails.

use std::sync::Arc;

use naim_api::NaimState;
use serde::Serialize;

use crate::coordinator::MusoCoordinator;
use crate::entity::{self, DeviceInfo, EntityCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SensorKind {
    Temperature,
    Voltage,
}

impl SensorKind {
    pub fn unit(self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Voltage => "mV",
        }
    }
}

/// Static description of one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    /// Parameter name as reported by the device
    pub key: &'static str,
    pub kind: SensorKind,
}

pub const SENSORS: [SensorDescription; 8] = [
    SensorDescription { key: "Psu", kind: SensorKind::Temperature },
    SensorDescription { key: "MAIN", kind: SensorKind::Temperature },
    SensorDescription { key: "1V2", kind: SensorKind::Voltage },
    SensorDescription { key: "1V9", kind: SensorKind::Voltage },
    SensorDescription { key: "3V3", kind: SensorKind::Voltage },
    SensorDescription { key: "5V", kind: SensorKind::Voltage },
    SensorDescription { key: "1V85", kind: SensorKind::Voltage },
    SensorDescription { key: "36V", kind: SensorKind::Voltage },
];

impl SensorDescription {
    /// Reading from the matching table of `state`.
    pub fn native_value(&self, state: &NaimState) -> Option<f64> {
        let table = match self.kind {
            SensorKind::Temperature => &state.unit_temperatures,
            SensorKind::Voltage => &state.voltages,
        };
        table.get(self.key).copied()
    }
}

pub struct Sensor {
    coordinator: Arc<MusoCoordinator>,
    description: SensorDescription,
}

impl Sensor {
    pub fn new(coordinator: Arc<MusoCoordinator>, description: SensorDescription) -> Self {
        Self { coordinator, description }
    }

    /// One sensor per entry of [`SENSORS`].
    pub fn all(coordinator: &Arc<MusoCoordinator>) -> Vec<Sensor> {
        SENSORS
            .iter()
            .map(|description| Sensor::new(Arc::clone(coordinator), *description))
            .collect()
    }

    pub fn unique_id(&self) -> String {
        entity::unique_id(self.coordinator.unique_id(), self.description.key)
    }

    pub fn name(&self) -> &'static str {
        self.description.key
    }

    pub fn description(&self) -> &SensorDescription {
        &self.description
    }

    pub fn unit_of_measurement(&self) -> &'static str {
        self.description.kind.unit()
    }

    /// Readings are whole numbers.
    pub fn suggested_display_precision(&self) -> u8 {
        0
    }

    pub fn entity_category(&self) -> EntityCategory {
        EntityCategory::Diagnostic
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.coordinator.device_info()
    }

    pub fn native_value(&self) -> Option<f64> {
        self.description.native_value(&self.coordinator.data()?)
    }
}

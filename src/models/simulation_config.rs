use crate::error::{Result, TrafficError};
use serde::{Deserialize, Serialize};

/// Parameters of the built-in traffic simulation: the bounding area vehicles
/// drive in, fleet size, speed range and tick interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub area_lng_min: f64,
    pub area_lng_max: f64,
    pub area_lat_min: f64,
    pub area_lat_max: f64,
    pub vehicle_count: u32,
    pub speed_min: f64,
    pub speed_max: f64,
    #[serde(rename = "intervalMS")]
    pub interval_ms: u64,
    #[serde(default)]
    pub is_active: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            id: None,
            name: "city-centre".to_string(),
            area_lng_min: 116.30,
            area_lng_max: 116.50,
            area_lat_min: 39.85,
            area_lat_max: 39.99,
            vehicle_count: 20,
            speed_min: 10.0,
            speed_max: 120.0,
            interval_ms: 1000,
            is_active: false,
        }
    }
}

impl SimulationConfig {
    pub const MIN_INTERVAL_MS: u64 = 100;

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TrafficError::Validation(
                "Simulation name cannot be empty".into(),
            ));
        }
        if !(self.area_lng_min < self.area_lng_max) || !(self.area_lat_min < self.area_lat_max) {
            return Err(TrafficError::Validation(
                "Simulation area minimum must be below its maximum".into(),
            ));
        }
        if self.area_lng_min < -180.0
            || self.area_lng_max > 180.0
            || self.area_lat_min < -90.0
            || self.area_lat_max > 90.0
        {
            return Err(TrafficError::Validation(
                "Simulation area is outside valid coordinates".into(),
            ));
        }
        if self.vehicle_count == 0 {
            return Err(TrafficError::Validation(
                "Simulation needs at least one vehicle".into(),
            ));
        }
        if self.speed_min < 0.0 || self.speed_min > self.speed_max {
            return Err(TrafficError::Validation(
                "Speed range must be non-negative and ordered".into(),
            ));
        }
        if self.interval_ms < Self::MIN_INTERVAL_MS {
            return Err(TrafficError::Validation(format!(
                "Simulation interval must be at least {} ms",
                Self::MIN_INTERVAL_MS
            )));
        }
        Ok(())
    }

    /// Centre of the simulation area as (longitude, latitude).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.area_lng_min + self.area_lng_max) / 2.0,
            (self.area_lat_min + self.area_lat_max) / 2.0,
        )
    }

    /// Point at the given fractions of the area's width and height.
    pub fn point_at(&self, fx: f64, fy: f64) -> (f64, f64) {
        (
            self.area_lng_min + (self.area_lng_max - self.area_lng_min) * fx,
            self.area_lat_min + (self.area_lat_max - self.area_lat_min) * fy,
        )
    }
}

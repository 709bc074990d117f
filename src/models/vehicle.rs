use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle classes reported by GPS devices and used by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Car,
    Bus,
    Truck,
}

impl VehicleType {
    pub const ALL: [VehicleType; 3] = [VehicleType::Car, VehicleType::Bus, VehicleType::Truck];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "car",
            VehicleType::Bus => "bus",
            VehicleType::Truck => "truck",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driving state derived from the current speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    #[default]
    Normal,
    Overspeed,
    Slow,
}

impl VehicleStatus {
    /// `overspeed` above 80 km/h, `slow` below 20 km/h.
    pub fn from_speed(speed: f64) -> Self {
        use crate::global_variables::{OVERSPEED_STATUS_KMH, SLOW_STATUS_KMH};
        if speed > OVERSPEED_STATUS_KMH {
            VehicleStatus::Overspeed
        } else if speed < SLOW_STATUS_KMH {
            VehicleStatus::Slow
        } else {
            VehicleStatus::Normal
        }
    }
}

/// A member of the simulated fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: u64,
    pub vehicle_id: String,
    pub longitude: f64,
    pub latitude: f64,
    /// km/h
    pub speed: f64,
    /// Heading in degrees, 0 = north, clockwise.
    pub direction: f64,
    pub vehicle_type: VehicleType,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for adding a vehicle to the fleet. Missing coordinates are
/// placed at the centre of the simulation area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleParams {
    pub vehicle_id: String,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub direction: f64,
    #[serde(default)]
    pub vehicle_type: VehicleType,
}

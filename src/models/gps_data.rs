use crate::models::vehicle::VehicleType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single positional and kinematic sample for one vehicle at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub vehicle_id: String,
    pub longitude: f64,
    pub latitude: f64,
    /// km/h
    pub speed: f64,
    /// Heading in degrees.
    pub direction: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_segment_id: Option<u64>,
    pub vehicle_type: VehicleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl GpsData {
    /// (longitude, latitude)
    pub fn location(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }

    pub fn is_speeding(&self, max_speed: u32) -> bool {
        self.speed > f64::from(max_speed)
    }
}

/// Request body of `POST /api/gps`: a sample without backend-assigned fields.
/// A missing timestamp is filled with the ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsDataParams {
    pub vehicle_id: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub direction: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub road_segment_id: Option<u64>,
    #[serde(default)]
    pub vehicle_type: VehicleType,
}

impl GpsDataParams {
    pub fn into_record(self, timestamp: DateTime<Utc>) -> GpsData {
        GpsData {
            id: None,
            vehicle_id: self.vehicle_id,
            longitude: self.longitude,
            latitude: self.latitude,
            speed: self.speed,
            direction: self.direction,
            timestamp: self.timestamp.unwrap_or(timestamp),
            road_segment_id: self.road_segment_id,
            vehicle_type: self.vehicle_type,
            created_at: None,
        }
    }
}

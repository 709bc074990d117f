use crate::geo;
use crate::global_variables::{DEFAULT_CAPACITY, DEFAULT_MAX_SPEED};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadType {
    Highway,
    #[default]
    Urban,
    Rural,
}

impl fmt::Display for RoadType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            RoadType::Highway => "highway",
            RoadType::Urban => "urban",
            RoadType::Rural => "rural",
        })
    }
}

/// A modeled stretch of roadway between two coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub start_lng: f64,
    pub start_lat: f64,
    pub end_lng: f64,
    pub end_lat: f64,
    /// Speed limit in km/h.
    pub max_speed: u32,
    /// Vehicles the segment holds before it is saturated.
    pub capacity: u32,
    /// Length in km, when surveyed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    pub road_type: RoadType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RoadSegment {
    /// Midpoint as (longitude, latitude).
    pub fn center_point(&self) -> (f64, f64) {
        (
            (self.start_lng + self.end_lng) / 2.0,
            (self.start_lat + self.end_lat) / 2.0,
        )
    }

    /// Surveyed length when known, great-circle distance between the endpoints otherwise.
    pub fn length_km(&self) -> f64 {
        match self.length {
            Some(length) if length > 0.0 => length,
            _ => geo::haversine_km(self.start_lng, self.start_lat, self.end_lng, self.end_lat),
        }
    }

    /// Whether the point lies inside the segment's bounding box.
    pub fn contains_point(&self, lng: f64, lat: f64) -> bool {
        let (min_lng, max_lng) = (self.start_lng.min(self.end_lng), self.start_lng.max(self.end_lng));
        let (min_lat, max_lat) = (self.start_lat.min(self.end_lat), self.start_lat.max(self.end_lat));
        lng >= min_lng && lng <= max_lng && lat >= min_lat && lat <= max_lat
    }
}

fn default_max_speed() -> u32 {
    DEFAULT_MAX_SPEED
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

/// A road found around a position, as answered by `GET /api/roads/nearby`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRoad {
    #[serde(flatten)]
    pub road: RoadSegment,
    /// Distance from the position to the segment.
    pub distance_km: f64,
    /// Heading from start to end, degrees.
    pub direction: f64,
    /// Close enough to the segment for a sample there to be matched to it.
    pub on_road: bool,
    /// Inside the segment's bounding box.
    pub within_bounds: bool,
    pub length_km: f64,
    pub center_lng: f64,
    pub center_lat: f64,
}

/// Request body for creating or updating a road.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadSegmentParams {
    pub name: String,
    pub start_lng: f64,
    pub start_lat: f64,
    pub end_lng: f64,
    pub end_lat: f64,
    #[serde(default = "default_max_speed")]
    pub max_speed: u32,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub road_type: RoadType,
}

impl From<RoadSegmentParams> for RoadSegment {
    fn from(params: RoadSegmentParams) -> Self {
        RoadSegment {
            id: None,
            name: params.name,
            start_lng: params.start_lng,
            start_lat: params.start_lat,
            end_lng: params.end_lng,
            end_lat: params.end_lat,
            max_speed: params.max_speed,
            capacity: params.capacity,
            length: params.length,
            road_type: params.road_type,
            created_at: None,
            updated_at: None,
        }
    }
}

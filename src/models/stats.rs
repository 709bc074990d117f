// src/models/stats.rs

use crate::models::simulation_config::SimulationConfig;
use serde::{Deserialize, Serialize};

/// Aggregate snapshot shown on the dashboard header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeStats {
    pub total_vehicles: usize,
    pub average_speed: f64,
    /// Mean congestion score of the roads with recent traffic, 0..1.
    pub congestion_level: f64,
    pub active_alerts: usize,
}

/// Real-time stats stamped with the time they were computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSummary {
    #[serde(flatten)]
    pub stats: RealTimeStats,
    pub last_update: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStats {
    pub total_roads: usize,
    pub total_vehicles: usize,
    pub average_speed: f64,
    pub congestion_level: f64,
    pub active_alerts: usize,
    pub overspeed_count: usize,
    pub accident_count: usize,
}

/// Congestion buckets of a road's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionBand {
    Unknown,
    Free,
    Light,
    Moderate,
    Heavy,
    Severe,
}

impl CongestionBand {
    pub fn from_score(score: f64) -> Self {
        if score < 0.2 {
            CongestionBand::Free
        } else if score < 0.4 {
            CongestionBand::Light
        } else if score < 0.6 {
            CongestionBand::Moderate
        } else if score < 0.8 {
            CongestionBand::Heavy
        } else {
            CongestionBand::Severe
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CongestionBand::Unknown => "unknown",
            CongestionBand::Free => "free flowing",
            CongestionBand::Light => "light congestion",
            CongestionBand::Moderate => "moderate congestion",
            CongestionBand::Heavy => "heavy congestion",
            CongestionBand::Severe => "severe congestion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CongestionData {
    pub road_id: u64,
    pub road_name: String,
    pub congestion_level: f64,
    pub vehicle_count: usize,
    pub average_speed: f64,
    pub status: CongestionBand,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleFlow {
    pub total_vehicles: usize,
    /// Vehicles reporting in the current window that were silent in the previous one.
    pub incoming_vehicles: usize,
    /// Vehicles that reported in the previous window and went silent.
    pub outgoing_vehicles: usize,
    /// outgoing / incoming, 0 when nothing came in.
    pub flow_rate: f64,
    /// Distinct vehicles of the current window, scaled to an hour.
    #[serde(default)]
    pub vehicles_per_hour: f64,
    /// Busiest hour of the last day, e.g. `17:00-18:00`.
    pub peak_hour: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStatus {
    pub simulating: bool,
    pub vehicle_count: usize,
    pub alert_count: usize,
    pub last_update: String,
    pub config: SimulationConfig,
}

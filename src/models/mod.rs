// src/models/mod.rs
pub mod api_response;
pub mod gps_data;
pub mod road_segment;
pub mod simulation_config;
pub mod stats;
pub mod traffic_alert;
pub mod vehicle;

pub use api_response::{ApiResponse, HealthStatus};
pub use gps_data::{GpsData, GpsDataParams};
pub use road_segment::{NearbyRoad, RoadSegment, RoadSegmentParams, RoadType};
pub use simulation_config::SimulationConfig;
pub use stats::{
    CongestionBand, CongestionData, RealTimeStats, SimulationStatus, TrafficStats,
    TrafficSummary, VehicleFlow,
};
pub use traffic_alert::{AlertType, Severity, TrafficAlert};
pub use vehicle::{Vehicle, VehicleParams, VehicleStatus, VehicleType};

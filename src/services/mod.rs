// src/services/mod.rs
pub mod alert_feed;
pub mod gps_service;
pub mod road_service;
pub mod traffic_service;

pub use alert_feed::AlertFeed;
pub use gps_service::GpsService;
pub use road_service::RoadService;
pub use traffic_service::TrafficService;

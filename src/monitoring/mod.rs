// src/monitoring/mod.rs
pub mod alert_publisher;
pub mod journal;
pub mod traffic_monitoring_system;

pub use alert_publisher::{listen_traffic_alerts, AlertPublisher};
pub use journal::Journal;

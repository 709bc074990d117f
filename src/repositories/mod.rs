// src/repositories/mod.rs
//! In-memory stores. Ids are assigned sequentially from 1 and never reused.
pub mod alert_repository;
pub mod gps_repository;
pub mod road_repository;

pub use alert_repository::AlertRepository;
pub use gps_repository::GpsRepository;
pub use road_repository::RoadRepository;

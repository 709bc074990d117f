// src/lib.rs
//! Traffic monitoring backend: GPS ingestion, road matching, overspeed,
//! anomaly and congestion detection, traffic alerts, a vehicle simulation
//! and the HTTP JSON API the dashboard talks to.

pub mod algorithms;
pub mod app_state;
pub mod config;
pub mod dashboard_routes;
pub mod error;
pub mod geo;
pub mod global_variables;
pub mod http;
pub mod models;
pub mod monitoring;
pub mod repositories;
pub mod services;
pub mod shared_data;
pub mod simulation_engine;

pub use app_state::AppState;
pub use config::AppConfig;
pub use error::{Result, TrafficError};

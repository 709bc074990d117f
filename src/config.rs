// src/config.rs
//! Runtime configuration.
//!
//! Built up in layers: compiled defaults, an optional JSON file, then
//! `TRAFFIC_MONITOR_*` environment variables. The server binary applies its
//! command line flags last.

use crate::error::{Result, TrafficError};
use crate::global_variables::{
    AMQP_URL, CONGESTION_WINDOW_MINUTES, DEFAULT_ALERT_RETENTION, DEFAULT_GPS_RETENTION,
    DEFAULT_HOST, DEFAULT_MATCH_TOLERANCE_KM, DEFAULT_PORT, MAX_BODY_BYTES, MAX_TRACKED_VEHICLES,
    MAX_WINDOW_MINUTES, QUEUE_TRAFFIC_ALERTS,
};
use crate::models::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG: &str = "TRAFFIC_MONITOR_CONFIG";
pub const ENV_HOST: &str = "TRAFFIC_MONITOR_HOST";
pub const ENV_PORT: &str = "TRAFFIC_MONITOR_PORT";
pub const ENV_JOURNAL_DIR: &str = "TRAFFIC_MONITOR_JOURNAL_DIR";
pub const ENV_AMQP_URL: &str = "TRAFFIC_MONITOR_AMQP_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JournalConfig {
    /// Where the CSV journals go. Journaling is off when unset.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AmqpConfig {
    pub enabled: bool,
    pub url: String,
    pub queue: String,
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: AMQP_URL.to_string(),
            queue: QUEUE_TRAFFIC_ALERTS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Farthest a sample may be from a road and still be matched to it.
    pub match_tolerance_km: f64,
    /// Samples this recent feed a road's congestion score.
    pub congestion_window_minutes: i64,
    /// Vehicles the speed and anomaly detectors keep state for.
    pub max_tracked_vehicles: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            match_tolerance_km: DEFAULT_MATCH_TOLERANCE_KM,
            congestion_window_minutes: CONGESTION_WINDOW_MINUTES,
            max_tracked_vehicles: MAX_TRACKED_VEHICLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetentionConfig {
    pub alerts: usize,
    pub gps: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            alerts: DEFAULT_ALERT_RETENTION,
            gps: DEFAULT_GPS_RETENTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub server: ServerConfig,
    pub journal: JournalConfig,
    pub amqp: AmqpConfig,
    pub detection: DetectionConfig,
    pub retention: RetentionConfig,
    pub simulation: SimulationConfig,
    /// Start the simulation as soon as the server is up.
    pub autostart_simulation: bool,
}

impl AppConfig {
    /// Defaults, then `path` (when given), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            TrafficError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TrafficError::Config(e.to_string()))
    }

    /// Applies the `TRAFFIC_MONITOR_*` overrides found through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| TrafficError::Config(format!("{ENV_PORT}={port} is not a port")))?;
        }
        if let Some(dir) = lookup(ENV_JOURNAL_DIR) {
            self.journal.directory = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup(ENV_AMQP_URL) {
            self.amqp.url = url;
            self.amqp.enabled = true;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(TrafficError::Config("server host cannot be empty".into()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(TrafficError::Config("maxBodyBytes must be positive".into()));
        }
        if !(self.detection.match_tolerance_km > 0.0) {
            return Err(TrafficError::Config(
                "matchToleranceKm must be positive".into(),
            ));
        }
        if !(1..=MAX_WINDOW_MINUTES).contains(&self.detection.congestion_window_minutes) {
            return Err(TrafficError::Config(format!(
                "congestionWindowMinutes must be between 1 and {MAX_WINDOW_MINUTES}"
            )));
        }
        if self.detection.max_tracked_vehicles == 0 {
            return Err(TrafficError::Config(
                "maxTrackedVehicles must be positive".into(),
            ));
        }
        if self.retention.alerts == 0 || self.retention.gps == 0 {
            return Err(TrafficError::Config("retention must be positive".into()));
        }
        if self.amqp.enabled && self.amqp.queue.trim().is_empty() {
            return Err(TrafficError::Config("AMQP queue cannot be empty".into()));
        }
        self.simulation
            .validate()
            .map_err(|e| TrafficError::Config(format!("simulation: {e}")))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| TrafficError::Config(format!("bad bind address: {e}")))
    }
}

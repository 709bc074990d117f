// src/app_state.rs
//! Wires repositories, services and the simulation together from an
//! [`AppConfig`].

use crate::algorithms::{CongestionCalculator, RoadMatcher};
use crate::config::AppConfig;
use crate::error::Result;
use crate::monitoring::alert_publisher::AlertPublisher;
use crate::monitoring::journal::Journal;
use crate::repositories::{AlertRepository, GpsRepository, RoadRepository};
use crate::services::{AlertFeed, GpsService, RoadService, TrafficService};
use crate::shared_data::now;
use crate::simulation_engine::{Fleet, SimulationEngine};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub roads: RoadService,
    pub gps: Arc<GpsService>,
    pub traffic: TrafficService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds the whole service graph. Opens the journal when a directory is
    /// configured; with AMQP enabled the publisher thread is started, which
    /// needs a running tokio runtime.
    pub fn build(config: AppConfig) -> Result<Arc<Self>> {
        let journal = match &config.journal.directory {
            Some(dir) => {
                let journal = Journal::open(dir)?;
                log::info!("Journaling to {}", journal.directory().display());
                Some(Arc::new(journal))
            }
            None => None,
        };
        let publisher = if config.amqp.enabled {
            // The publisher thread logs its own failures and ends once every sender is gone.
            let (publisher, _task) = AlertPublisher::start(&config.amqp.url, &config.amqp.queue);
            Some(publisher)
        } else {
            None
        };

        let roads = Arc::new(RoadRepository::new());
        let gps_repo = Arc::new(GpsRepository::new(config.retention.gps));
        let alert_repo = Arc::new(AlertRepository::new(config.retention.alerts));
        if let Some(journal) = &journal {
            // Ids keep counting from the previous run so journal rows never collide.
            gps_repo.resume_after(journal.last_gps_id()?);
            alert_repo.resume_after(journal.last_alert_id()?);
        }
        let matcher = Arc::new(RwLock::new(RoadMatcher::default()));
        let congestion = Arc::new(Mutex::new(CongestionCalculator::default()));
        let alerts = Arc::new(AlertFeed::new(alert_repo, journal.clone(), publisher));

        let road_service = RoadService::new(
            roads.clone(),
            gps_repo.clone(),
            matcher.clone(),
            congestion.clone(),
        );
        let gps = Arc::new(GpsService::new(
            gps_repo.clone(),
            roads.clone(),
            matcher,
            congestion,
            alerts.clone(),
            journal,
            config.detection.clone(),
        ));
        let fleet = Arc::new(Fleet::with_default_vehicles(&config.simulation));
        let simulation = Arc::new(SimulationEngine::new(
            fleet,
            gps.clone(),
            config.simulation.clone(),
        ));
        let traffic = TrafficService::new(
            roads,
            gps_repo,
            alerts,
            simulation,
            Duration::minutes(config.detection.congestion_window_minutes),
        );

        Ok(Arc::new(Self {
            config,
            roads: road_service,
            gps,
            traffic,
            started_at: now(),
        }))
    }

    /// Stops the simulation task, waiting for its last tick.
    pub async fn shutdown(&self) {
        self.traffic.simulation().shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_has_default_fleet_and_no_roads() {
        let state = AppState::build(AppConfig::default()).unwrap();
        assert_eq!(state.traffic.vehicles().len(), 3);
        assert_eq!(state.roads.count(), 0);
        assert!(!state.traffic.simulation().is_running());
    }

    #[test]
    fn journal_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.journal.directory = Some(dir.path().join("journal"));
        AppState::build(config).unwrap();
        assert!(dir.path().join("journal").is_dir());
    }

    #[test]
    fn restarted_state_continues_journal_ids() {
        use crate::models::{GpsDataParams, RoadSegmentParams, RoadType, VehicleType};

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.journal.directory = Some(dir.path().to_path_buf());

        // Each run sees one speeding vehicle, raising one overspeed alert.
        let run = |vehicle: &str| {
            let state = AppState::build(config.clone()).unwrap();
            state
                .roads
                .create(RoadSegmentParams {
                    name: "Ring".into(),
                    start_lng: 116.30,
                    start_lat: 39.90,
                    end_lng: 116.40,
                    end_lat: 39.90,
                    max_speed: 60,
                    capacity: 1000,
                    length: None,
                    road_type: RoadType::Urban,
                })
                .unwrap();
            let sample = state
                .gps
                .ingest(GpsDataParams {
                    vehicle_id: vehicle.into(),
                    longitude: 116.35,
                    latitude: 39.90,
                    speed: 90.0,
                    direction: 90.0,
                    timestamp: None,
                    road_segment_id: None,
                    vehicle_type: VehicleType::Car,
                })
                .unwrap();
            (sample.id, state.traffic.recent_alerts()[0].id)
        };

        assert_eq!(run("V1"), (Some(1), Some(1)));
        assert_eq!(run("V2"), (Some(2), Some(2)));

        let journal = Journal::open(dir.path()).unwrap();
        let vehicles: Vec<Option<String>> = journal
            .read_alerts()
            .unwrap()
            .into_iter()
            .map(|a| a.vehicle_id)
            .collect();
        assert_eq!(vehicles, vec![Some("V1".to_string()), Some("V2".to_string())]);
        assert_eq!(journal.read_gps().unwrap().len(), 2);
    }
}

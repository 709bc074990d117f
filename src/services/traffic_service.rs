// src/services/traffic_service.rs

use crate::algorithms::CongestionCalculator;
use crate::error::Result;
use crate::global_variables::{OVERSPEED_STATUS_KMH, RECENT_ALERTS_LIMIT};
use crate::models::{
    AlertType, CongestionBand, CongestionData, GpsData, RealTimeStats, RoadSegment, Severity,
    SimulationConfig, SimulationStatus, TrafficAlert, TrafficStats, TrafficSummary, Vehicle,
    VehicleFlow, VehicleParams,
};
use crate::repositories::{GpsRepository, RoadRepository};
use crate::services::alert_feed::AlertFeed;
use crate::shared_data::{display_time, now};
use crate::simulation_engine::SimulationEngine;
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

fn distinct_vehicles(samples: &[GpsData]) -> HashSet<&str> {
    samples.iter().map(|s| s.vehicle_id.as_str()).collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Busiest hour among `samples`, as `HH:00-HH:00`. Ties go to the earlier hour.
pub fn peak_hour(samples: &[GpsData]) -> Option<String> {
    let mut per_hour: BTreeMap<u32, usize> = BTreeMap::new();
    for sample in samples {
        *per_hour.entry(sample.timestamp.hour()).or_default() += 1;
    }
    let mut peak: Option<(u32, usize)> = None;
    for (hour, count) in per_hour {
        if peak.map_or(true, |(_, best)| count > best) {
            peak = Some((hour, count));
        }
    }
    peak.map(|(hour, _)| format!("{:02}:00-{:02}:00", hour, (hour + 1) % 24))
}

/// Dashboard aggregates, the simulated fleet and alert queries.
///
/// "Current" figures look at the samples of the last `window`; a fleet
/// vehicle without a recent sample counts with its simulated speed.
#[derive(Debug)]
pub struct TrafficService {
    roads: Arc<RoadRepository>,
    gps: Arc<GpsRepository>,
    alerts: Arc<AlertFeed>,
    simulation: Arc<SimulationEngine>,
    window: Duration,
}

impl TrafficService {
    pub fn new(
        roads: Arc<RoadRepository>,
        gps: Arc<GpsRepository>,
        alerts: Arc<AlertFeed>,
        simulation: Arc<SimulationEngine>,
        window: Duration,
    ) -> Self {
        Self {
            roads,
            gps,
            alerts,
            simulation,
            window,
        }
    }

    /// Latest known speed per vehicle.
    fn current_speeds(&self, at: DateTime<Utc>) -> HashMap<String, f64> {
        let mut speeds: HashMap<String, f64> = self
            .simulation
            .fleet()
            .list()
            .into_iter()
            .map(|v| (v.vehicle_id, v.speed))
            .collect();
        let mut newest: HashMap<String, DateTime<Utc>> = HashMap::new();
        for sample in self.gps.find_since(at - self.window) {
            let seen = newest.entry(sample.vehicle_id.clone()).or_insert(sample.timestamp);
            if sample.timestamp >= *seen {
                *seen = sample.timestamp;
                speeds.insert(sample.vehicle_id, sample.speed);
            }
        }
        speeds
    }

    /// Road score from its samples in the window; `None` when it has none.
    fn road_congestion(&self, road: &RoadSegment, at: DateTime<Utc>) -> Option<(f64, usize, f64)> {
        let samples = self.gps.find_by_road(road.id?, at - self.window);
        if samples.is_empty() {
            return None;
        }
        let vehicles = distinct_vehicles(&samples).len();
        let average = mean(samples.iter().map(|s| s.speed));
        Some((
            CongestionCalculator::score(average, vehicles, road),
            vehicles,
            average,
        ))
    }

    fn congestion_level(&self, at: DateTime<Utc>) -> f64 {
        mean(
            self.roads
                .get_all()
                .iter()
                .filter_map(|road| self.road_congestion(road, at))
                .map(|(score, _, _)| score),
        )
    }

    pub fn real_time_stats(&self) -> RealTimeStats {
        let at = now();
        let speeds = self.current_speeds(at);
        RealTimeStats {
            total_vehicles: speeds.len(),
            average_speed: mean(speeds.values().copied()),
            congestion_level: self.congestion_level(at),
            active_alerts: self.alerts.repository().count_active(),
        }
    }

    pub fn summary(&self) -> TrafficSummary {
        TrafficSummary {
            stats: self.real_time_stats(),
            last_update: display_time(now()),
        }
    }

    pub fn stats(&self) -> TrafficStats {
        let at = now();
        let speeds = self.current_speeds(at);
        let repo = self.alerts.repository();
        TrafficStats {
            total_roads: self.roads.count(),
            total_vehicles: speeds.len(),
            average_speed: mean(speeds.values().copied()),
            congestion_level: self.congestion_level(at),
            active_alerts: repo.count_active(),
            overspeed_count: speeds.values().filter(|s| **s > OVERSPEED_STATUS_KMH).count(),
            accident_count: repo.count_by_type(AlertType::Accident),
        }
    }

    /// One entry per road; roads without recent samples report `unknown`.
    pub fn congestion(&self) -> Vec<CongestionData> {
        let at = now();
        self.roads
            .get_all()
            .into_iter()
            .map(|road| {
                let (level, vehicle_count, average_speed, status) =
                    match self.road_congestion(&road, at) {
                        Some((score, count, avg)) => {
                            (score, count, avg, CongestionBand::from_score(score))
                        }
                        None => (0.0, 0, 0.0, CongestionBand::Unknown),
                    };
                CongestionData {
                    road_id: road.id.unwrap_or_default(),
                    road_name: road.name,
                    congestion_level: level,
                    vehicle_count,
                    average_speed,
                    status,
                }
            })
            .collect()
    }

    /// Compares the vehicles reporting in the current window with those of
    /// the window before it.
    pub fn vehicle_flow(&self) -> VehicleFlow {
        let at = now();
        let current_start = at - self.window;
        let previous_start = current_start - self.window;

        let samples = self.gps.find_since(previous_start);
        let (current, previous): (Vec<GpsData>, Vec<GpsData>) = samples
            .into_iter()
            .partition(|s| s.timestamp >= current_start);
        let current = distinct_vehicles(&current);
        let previous = distinct_vehicles(&previous);
        let vehicles_per_hour = CongestionCalculator::traffic_flow(current.len(), self.window);

        let incoming = current.difference(&previous).count();
        let outgoing = previous.difference(&current).count();
        let flow_rate = if incoming == 0 {
            0.0
        } else {
            outgoing as f64 / incoming as f64
        };
        let last_day = self.gps.find_since(at - Duration::hours(24));

        VehicleFlow {
            total_vehicles: self.current_speeds(at).len(),
            incoming_vehicles: incoming,
            outgoing_vehicles: outgoing,
            flow_rate,
            vehicles_per_hour,
            peak_hour: peak_hour(&last_day).unwrap_or_else(|| "n/a".to_string()),
        }
    }

    pub fn recent_alerts(&self) -> Vec<TrafficAlert> {
        self.alerts.repository().get_recent(RECENT_ALERTS_LIMIT)
    }

    /// Active alerts, optionally narrowed to a severity and/or road.
    pub fn active_alerts(&self, severity: Option<Severity>, road_id: Option<u64>) -> Vec<TrafficAlert> {
        let repo = self.alerts.repository();
        let alerts = match (severity, road_id) {
            (Some(severity), _) => repo.get_by_severity(severity),
            (None, Some(road_id)) => repo.get_by_road(road_id),
            (None, None) => repo.get_active(),
        };
        alerts
            .into_iter()
            .filter(|a| road_id.map_or(true, |r| a.road_segment_id == r))
            .collect()
    }

    pub fn resolve_alert(&self, id: u64) -> Result<TrafficAlert> {
        self.alerts.resolve(id)
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.simulation.fleet().list()
    }

    pub fn add_vehicle(&self, params: VehicleParams) -> Result<Vehicle> {
        self.simulation
            .fleet()
            .add(params, &self.simulation.config())
    }

    pub fn remove_vehicle(&self, vehicle_id: &str) -> Result<()> {
        self.simulation.fleet().remove(vehicle_id).map(|_| ())
    }

    pub fn start_simulation(&self) -> SimulationStatus {
        if !self.simulation.start() {
            log::info!("Simulation already running");
        }
        self.simulation_status()
    }

    pub fn stop_simulation(&self) -> SimulationStatus {
        if !self.simulation.stop() {
            log::info!("Simulation was not running");
        }
        self.simulation_status()
    }

    pub fn simulation_status(&self) -> SimulationStatus {
        let config = self.simulation.config();
        SimulationStatus {
            simulating: config.is_active,
            vehicle_count: self.simulation.fleet().len(),
            alert_count: self.alerts.repository().count(),
            last_update: display_time(self.simulation.last_update().unwrap_or_else(now)),
            config,
        }
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        self.simulation.config()
    }

    pub fn update_simulation_config(&self, config: SimulationConfig) -> Result<SimulationConfig> {
        self.simulation.update_config(config)
    }

    pub fn simulation(&self) -> &SimulationEngine {
        &self.simulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::RoadMatcher;
    use crate::config::DetectionConfig;
    use crate::models::{GpsDataParams, RoadSegmentParams, RoadType, VehicleType};
    use crate::repositories::AlertRepository;
    use crate::services::gps_service::GpsService;
    use crate::shared_data::write_lock;
    use crate::simulation_engine::Fleet;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::{Mutex, RwLock};

    struct Fixture {
        traffic: TrafficService,
        gps: Arc<GpsService>,
        alerts: Arc<AlertRepository>,
    }

    fn fixture(fleet: Fleet) -> Fixture {
        let roads = Arc::new(RoadRepository::new());
        roads.create(
            RoadSegmentParams {
                name: "Ring Road".into(),
                start_lng: 116.30,
                start_lat: 39.90,
                end_lng: 116.40,
                end_lat: 39.90,
                max_speed: 60,
                capacity: 10,
                length: None,
                road_type: RoadType::Urban,
            }
            .into(),
        );
        roads.create(
            RoadSegmentParams {
                name: "Quiet Lane".into(),
                start_lng: 116.30,
                start_lat: 39.95,
                end_lng: 116.31,
                end_lat: 39.95,
                max_speed: 40,
                capacity: 10,
                length: None,
                road_type: RoadType::Urban,
            }
            .into(),
        );
        let matcher = Arc::new(RwLock::new(RoadMatcher::default()));
        write_lock(&matcher).load_roads(roads.get_all());
        let gps_repo = Arc::new(GpsRepository::new(1000));
        let alerts = Arc::new(AlertRepository::new(100));
        let feed = Arc::new(AlertFeed::new(alerts.clone(), None, None));
        let gps = Arc::new(GpsService::new(
            gps_repo.clone(),
            roads.clone(),
            matcher,
            Arc::new(Mutex::new(CongestionCalculator::default())),
            feed.clone(),
            None,
            DetectionConfig::default(),
        ));
        let simulation = Arc::new(SimulationEngine::new(
            Arc::new(fleet),
            gps.clone(),
            SimulationConfig::default(),
        ));
        Fixture {
            traffic: TrafficService::new(roads, gps_repo, feed, simulation, Duration::minutes(5)),
            gps,
            alerts,
        }
    }

    fn sample(vehicle: &str, lat: f64, speed: f64) -> GpsDataParams {
        GpsDataParams {
            vehicle_id: vehicle.into(),
            longitude: 116.35,
            latitude: lat,
            speed,
            direction: 90.0,
            timestamp: None,
            road_segment_id: None,
            vehicle_type: VehicleType::Car,
        }
    }

    #[test]
    fn empty_system_reports_zeroes() {
        let f = fixture(Fleet::new());
        assert_eq!(f.traffic.real_time_stats(), RealTimeStats::default());
        let flow = f.traffic.vehicle_flow();
        assert_eq!(flow.peak_hour, "n/a");
        assert_eq!(flow.flow_rate, 0.0);
        assert_eq!(flow.vehicles_per_hour, 0.0);
        assert!(f
            .traffic
            .congestion()
            .iter()
            .all(|c| c.status == CongestionBand::Unknown && c.congestion_level == 0.0));
    }

    #[test]
    fn gps_samples_override_fleet_speeds() {
        let f = fixture(Fleet::with_default_vehicles(&SimulationConfig::default()));
        // Defaults: 45, 85, 35 km/h.
        let stats = f.traffic.stats();
        assert_eq!(stats.total_vehicles, 3);
        assert!((stats.average_speed - 55.0).abs() < 1e-9);
        assert_eq!(stats.overspeed_count, 1);
        assert_eq!(stats.total_roads, 2);

        f.gps.ingest(sample("V002", 39.95, 50.0)).unwrap();
        f.gps.ingest(sample("X100", 39.95, 30.0)).unwrap();
        let stats = f.traffic.stats();
        assert_eq!(stats.total_vehicles, 4);
        assert!((stats.average_speed - 40.0).abs() < 1e-9);
        assert_eq!(stats.overspeed_count, 0);
    }

    #[test]
    fn congestion_covers_every_road() {
        let f = fixture(Fleet::new());
        f.gps.ingest(sample("A", 39.9, 30.0)).unwrap();
        f.gps.ingest(sample("B", 39.9, 30.0)).unwrap();
        let congestion = f.traffic.congestion();
        assert_eq!(congestion.len(), 2);
        let ring = &congestion[0];
        assert_eq!(ring.road_name, "Ring Road");
        assert_eq!(ring.vehicle_count, 2);
        assert!((ring.average_speed - 30.0).abs() < 1e-9);
        // 0.7 * (1 - 30/60) + 0.3 * (2/10)
        assert!((ring.congestion_level - 0.41).abs() < 1e-9);
        assert_eq!(ring.status, CongestionBand::Moderate);
        assert_eq!(congestion[1].status, CongestionBand::Unknown);
        assert!((f.traffic.real_time_stats().congestion_level - 0.41).abs() < 1e-9);
    }

    #[test]
    fn flow_counts_new_vehicles_as_incoming() {
        let f = fixture(Fleet::new());
        f.gps.ingest(sample("A", 39.9, 30.0)).unwrap();
        f.gps.ingest(sample("B", 39.9, 30.0)).unwrap();
        let mut stale = sample("C", 39.9, 30.0);
        stale.timestamp = Some(now() - Duration::minutes(7));
        f.gps.ingest(stale).unwrap();

        let flow = f.traffic.vehicle_flow();
        assert_eq!(flow.incoming_vehicles, 2);
        assert_eq!(flow.outgoing_vehicles, 1);
        assert!((flow.flow_rate - 0.5).abs() < 1e-9);
        // Two vehicles in a five minute window.
        assert!((flow.vehicles_per_hour - 24.0).abs() < 1e-9);
        assert_eq!(flow.total_vehicles, 2);
        assert_ne!(flow.peak_hour, "n/a");
    }

    #[test]
    fn peak_hour_picks_busiest_hour() {
        let at = |h| Utc.with_ymd_and_hms(2024, 5, 1, h, 10, 0).unwrap();
        let samples: Vec<GpsData> = [8, 17, 17, 23, 23]
            .iter()
            .map(|h| sample("A", 39.9, 10.0).into_record(at(*h)))
            .collect();
        assert_eq!(peak_hour(&samples).as_deref(), Some("17:00-18:00"));
        assert_eq!(peak_hour(&samples[3..]).as_deref(), Some("23:00-00:00"));
        assert_eq!(peak_hour(&[]), None);
    }

    #[test]
    fn alerts_filter_by_severity_and_road() {
        let f = fixture(Fleet::new());
        f.gps.ingest(sample("A", 39.9, 0.0)).unwrap();
        let active = f.traffic.active_alerts(None, None);
        assert!(active.len() >= 2);
        assert!(f
            .traffic
            .active_alerts(Some(Severity::Low), None)
            .iter()
            .all(|a| a.severity == Severity::Low));
        assert!(f.traffic.active_alerts(None, Some(2)).is_empty());
        assert_eq!(f.traffic.active_alerts(None, Some(1)).len(), active.len());

        let id = active[0].id.unwrap();
        assert!(f.traffic.resolve_alert(id).unwrap().resolved);
        assert_eq!(f.alerts.count_active(), active.len() - 1);
        assert_eq!(f.traffic.recent_alerts().len(), active.len());
    }

    #[test]
    fn vehicles_can_be_added_and_removed() {
        let f = fixture(Fleet::with_default_vehicles(&SimulationConfig::default()));
        let params = VehicleParams {
            vehicle_id: "V100".into(),
            longitude: None,
            latitude: None,
            speed: 50.0,
            direction: 0.0,
            vehicle_type: VehicleType::Truck,
        };
        f.traffic.add_vehicle(params.clone()).unwrap();
        assert_eq!(f.traffic.add_vehicle(params).unwrap_err().status_code(), 409);
        assert_eq!(f.traffic.vehicles().len(), 4);
        f.traffic.remove_vehicle("V100").unwrap();
        assert_eq!(f.traffic.remove_vehicle("V100").unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn simulation_status_tracks_the_engine() {
        let f = fixture(Fleet::with_default_vehicles(&SimulationConfig::default()));
        let status = f.traffic.simulation_status();
        assert!(!status.simulating);
        assert_eq!(status.vehicle_count, 3);

        let started = f.traffic.start_simulation();
        assert!(started.simulating);
        assert!(started.config.is_active);
        assert_eq!(started.vehicle_count, 20);
        assert!(f.traffic.start_simulation().simulating);

        f.traffic.stop_simulation();
        f.traffic.simulation().shutdown().await;
        assert!(!f.traffic.simulation_status().simulating);
    }
}

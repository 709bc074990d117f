// src/services/gps_service.rs

use crate::algorithms::anomaly_detector::RuleCondition;
use crate::algorithms::{
    AnomalyDetector, AnomalyKind, AnomalyRule, AnomalyStatistics, CongestionCalculator,
    CongestionForecast, DetectionRecord, OverspeedStatistics, RoadMatcher, RoadStatistics,
    SpeedDetector, SpeedProfile,
};
use crate::config::DetectionConfig;
use crate::error::{Result, TrafficError};
use crate::global_variables::{
    DEFAULT_ANALYSIS_MINUTES, DEFAULT_FORECAST_MINUTES, DEFAULT_RECENT_LIMIT,
    DEFAULT_RECENT_MINUTES, DEFAULT_ROAD_MINUTES, DEFAULT_VEHICLE_LIMIT,
};
use crate::models::{
    AlertType, CongestionBand, GpsData, GpsDataParams, RoadSegment, Severity, TrafficAlert,
};
use crate::monitoring::journal::Journal;
use crate::repositories::{GpsRepository, RoadRepository};
use crate::services::alert_feed::AlertFeed;
use crate::shared_data::{lock, now, read_lock};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, RwLock};

pub fn validate_gps(params: &GpsDataParams) -> Result<()> {
    if params.vehicle_id.trim().is_empty() {
        return Err(TrafficError::Validation("Vehicle ID cannot be empty".into()));
    }
    if params.longitude == 0.0 || params.latitude == 0.0 {
        return Err(TrafficError::Validation(
            "Longitude and latitude cannot be zero".into(),
        ));
    }
    if !(-180.0..=180.0).contains(&params.longitude) || !(-90.0..=90.0).contains(&params.latitude) {
        return Err(TrafficError::Validation(format!(
            "Position ({}, {}) is outside valid coordinates",
            params.longitude, params.latitude
        )));
    }
    if !(params.speed >= 0.0) || !params.speed.is_finite() {
        return Err(TrafficError::Validation("Speed cannot be negative".into()));
    }
    if !params.direction.is_finite() {
        return Err(TrafficError::Validation("Direction must be a number".into()));
    }
    Ok(())
}

/// Start of a query window reaching `minutes` back from `at`.
fn window_start(at: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>> {
    if minutes <= 0 {
        return Err(TrafficError::BadRequest(format!(
            "minutes must be positive, got {minutes}"
        )));
    }
    Duration::try_minutes(minutes)
        .and_then(|window| at.checked_sub_signed(window))
        .ok_or_else(|| TrafficError::BadRequest(format!("minutes={minutes} is out of range")))
}

/// GPS ingestion and queries. Ingestion matches each sample to a road,
/// stores and journals it, then runs overspeed, anomaly and congestion
/// detection, raising alerts through the [`AlertFeed`].
#[derive(Debug)]
pub struct GpsService {
    gps: Arc<GpsRepository>,
    roads: Arc<RoadRepository>,
    matcher: Arc<RwLock<RoadMatcher>>,
    congestion: Arc<Mutex<CongestionCalculator>>,
    alerts: Arc<AlertFeed>,
    journal: Option<Arc<Journal>>,
    detection: DetectionConfig,
    speed: Mutex<SpeedDetector>,
    anomaly: Mutex<AnomalyDetector>,
}

impl GpsService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gps: Arc<GpsRepository>,
        roads: Arc<RoadRepository>,
        matcher: Arc<RwLock<RoadMatcher>>,
        congestion: Arc<Mutex<CongestionCalculator>>,
        alerts: Arc<AlertFeed>,
        journal: Option<Arc<Journal>>,
        detection: DetectionConfig,
    ) -> Self {
        Self {
            gps,
            roads,
            matcher,
            congestion,
            alerts,
            journal,
            speed: Mutex::new(
                SpeedDetector::new().with_vehicle_limit(detection.max_tracked_vehicles),
            ),
            anomaly: Mutex::new(
                AnomalyDetector::new().with_vehicle_limit(detection.max_tracked_vehicles),
            ),
            detection,
        }
    }

    pub fn ingest(&self, params: GpsDataParams) -> Result<GpsData> {
        validate_gps(&params)?;
        let mut record = params.into_record(now());

        let (lng, lat) = record.location();
        let tolerance_km = self.detection.match_tolerance_km;
        let road = match record.road_segment_id {
            Some(id) => {
                let road = self.roads.get_by_id(id).map_err(|_| {
                    TrafficError::Validation(format!("Road {} does not exist", id))
                })?;
                if !RoadMatcher::is_vehicle_on_road(lng, lat, &road, tolerance_km) {
                    log::debug!(
                        "{} reported road {} from ({}, {}), off the segment",
                        record.vehicle_id,
                        id,
                        lng,
                        lat
                    );
                }
                Some(road)
            }
            None => read_lock(&self.matcher)
                .match_road(lng, lat, tolerance_km)
                .cloned(),
        };
        record.road_segment_id = road.as_ref().and_then(|r| r.id);

        let stored = self.gps.create(record);
        log::debug!(
            "GPS {:?} from {} at {:.0} km/h on road {:?}",
            stored.id,
            stored.vehicle_id,
            stored.speed,
            stored.road_segment_id
        );
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append_gps(&stored) {
                log::error!("Error journaling GPS sample {:?}: {}", stored.id, e);
            }
        }

        self.detect_overspeed(&stored, road.as_ref());
        self.detect_anomalies(&stored, road.as_ref());
        if let Some(road) = &road {
            self.update_congestion(road);
        }
        Ok(stored)
    }

    fn detect_overspeed(&self, gps: &GpsData, road: Option<&RoadSegment>) {
        let overspeed = lock(&self.speed).check_overspeed(gps, road);
        let Some(road) = road.filter(|_| overspeed) else {
            return;
        };
        let severity = SpeedDetector::severity_for(gps.speed, road.max_speed);
        self.raise_vehicle_alert(
            gps,
            road,
            AlertType::Overspeed,
            severity,
            format!(
                "Vehicle {} overspeeding at {:.0} km/h on {} (limit {} km/h)",
                gps.vehicle_id, gps.speed, road.name, road.max_speed
            ),
        );
    }

    fn detect_anomalies(&self, gps: &GpsData, road: Option<&RoadSegment>) {
        let detections = lock(&self.anomaly).detect(gps);
        for detection in detections {
            match (road, Self::alert_type_for(&detection)) {
                (Some(road), Some(alert_type)) => {
                    let message = match alert_type {
                        AlertType::Accident => format!(
                            "Vehicle {} nearly stopped at {:.0} km/h on {}, possible accident",
                            gps.vehicle_id, gps.speed, road.name
                        ),
                        _ => format!(
                            "Vehicle {} at extreme speed {:.0} km/h on {}",
                            gps.vehicle_id, gps.speed, road.name
                        ),
                    };
                    self.raise_vehicle_alert(gps, road, alert_type, detection.severity, message);
                }
                _ => log::debug!("Anomaly for {}: {}", gps.vehicle_id, detection.message),
            }
        }
    }

    /// Speed rules map onto alerts; location and pattern findings are only recorded.
    fn alert_type_for(detection: &DetectionRecord) -> Option<AlertType> {
        match (detection.kind, detection.condition) {
            (AnomalyKind::Speed, RuleCondition::Above) => Some(AlertType::Overspeed),
            (AnomalyKind::Speed, RuleCondition::Below) => Some(AlertType::Accident),
            _ => None,
        }
    }

    /// Raises the alert unless the vehicle already has an unresolved one of the type.
    fn raise_vehicle_alert(
        &self,
        gps: &GpsData,
        road: &RoadSegment,
        alert_type: AlertType,
        severity: Severity,
        message: String,
    ) {
        let repo = self.alerts.repository();
        if repo.has_unresolved(alert_type, Some(&gps.vehicle_id), None) {
            return;
        }
        self.alerts.raise(
            TrafficAlert::new(
                alert_type,
                road.id.unwrap_or_default(),
                severity,
                message,
                gps.timestamp,
            )
            .with_vehicle(gps.vehicle_id.as_str())
            .with_value(gps.speed),
        );
    }

    /// Rescores the road from its recent samples and raises a congestion alert
    /// once it is heavy or worse.
    pub fn update_congestion(&self, road: &RoadSegment) -> f64 {
        let road_id = road.id.unwrap_or_default();
        let at = now();
        let samples = self.gps.find_by_road(
            road_id,
            at - Duration::minutes(self.detection.congestion_window_minutes),
        );
        let score = lock(&self.congestion).calculate(road, &samples, at);

        let severity = match CongestionBand::from_score(score) {
            CongestionBand::Severe => Severity::High,
            CongestionBand::Heavy => Severity::Medium,
            _ => return score,
        };
        if samples.is_empty()
            || self
                .alerts
                .repository()
                .has_unresolved(AlertType::Congestion, None, Some(road_id))
        {
            return score;
        }
        self.alerts.raise(
            TrafficAlert::new(
                AlertType::Congestion,
                road_id,
                severity,
                format!(
                    "{} on {} (score {:.2})",
                    CongestionBand::from_score(score).description(),
                    road.name,
                    score
                ),
                at,
            )
            .with_value(score),
        );
        score
    }

    pub fn recent(&self, limit: Option<usize>, minutes: Option<i64>) -> Result<Vec<GpsData>> {
        let since = window_start(now(), minutes.unwrap_or(DEFAULT_RECENT_MINUTES))?;
        Ok(self
            .gps
            .find_recent(limit.unwrap_or(DEFAULT_RECENT_LIMIT), since))
    }

    pub fn by_vehicle(&self, vehicle_id: &str, limit: Option<usize>) -> Result<Vec<GpsData>> {
        if vehicle_id.trim().is_empty() {
            return Err(TrafficError::Validation("Vehicle ID cannot be empty".into()));
        }
        Ok(self
            .gps
            .find_by_vehicle(vehicle_id, limit.unwrap_or(DEFAULT_VEHICLE_LIMIT)))
    }

    pub fn by_road(&self, road_id: u64, minutes: Option<i64>) -> Result<Vec<GpsData>> {
        let since = window_start(now(), minutes.unwrap_or(DEFAULT_ROAD_MINUTES))?;
        Ok(self.gps.find_by_road(road_id, since))
    }

    /// Average speed and trend of a vehicle from its road-matched samples.
    pub fn speed_profile(&self, vehicle_id: &str, minutes: Option<i64>) -> Result<SpeedProfile> {
        if vehicle_id.trim().is_empty() {
            return Err(TrafficError::Validation("Vehicle ID cannot be empty".into()));
        }
        let at = now();
        let window = at - window_start(at, minutes.unwrap_or(DEFAULT_ANALYSIS_MINUTES))?;
        let speed = lock(&self.speed);
        Ok(SpeedProfile {
            vehicle_id: vehicle_id.to_string(),
            average_speed: speed.average_speed(vehicle_id, window, at),
            pattern: speed.speed_pattern(vehicle_id),
            samples: speed.speed_history(vehicle_id).len(),
        })
    }

    pub fn overspeed_statistics(
        &self,
        road_id: u64,
        minutes: Option<i64>,
    ) -> Result<OverspeedStatistics> {
        self.roads.get_by_id(road_id)?;
        let at = now();
        let window = at - window_start(at, minutes.unwrap_or(DEFAULT_ANALYSIS_MINUTES))?;
        Ok(lock(&self.speed).overspeed_statistics(road_id, window, at))
    }

    /// Current score, band and score history of a road, with the score
    /// extrapolated `minutes` ahead.
    pub fn congestion_forecast(&self, road_id: u64, minutes: Option<u32>) -> Result<CongestionForecast> {
        self.roads.get_by_id(road_id)?;
        let minutes = minutes.unwrap_or(DEFAULT_FORECAST_MINUTES);
        let congestion = lock(&self.congestion);
        Ok(CongestionForecast {
            road_id,
            level: congestion.level(road_id),
            current: congestion
                .road_statistics(road_id)
                .map_or(0.0, |s| s.congestion_level),
            minutes,
            predicted: congestion.predict(road_id, minutes),
            trend: congestion.trend(road_id),
        })
    }

    /// Last computed figures of every road that has seen traffic.
    pub fn road_statistics(&self) -> Vec<RoadStatistics> {
        lock(&self.congestion).all_statistics()
    }

    pub fn anomaly_rules(&self) -> Vec<AnomalyRule> {
        lock(&self.anomaly).rules().to_vec()
    }

    pub fn add_anomaly_rule(&self, rule: AnomalyRule) -> Result<AnomalyRule> {
        lock(&self.anomaly).add_rule(rule.clone())?;
        log::info!("Anomaly rule {} added", rule.id);
        Ok(rule)
    }

    pub fn update_anomaly_rule(&self, id: &str, mut rule: AnomalyRule) -> Result<AnomalyRule> {
        rule.id = id.to_string();
        lock(&self.anomaly).update_rule(id, rule.clone())?;
        log::info!("Anomaly rule {} updated", id);
        Ok(rule)
    }

    pub fn delete_anomaly_rule(&self, id: &str) -> Result<AnomalyRule> {
        let rule = lock(&self.anomaly).delete_rule(id)?;
        log::info!("Anomaly rule {} deleted", id);
        Ok(rule)
    }

    pub fn anomaly_statistics(&self, minutes: Option<i64>) -> Result<AnomalyStatistics> {
        let at = now();
        let window = at - window_start(at, minutes.unwrap_or(DEFAULT_ANALYSIS_MINUTES))?;
        Ok(lock(&self.anomaly).statistics(window, at))
    }

    pub fn anomaly_history(&self, vehicle_id: &str) -> Result<Vec<DetectionRecord>> {
        if vehicle_id.trim().is_empty() {
            return Err(TrafficError::Validation("Vehicle ID cannot be empty".into()));
        }
        Ok(lock(&self.anomaly).history(vehicle_id))
    }

    pub fn detection(&self) -> &DetectionConfig {
        &self.detection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::SpeedPattern;
    use crate::models::{RoadSegmentParams, RoadType, VehicleType};
    use crate::repositories::AlertRepository;
    use crate::shared_data::write_lock;

    struct Fixture {
        service: GpsService,
        alerts: Arc<AlertRepository>,
        road_id: u64,
    }

    fn fixture(capacity: u32) -> Fixture {
        let roads = Arc::new(RoadRepository::new());
        let road = roads.create(
            RoadSegmentParams {
                name: "Second Ring".into(),
                start_lng: 116.30,
                start_lat: 39.90,
                end_lng: 116.40,
                end_lat: 39.90,
                max_speed: 60,
                capacity,
                length: None,
                road_type: RoadType::Urban,
            }
            .into(),
        );
        let matcher = Arc::new(RwLock::new(RoadMatcher::default()));
        write_lock(&matcher).load_roads(roads.get_all());
        let alerts = Arc::new(AlertRepository::new(100));
        let service = GpsService::new(
            Arc::new(GpsRepository::new(1000)),
            roads,
            matcher,
            Arc::new(Mutex::new(CongestionCalculator::default())),
            Arc::new(AlertFeed::new(alerts.clone(), None, None)),
            None,
            DetectionConfig::default(),
        );
        Fixture {
            service,
            alerts,
            road_id: road.id.unwrap(),
        }
    }

    fn params(vehicle: &str, lat: f64, speed: f64) -> GpsDataParams {
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
    fn rejects_invalid_samples() {
        let f = fixture(1000);
        assert!(f.service.ingest(params("", 39.9, 50.0)).is_err());
        assert!(f.service.ingest(params("V1", 0.0, 50.0)).is_err());
        assert!(f.service.ingest(params("V1", 95.0, 50.0)).is_err());
        assert!(f.service.ingest(params("V1", 39.9, -1.0)).is_err());
        let mut unknown_road = params("V1", 39.9, 50.0);
        unknown_road.road_segment_id = Some(42);
        assert_eq!(f.service.ingest(unknown_road).unwrap_err().status_code(), 400);
    }

    #[test]
    fn samples_are_matched_to_nearby_roads() {
        let f = fixture(1000);
        let on_road = f.service.ingest(params("V1", 39.9002, 50.0)).unwrap();
        assert_eq!(on_road.road_segment_id, Some(f.road_id));
        assert_eq!(on_road.id, Some(1));
        let off_road = f.service.ingest(params("V2", 39.95, 50.0)).unwrap();
        assert_eq!(off_road.road_segment_id, None);
        assert_eq!(f.service.by_road(f.road_id, None).unwrap().len(), 1);
        assert_eq!(f.service.recent(None, None).unwrap().len(), 2);
    }

    #[test]
    fn overspeed_alert_is_raised_once_per_vehicle() {
        let f = fixture(1000);
        f.service.ingest(params("V1", 39.9, 80.0)).unwrap();
        f.service.ingest(params("V1", 39.9, 85.0)).unwrap();
        let active = f.alerts.get_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].alert_type, AlertType::Overspeed);
        assert_eq!(active[0].severity, Severity::High);
        assert_eq!(active[0].vehicle_id.as_deref(), Some("V1"));
        assert_eq!(active[0].alert_value, Some(80.0));

        f.alerts.resolve(active[0].id.unwrap()).unwrap();
        f.service.ingest(params("V1", 39.9, 90.0)).unwrap();
        assert_eq!(f.alerts.count_active(), 1);
    }

    #[test]
    fn off_road_samples_raise_no_alerts() {
        let f = fixture(1000);
        f.service.ingest(params("V1", 39.95, 200.0)).unwrap();
        f.service.ingest(params("V2", 39.95, 0.0)).unwrap();
        assert_eq!(f.alerts.count(), 0);
    }

    #[test]
    fn stopped_vehicle_raises_accident_and_congestion() {
        let f = fixture(1000);
        f.service.ingest(params("V1", 39.9, 0.0)).unwrap();
        assert_eq!(f.alerts.count_by_type(AlertType::Accident), 1);
        let congestion = f.alerts.get_by_road(f.road_id);
        assert!(congestion
            .iter()
            .any(|a| a.alert_type == AlertType::Congestion && a.severity == Severity::High));

        // Still jammed: no duplicate congestion alert for the road.
        f.service.ingest(params("V2", 39.9, 1.0)).unwrap();
        assert_eq!(f.alerts.count_by_type(AlertType::Congestion), 1);
    }

    #[test]
    fn free_flowing_road_raises_no_congestion() {
        let f = fixture(1000);
        for i in 0..5 {
            f.service.ingest(params(&format!("V{i}"), 39.9, 55.0)).unwrap();
        }
        assert_eq!(f.alerts.count(), 0);
    }

    #[test]
    fn query_windows_must_be_representable() {
        let f = fixture(1000);
        f.service.ingest(params("V1", 39.9, 40.0)).unwrap();
        assert_eq!(f.service.recent(Some(10), Some(1)).unwrap().len(), 1);
        for minutes in [0, -5, 100_000_000_000_000, i64::MAX] {
            let err = f.service.recent(None, Some(minutes)).unwrap_err();
            assert_eq!(err.status_code(), 400, "minutes={minutes}");
            let err = f.service.by_road(f.road_id, Some(minutes)).unwrap_err();
            assert_eq!(err.status_code(), 400, "minutes={minutes}");
        }
    }

    #[test]
    fn speed_profile_and_overspeed_statistics() {
        let f = fixture(1000);
        for speed in [40.0, 50.0, 60.0, 70.0, 80.0] {
            f.service.ingest(params("V1", 39.9, speed)).unwrap();
        }
        f.service.ingest(params("V2", 39.9, 30.0)).unwrap();

        let profile = f.service.speed_profile("V1", None).unwrap();
        assert_eq!(profile.samples, 5);
        assert!((profile.average_speed - 60.0).abs() < 1e-9);
        assert_eq!(profile.pattern, SpeedPattern::Accelerating);
        assert_eq!(
            f.service.speed_profile("V9", None).unwrap().pattern,
            SpeedPattern::InsufficientData
        );
        assert_eq!(f.service.speed_profile(" ", None).unwrap_err().status_code(), 400);

        let stats = f.service.overspeed_statistics(f.road_id, Some(10)).unwrap();
        assert_eq!(stats.total_count, 6);
        assert_eq!(stats.overspeed_count, 2);
        assert_eq!(stats.max_speed, 80.0);
        assert_eq!(f.service.overspeed_statistics(99, None).unwrap_err().status_code(), 404);
        assert_eq!(
            f.service.overspeed_statistics(f.road_id, Some(0)).unwrap_err().status_code(),
            400
        );
    }

    #[test]
    fn congestion_forecast_follows_ingestion() {
        let f = fixture(1000);
        let quiet = f.service.congestion_forecast(f.road_id, None).unwrap();
        assert_eq!(quiet.level, CongestionBand::Unknown);
        assert!(quiet.trend.is_empty());
        assert_eq!(quiet.minutes, DEFAULT_FORECAST_MINUTES);

        f.service.ingest(params("V1", 39.9, 30.0)).unwrap();
        f.service.ingest(params("V2", 39.9, 30.0)).unwrap();
        let forecast = f.service.congestion_forecast(f.road_id, Some(2)).unwrap();
        assert_eq!(forecast.trend.len(), 2);
        assert_eq!(forecast.current, *forecast.trend.last().unwrap());
        assert_eq!(forecast.level, CongestionBand::from_score(forecast.current));
        assert!((forecast.predicted - (forecast.current * 1.2).min(1.0)).abs() < 1e-9);

        let stats = f.service.road_statistics();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].road_id, f.road_id);
        assert_eq!(stats[0].vehicle_count, 2);
        assert_eq!(f.service.congestion_forecast(42, None).unwrap_err().status_code(), 404);
    }

    #[test]
    fn anomaly_rules_steer_ingestion() {
        let f = fixture(1000);
        let mut crawl = f.service.anomaly_rules()[1].clone();
        crawl.id = "crawl".into();
        crawl.threshold = 20.0;
        f.service.add_anomaly_rule(crawl.clone()).unwrap();
        assert_eq!(f.service.add_anomaly_rule(crawl).unwrap_err().status_code(), 409);

        f.service.ingest(params("V1", 39.95, 10.0)).unwrap();
        let history = f.service.anomaly_history("V1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].rule_id, "crawl");

        let mut off = f.service.anomaly_rules()[0].clone();
        off.enabled = false;
        let updated = f.service.update_anomaly_rule("extreme_speed", off).unwrap();
        assert_eq!(updated.id, "extreme_speed");
        f.service.ingest(params("V2", 39.9, 200.0)).unwrap();
        assert!(f.service.anomaly_history("V2").unwrap().is_empty());

        let stats = f.service.anomaly_statistics(None).unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.by_kind["speed"], 1);

        assert_eq!(f.service.delete_anomaly_rule("crawl").unwrap().id, "crawl");
        assert_eq!(f.service.delete_anomaly_rule("crawl").unwrap_err().status_code(), 404);
        assert_eq!(f.service.anomaly_rules().len(), 4);
    }

    #[test]
    fn detector_state_is_capped_by_config() {
        let roads = Arc::new(RoadRepository::new());
        let detection = DetectionConfig {
            max_tracked_vehicles: 5,
            ..DetectionConfig::default()
        };
        let service = GpsService::new(
            Arc::new(GpsRepository::new(1000)),
            roads,
            Arc::new(RwLock::new(RoadMatcher::default())),
            Arc::new(Mutex::new(CongestionCalculator::default())),
            Arc::new(AlertFeed::new(Arc::new(AlertRepository::new(100)), None, None)),
            None,
            detection,
        );
        let start = now() - Duration::minutes(10);
        for i in 0..50 {
            let mut sample = params(&format!("V{i}"), 39.95, 2.0);
            sample.timestamp = Some(start + Duration::seconds(i));
            service.ingest(sample).unwrap();
        }
        assert!(service.anomaly_history("V0").unwrap().is_empty());
        assert_eq!(service.anomaly_history("V49").unwrap().len(), 1);
    }

    #[test]
    fn vehicle_query_requires_an_id() {
        let f = fixture(1000);
        assert!(f.service.by_vehicle(" ", None).is_err());
        f.service.ingest(params("V7", 39.9, 40.0)).unwrap();
        assert_eq!(f.service.by_vehicle("V7", Some(5)).unwrap().len(), 1);
    }
}

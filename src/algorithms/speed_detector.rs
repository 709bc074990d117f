// src/algorithms/speed_detector.rs

use crate::global_variables::MAX_TRACKED_VEHICLES;
use crate::models::{GpsData, RoadSegment, Severity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One road-matched speed sample of a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedRecord {
    pub speed: f64,
    pub limit: u32,
    pub timestamp: DateTime<Utc>,
    pub road_id: u64,
}

impl SpeedRecord {
    pub fn is_over_limit(&self) -> bool {
        self.speed > f64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedPattern {
    InsufficientData,
    Accelerating,
    Decelerating,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverspeedStatistics {
    pub overspeed_count: usize,
    pub total_count: usize,
    pub overspeed_rate: f64,
    pub max_speed: f64,
    pub window_hours: f64,
}

/// Payload of `GET /api/gps/vehicle/{vehicleId}/speed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedProfile {
    pub vehicle_id: String,
    pub average_speed: f64,
    pub pattern: SpeedPattern,
    /// Samples in the vehicle's retained history.
    pub samples: usize,
}

/// Overspeed detection with a per-vehicle speed history.
#[derive(Debug)]
pub struct SpeedDetector {
    history: HashMap<String, Vec<SpeedRecord>>,
    retention: Duration,
    max_vehicles: usize,
}

impl Default for SpeedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedDetector {
    /// Ratio above the limit at which a single sample counts as overspeed.
    pub const TOLERANCE_RATIO: f64 = 1.1;
    /// Consecutive over-limit samples that count as persistent overspeed.
    pub const PERSISTENT_SAMPLES: usize = 3;
    const PATTERN_MIN_SAMPLES: usize = 5;
    const PATTERN_STEP_KMH: f64 = 5.0;
    const PATTERN_SHARE: f64 = 0.6;

    pub fn new() -> Self {
        Self {
            history: HashMap::new(),
            retention: Duration::hours(1),
            max_vehicles: MAX_TRACKED_VEHICLES,
        }
    }

    /// Caps how many vehicles keep a speed history.
    pub fn with_vehicle_limit(mut self, max_vehicles: usize) -> Self {
        self.max_vehicles = max_vehicles.max(1);
        self
    }

    /// Records the sample against `road` and reports whether it is an overspeed.
    ///
    /// Samples at or under the limit never are. Over the limit, the sample counts
    /// when the vehicle has been over its limits for the last three samples, or
    /// when it exceeds the limit by more than 10 %.
    pub fn check_overspeed(&mut self, gps: &GpsData, road: Option<&RoadSegment>) -> bool {
        let Some(road) = road else {
            return false;
        };
        let road_id = road.id.unwrap_or_default();
        self.record_speed(gps, road_id, road.max_speed);

        if !gps.is_speeding(road.max_speed) {
            return false;
        }
        if self.is_persistent_overspeed(&gps.vehicle_id) {
            return true;
        }
        gps.speed / f64::from(road.max_speed.max(1)) > Self::TOLERANCE_RATIO
    }

    fn record_speed(&mut self, gps: &GpsData, road_id: u64, limit: u32) {
        let records = self.history.entry(gps.vehicle_id.clone()).or_default();
        records.push(SpeedRecord {
            speed: gps.speed,
            limit,
            timestamp: gps.timestamp,
            road_id,
        });
        // Retention is measured from the newest sample so replayed data behaves the same.
        let cutoff = gps.timestamp - self.retention;
        records.retain(|r| r.timestamp > cutoff);

        if self.history.len() > self.max_vehicles {
            self.evict(cutoff);
        }
    }

    /// Forgets vehicles silent since `cutoff`, then the least recently seen
    /// ones until the limit holds.
    fn evict(&mut self, cutoff: DateTime<Utc>) {
        self.history
            .retain(|_, records| records.last().is_some_and(|r| r.timestamp > cutoff));
        while self.history.len() > self.max_vehicles {
            let stalest = self
                .history
                .iter()
                .min_by_key(|(_, records)| records.last().map(|r| r.timestamp))
                .map(|(vehicle_id, _)| vehicle_id.clone());
            match stalest {
                Some(vehicle_id) => {
                    self.history.remove(&vehicle_id);
                }
                None => break,
            }
        }
    }

    fn is_persistent_overspeed(&self, vehicle_id: &str) -> bool {
        match self.history.get(vehicle_id) {
            Some(records) if records.len() >= Self::PERSISTENT_SAMPLES => records
                [records.len() - Self::PERSISTENT_SAMPLES..]
                .iter()
                .all(SpeedRecord::is_over_limit),
            _ => false,
        }
    }

    /// Severity of an overspeed by how far the limit is exceeded.
    pub fn severity_for(speed: f64, limit: u32) -> Severity {
        let ratio = speed / f64::from(limit.max(1));
        if ratio >= 1.3 {
            Severity::High
        } else if ratio >= Self::TOLERANCE_RATIO {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn speed_history(&self, vehicle_id: &str) -> &[SpeedRecord] {
        self.history
            .get(vehicle_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Mean speed of the samples newer than `now - window`; 0 without samples.
    pub fn average_speed(&self, vehicle_id: &str, window: Duration, now: DateTime<Utc>) -> f64 {
        let cutoff = now - window;
        let speeds: Vec<f64> = self
            .speed_history(vehicle_id)
            .iter()
            .filter(|r| r.timestamp > cutoff)
            .map(|r| r.speed)
            .collect();
        if speeds.is_empty() {
            return 0.0;
        }
        speeds.iter().sum::<f64>() / speeds.len() as f64
    }

    /// Trend of consecutive speed changes.
    pub fn speed_pattern(&self, vehicle_id: &str) -> SpeedPattern {
        let records = self.speed_history(vehicle_id);
        if records.len() < Self::PATTERN_MIN_SAMPLES {
            return SpeedPattern::InsufficientData;
        }

        let changes: Vec<f64> = records.windows(2).map(|w| w[1].speed - w[0].speed).collect();
        let accelerating = changes.iter().filter(|&&c| c > Self::PATTERN_STEP_KMH).count();
        let decelerating = changes.iter().filter(|&&c| c < -Self::PATTERN_STEP_KMH).count();
        let total = changes.len() as f64;

        if accelerating as f64 / total > Self::PATTERN_SHARE {
            SpeedPattern::Accelerating
        } else if decelerating as f64 / total > Self::PATTERN_SHARE {
            SpeedPattern::Decelerating
        } else {
            SpeedPattern::Stable
        }
    }

    pub fn overspeed_statistics(
        &self,
        road_id: u64,
        window: Duration,
        now: DateTime<Utc>,
    ) -> OverspeedStatistics {
        let cutoff = now - window;
        let mut total_count = 0;
        let mut overspeed_count = 0;
        let mut max_speed: f64 = 0.0;

        for record in self.history.values().flatten() {
            if record.road_id != road_id || record.timestamp <= cutoff {
                continue;
            }
            total_count += 1;
            if record.is_over_limit() {
                overspeed_count += 1;
                max_speed = max_speed.max(record.speed);
            }
        }

        let overspeed_rate = if total_count > 0 {
            overspeed_count as f64 / total_count as f64
        } else {
            0.0
        };

        OverspeedStatistics {
            overspeed_count,
            total_count,
            overspeed_rate,
            max_speed,
            window_hours: window.num_seconds() as f64 / 3600.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoadSegmentParams, RoadType, VehicleType};
    use chrono::TimeZone;

    fn road(limit: u32) -> RoadSegment {
        let mut road: RoadSegment = RoadSegmentParams {
            name: "Main".into(),
            start_lng: 116.3,
            start_lat: 39.9,
            end_lng: 116.4,
            end_lat: 39.9,
            max_speed: limit,
            capacity: 100,
            length: None,
            road_type: RoadType::Urban,
        }
        .into();
        road.id = Some(1);
        road
    }

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn gps(vehicle: &str, speed: f64, at: DateTime<Utc>) -> GpsData {
        GpsData {
            id: None,
            vehicle_id: vehicle.into(),
            longitude: 116.35,
            latitude: 39.9,
            speed,
            direction: 90.0,
            timestamp: at,
            road_segment_id: Some(1),
            vehicle_type: VehicleType::Car,
            created_at: None,
        }
    }

    #[test]
    fn no_road_means_no_overspeed() {
        let mut detector = SpeedDetector::new();
        assert!(!detector.check_overspeed(&gps("V1", 200.0, t(0)), None));
        assert!(detector.speed_history("V1").is_empty());
    }

    #[test]
    fn within_tolerance_is_not_flagged_until_persistent() {
        let mut detector = SpeedDetector::new();
        let road = road(60);
        // 65 km/h is within 10 % of the limit.
        assert!(!detector.check_overspeed(&gps("V1", 65.0, t(0)), Some(&road)));
        assert!(!detector.check_overspeed(&gps("V1", 65.0, t(1)), Some(&road)));
        // Third consecutive sample over the limit.
        assert!(detector.check_overspeed(&gps("V1", 65.0, t(2)), Some(&road)));
    }

    #[test]
    fn large_excess_is_flagged_immediately() {
        let mut detector = SpeedDetector::new();
        assert!(detector.check_overspeed(&gps("V1", 70.0, t(0)), Some(&road(60))));
        assert!(!detector.check_overspeed(&gps("V2", 60.0, t(0)), Some(&road(60))));
    }

    #[test]
    fn severity_scales_with_ratio() {
        assert_eq!(SpeedDetector::severity_for(62.0, 60), Severity::Low);
        assert_eq!(SpeedDetector::severity_for(66.0, 60), Severity::Medium);
        assert_eq!(SpeedDetector::severity_for(78.0, 60), Severity::High);
        assert_eq!(SpeedDetector::severity_for(120.0, 60), Severity::High);
    }

    #[test]
    fn history_keeps_one_hour() {
        let mut detector = SpeedDetector::new();
        let road = road(60);
        detector.check_overspeed(&gps("V1", 50.0, t(0)), Some(&road));
        detector.check_overspeed(&gps("V1", 55.0, t(3601)), Some(&road));
        assert_eq!(detector.speed_history("V1").len(), 1);
    }

    #[test]
    fn vehicle_limit_drops_idle_then_stalest_vehicles() {
        let mut detector = SpeedDetector::new().with_vehicle_limit(3);
        let road = road(60);
        detector.check_overspeed(&gps("idle", 50.0, t(0)), Some(&road));
        for (i, vehicle) in ["A", "B", "C"].into_iter().enumerate() {
            detector.check_overspeed(&gps(vehicle, 50.0, t(3700 + i as i64)), Some(&road));
        }
        assert_eq!(detector.history.len(), 3);
        assert!(detector.speed_history("idle").is_empty());

        detector.check_overspeed(&gps("A", 50.0, t(3710)), Some(&road));
        detector.check_overspeed(&gps("D", 50.0, t(3711)), Some(&road));
        assert_eq!(detector.history.len(), 3);
        assert!(detector.speed_history("B").is_empty());
        for vehicle in ["A", "C", "D"] {
            assert!(!detector.speed_history(vehicle).is_empty(), "{vehicle}");
        }

        for i in 0..1000 {
            detector.check_overspeed(&gps(&format!("X{i}"), 50.0, t(3800 + i)), Some(&road));
        }
        assert_eq!(detector.history.len(), 3);
    }

    #[test]
    fn average_speed_over_window() {
        let mut detector = SpeedDetector::new();
        let road = road(60);
        for (i, speed) in [40.0, 50.0, 60.0].into_iter().enumerate() {
            detector.check_overspeed(&gps("V1", speed, t(i as i64 * 60)), Some(&road));
        }
        assert_eq!(detector.average_speed("V1", Duration::hours(1), t(120)), 50.0);
        assert_eq!(detector.average_speed("V1", Duration::seconds(90), t(120)), 55.0);
        assert_eq!(detector.average_speed("V9", Duration::hours(1), t(120)), 0.0);
    }

    #[test]
    fn pattern_detection() {
        let road = road(200);
        let mut detector = SpeedDetector::new();
        for i in 0..4 {
            detector.check_overspeed(&gps("V1", 30.0 + i as f64 * 10.0, t(i)), Some(&road));
        }
        assert_eq!(detector.speed_pattern("V1"), SpeedPattern::InsufficientData);
        detector.check_overspeed(&gps("V1", 80.0, t(5)), Some(&road));
        assert_eq!(detector.speed_pattern("V1"), SpeedPattern::Accelerating);

        for i in 0..5 {
            detector.check_overspeed(&gps("V2", 90.0 - i as f64 * 10.0, t(i)), Some(&road));
        }
        assert_eq!(detector.speed_pattern("V2"), SpeedPattern::Decelerating);

        for i in 0..5 {
            detector.check_overspeed(&gps("V3", 50.0 + (i % 2) as f64, t(i)), Some(&road));
        }
        assert_eq!(detector.speed_pattern("V3"), SpeedPattern::Stable);
    }

    #[test]
    fn overspeed_statistics_per_road() {
        let mut detector = SpeedDetector::new();
        let road = road(60);
        detector.check_overspeed(&gps("V1", 50.0, t(0)), Some(&road));
        detector.check_overspeed(&gps("V2", 90.0, t(10)), Some(&road));
        detector.check_overspeed(&gps("V3", 75.0, t(20)), Some(&road));
        let stats = detector.overspeed_statistics(1, Duration::hours(1), t(30));
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.overspeed_count, 2);
        assert_eq!(stats.max_speed, 90.0);
        assert!((stats.overspeed_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.window_hours, 1.0);
        assert_eq!(detector.overspeed_statistics(2, Duration::hours(1), t(30)).total_count, 0);
    }
}

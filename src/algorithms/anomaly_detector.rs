// src/algorithms/anomaly_detector.rs

use crate::error::{Result, TrafficError};
use crate::geo;
use crate::global_variables::MAX_TRACKED_VEHICLES;
use crate::models::{GpsData, Severity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

/// What a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    /// The reported speed itself.
    Speed,
    /// Speed implied by the jump from the previous position.
    Location,
    /// Coefficient of variation of the recent speeds.
    Pattern,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::Speed => "speed",
            AnomalyKind::Location => "location",
            AnomalyKind::Pattern => "pattern",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCondition {
    Above,
    Below,
}

impl RuleCondition {
    fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            RuleCondition::Above => value > threshold,
            RuleCondition::Below => value < threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub kind: AnomalyKind,
    pub condition: RuleCondition,
    pub threshold: f64,
    pub severity: Severity,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
}

fn enabled_by_default() -> bool {
    true
}

impl AnomalyRule {
    fn new(
        id: &str,
        name: &str,
        kind: AnomalyKind,
        condition: RuleCondition,
        threshold: f64,
        severity: Severity,
        description: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            condition,
            threshold,
            severity,
            enabled: true,
            description: description.to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(TrafficError::Validation("Rule id cannot be empty".into()));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(TrafficError::Validation(format!(
                "Rule {} needs a non-negative threshold",
                self.id
            )));
        }
        Ok(())
    }
}

/// One rule firing for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub vehicle_id: String,
    pub rule_id: String,
    pub kind: AnomalyKind,
    pub condition: RuleCondition,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyStatistics {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy)]
struct LastPosition {
    longitude: f64,
    latitude: f64,
    timestamp: DateTime<Utc>,
}

/// What the detector remembers about one vehicle.
#[derive(Debug, Default)]
struct VehicleTrack {
    last_position: Option<LastPosition>,
    speeds: VecDeque<f64>,
    detections: VecDeque<DetectionRecord>,
}

impl VehicleTrack {
    /// km/h needed to cover the distance from the previous sample.
    fn implied_speed(&self, gps: &GpsData) -> Option<f64> {
        let last = self.last_position?;
        let seconds = (gps.timestamp - last.timestamp).num_milliseconds() as f64 / 1000.0;
        if seconds <= 0.0 {
            return None;
        }
        let (longitude, latitude) = gps.location();
        let km = geo::haversine_km(last.longitude, last.latitude, longitude, latitude);
        Some(km / (seconds / 3600.0))
    }

    /// Adds the speed to the window and returns its coefficient of variation
    /// once enough samples are in.
    fn push_speed(&mut self, speed: f64) -> Option<f64> {
        if self.speeds.len() == AnomalyDetector::SPEED_WINDOW {
            self.speeds.pop_front();
        }
        self.speeds.push_back(speed);

        if self.speeds.len() < AnomalyDetector::PATTERN_MIN_SAMPLES {
            return None;
        }
        let n = self.speeds.len() as f64;
        let mean = self.speeds.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return None;
        }
        let variance = self.speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Some(variance.sqrt() / mean)
    }

    fn record(&mut self, detection: DetectionRecord) {
        if self.detections.len() == AnomalyDetector::HISTORY_LIMIT {
            self.detections.pop_front();
        }
        self.detections.push_back(detection);
    }

    fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_position.map(|p| p.timestamp)
    }
}

/// Rule-driven anomaly detection over the stream of GPS samples.
#[derive(Debug)]
pub struct AnomalyDetector {
    rules: Vec<AnomalyRule>,
    vehicles: HashMap<String, VehicleTrack>,
    retention: Duration,
    max_vehicles: usize,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyDetector {
    /// Detection records kept per vehicle.
    pub const HISTORY_LIMIT: usize = 100;
    /// Speeds needed before pattern rules are evaluated.
    pub const PATTERN_MIN_SAMPLES: usize = 10;
    const SPEED_WINDOW: usize = 20;

    pub fn new() -> Self {
        Self::with_rules(Self::default_rules())
    }

    pub fn with_rules(rules: Vec<AnomalyRule>) -> Self {
        Self {
            rules,
            vehicles: HashMap::new(),
            retention: Duration::hours(1),
            max_vehicles: MAX_TRACKED_VEHICLES,
        }
    }

    /// Caps how many vehicles keep positions, speeds and detections.
    pub fn with_vehicle_limit(mut self, max_vehicles: usize) -> Self {
        self.max_vehicles = max_vehicles.max(1);
        self
    }

    pub fn default_rules() -> Vec<AnomalyRule> {
        vec![
            AnomalyRule::new(
                "extreme_speed",
                "Extreme speed",
                AnomalyKind::Speed,
                RuleCondition::Above,
                150.0,
                Severity::High,
                "Vehicle faster than 150 km/h",
            ),
            AnomalyRule::new(
                "low_speed",
                "Low speed",
                AnomalyKind::Speed,
                RuleCondition::Below,
                5.0,
                Severity::Medium,
                "Vehicle slower than 5 km/h, possibly stopped",
            ),
            AnomalyRule::new(
                "location_jump",
                "Location jump",
                AnomalyKind::Location,
                RuleCondition::Above,
                300.0,
                Severity::High,
                "Position jump implies more than 300 km/h",
            ),
            AnomalyRule::new(
                "pattern_deviation",
                "Erratic driving",
                AnomalyKind::Pattern,
                RuleCondition::Above,
                0.8,
                Severity::Medium,
                "Speed varies far more than usual",
            ),
        ]
    }

    /// Runs every enabled rule against `gps`, records what fired and updates
    /// the vehicle's last position and speed window.
    pub fn detect(&mut self, gps: &GpsData) -> Vec<DetectionRecord> {
        let track = self.vehicles.entry(gps.vehicle_id.clone()).or_default();
        let implied_speed = track.implied_speed(gps);
        let deviation = track.push_speed(gps.speed);

        let detections: Vec<DetectionRecord> = self
            .rules
            .iter()
            .filter(|rule| rule.enabled)
            .filter_map(|rule| {
                let value = match rule.kind {
                    AnomalyKind::Speed => Some(gps.speed),
                    AnomalyKind::Location => implied_speed,
                    AnomalyKind::Pattern => deviation,
                }?;
                rule.condition
                    .holds(value, rule.threshold)
                    .then(|| DetectionRecord {
                        vehicle_id: gps.vehicle_id.clone(),
                        rule_id: rule.id.clone(),
                        kind: rule.kind,
                        condition: rule.condition,
                        value,
                        threshold: rule.threshold,
                        severity: rule.severity,
                        timestamp: gps.timestamp,
                        message: format!(
                            "{}: value {:.2}, threshold {:.2}",
                            rule.name, value, rule.threshold
                        ),
                    })
            })
            .collect();

        let (longitude, latitude) = gps.location();
        track.last_position = Some(LastPosition {
            longitude,
            latitude,
            timestamp: gps.timestamp,
        });
        for record in &detections {
            track.record(record.clone());
        }

        if self.vehicles.len() > self.max_vehicles {
            self.evict(gps.timestamp - self.retention);
        }
        detections
    }

    /// Forgets vehicles silent since `cutoff`, then the least recently seen
    /// ones until the limit holds.
    fn evict(&mut self, cutoff: DateTime<Utc>) {
        self.vehicles
            .retain(|_, track| track.last_seen().is_some_and(|seen| seen > cutoff));
        while self.vehicles.len() > self.max_vehicles {
            let stalest = self
                .vehicles
                .iter()
                .min_by_key(|(_, track)| track.last_seen())
                .map(|(vehicle_id, _)| vehicle_id.clone());
            match stalest {
                Some(vehicle_id) => {
                    self.vehicles.remove(&vehicle_id);
                }
                None => break,
            }
        }
    }

    pub fn history(&self, vehicle_id: &str) -> Vec<DetectionRecord> {
        self.vehicles
            .get(vehicle_id)
            .map(|track| track.detections.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn rules(&self) -> &[AnomalyRule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: AnomalyRule) -> Result<()> {
        rule.validate()?;
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(TrafficError::Conflict(format!(
                "Rule {} already exists",
                rule.id
            )));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn update_rule(&mut self, id: &str, mut rule: AnomalyRule) -> Result<()> {
        rule.id = id.to_string();
        rule.validate()?;
        let slot = self
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| TrafficError::NotFound(format!("Rule {}", id)))?;
        *slot = rule;
        Ok(())
    }

    pub fn delete_rule(&mut self, id: &str) -> Result<AnomalyRule> {
        let index = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| TrafficError::NotFound(format!("Rule {}", id)))?;
        Ok(self.rules.remove(index))
    }

    /// Detections newer than `now - window`, counted by kind and severity.
    pub fn statistics(&self, window: Duration, now: DateTime<Utc>) -> AnomalyStatistics {
        let cutoff = now - window;
        let mut stats = AnomalyStatistics::default();
        for record in self.vehicles.values().flat_map(|track| &track.detections) {
            if record.timestamp <= cutoff {
                continue;
            }
            stats.total += 1;
            *stats.by_kind.entry(record.kind.to_string()).or_insert(0) += 1;
            *stats
                .by_severity
                .entry(record.severity.to_string())
                .or_insert(0) += 1;
        }
        stats
    }
}

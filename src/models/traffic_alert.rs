use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Overspeed,
    Congestion,
    Accident,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            AlertType::Overspeed => "overspeed",
            AlertType::Congestion => "congestion",
            AlertType::Accident => "accident",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// Numeric level, 1 (low) to 3 (high).
    pub fn level(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event flagged against a road segment and, optionally, a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficAlert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub alert_type: AlertType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    pub road_segment_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_value: Option<f64>,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub resolved: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TrafficAlert {
    pub fn new(
        alert_type: AlertType,
        road_segment_id: u64,
        severity: Severity,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            alert_type,
            vehicle_id: None,
            road_segment_id,
            alert_value: None,
            message: message.into(),
            severity,
            resolved: false,
            timestamp,
            created_at: None,
        }
    }

    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.alert_value = Some(value);
        self
    }

    pub fn is_high_severity(&self) -> bool {
        self.severity == Severity::High
    }

    /// Raised within the hour before `now`.
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp <= Duration::hours(1)
    }

    pub fn resolve(&mut self) {
        self.resolved = true;
    }
}
